//! Initial State events client
//!
//! [`EventsClient`] creates buckets and sends events into them. It owns the
//! default bucket key: seeded from the configuration and replaced whenever
//! [`EventsClient::create_bucket`] has to generate a key.

use crate::bucket::{self, BucketRequest};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::{self, EventSource};
use crate::transport::{DispatchMode, Dispatcher, FailureReporter, LogReporter};
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// Client for the Initial State events API
#[derive(Debug)]
pub struct EventsClient {
    dispatcher: Dispatcher,
    default_bucket_key: RwLock<Option<String>>,
}

impl EventsClient {
    /// Create a client from an explicit configuration.
    ///
    /// Fails with a configuration error when the access key is missing.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let default_bucket_key = config.default_bucket_key.clone().filter(|k| !k.is_empty());
        let dispatcher = Dispatcher::new(Arc::new(config), Arc::new(LogReporter))?;

        log::info!(
            "Initialized Initial State client for {}",
            dispatcher.config().api_base
        );

        Ok(Self {
            dispatcher,
            default_bucket_key: RwLock::new(default_bucket_key),
        })
    }

    /// Create a client with only an access key
    pub fn with_access_key<K: Into<String>>(access_key: K) -> Result<Self> {
        Self::new(ClientConfig::new(access_key))
    }

    /// Create a client from `INITIALSTATE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Route failure reports to `reporter` instead of the `log` facade
    pub fn with_reporter<R>(mut self, reporter: R) -> Self
    where
        R: FailureReporter + 'static,
    {
        self.dispatcher.set_reporter(Arc::new(reporter));
        self
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        self.dispatcher.config()
    }

    /// The bucket key used when a call does not name one
    pub fn default_bucket_key(&self) -> Option<String> {
        self.default_bucket_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create a bucket and return its key.
    ///
    /// Without `key` the current default is used; when there is none a
    /// new key is generated and becomes the default for later calls. The
    /// name falls back to the key. Creation is idempotent for an existing
    /// key.
    ///
    /// A generated default is kept even if the request then fails.
    pub async fn create_bucket(
        &self,
        key: Option<&str>,
        name: Option<&str>,
        tags: Option<&[&str]>,
    ) -> Result<String> {
        let bucket_key = self.resolve_bucket_key(key);

        let mut request = BucketRequest::new(bucket_key.clone(), name);
        if let Some(tags) = tags {
            request = request.with_tags(tags.iter().copied());
        }

        self.dispatcher.send_bucket_create(&request).await?;
        Ok(bucket_key)
    }

    /// Resolve and, if needed, generate the key under one write lock
    fn resolve_bucket_key(&self, explicit: Option<&str>) -> String {
        let mut default = self
            .default_bucket_key
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let resolved = bucket::resolve(explicit, default.as_deref());
        if resolved.generated {
            log::debug!("Generated default bucket key {}", resolved.key);
            *default = Some(resolved.key.clone());
        }

        resolved.key
    }

    /// Send one key/value event
    pub async fn send_event(
        &self,
        key: &str,
        value: &str,
        bucket_key: Option<&str>,
        timestamp: Option<DateTime<Utc>>,
        mode: DispatchMode,
    ) -> Result<()> {
        self.send_events(&(key, value), bucket_key, timestamp, mode)
            .await
    }

    /// Send every field of `source` as events sharing one timestamp.
    ///
    /// The bucket key comes from `bucket_key` or the current default; a
    /// configuration error is returned when neither is set. In
    /// [`DispatchMode::Async`] transport failures are reported and not
    /// returned.
    pub async fn send_events<S>(
        &self,
        source: &S,
        bucket_key: Option<&str>,
        timestamp: Option<DateTime<Utc>>,
        mode: DispatchMode,
    ) -> Result<()>
    where
        S: EventSource + ?Sized,
    {
        let default = self.default_bucket_key();
        let bucket_key = bucket::resolve_for_events(bucket_key, default.as_deref())?;
        let events = events::encode(source, timestamp)?;

        self.dispatcher.send_events(&bucket_key, &events, mode).await
    }
}
