//! HTTP dispatch of bucket and event requests.
//!
//! Every exchange is classified the same way: a status in `200..=299` is a
//! success, anything else becomes [`ErrorKind::Transport`] carrying the
//! status, the JSON body that was sent and the raw response body.
//!
//! [`ErrorKind::Transport`]: crate::ErrorKind::Transport

use crate::bucket::BucketRequest;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::events::Event;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, RequestBuilder};
use std::fmt;
use std::sync::Arc;

/// Header carrying the API version
pub const ACCEPT_VERSION: &str = "Accept-Version";
/// Header carrying the account access key
pub const ACCESS_KEY_HEADER: &str = "X-IS-AccessKey";
/// Header carrying the target bucket key
pub const BUCKET_KEY_HEADER: &str = "X-IS-BucketKey";

/// Log target used by [`LogReporter`]
pub const LOG_TARGET: &str = "is_event_sender";

/// How an event submission waits for the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchMode {
    /// Wait for the response and return any failure to the caller
    Sync,
    /// Return immediately; failures are only reported, never returned
    #[default]
    Async,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Sync => write!(f, "sync"),
            DispatchMode::Async => write!(f, "async"),
        }
    }
}

/// Sink for failure messages.
///
/// This is the only channel through which fire-and-forget failures are
/// visible.
pub trait FailureReporter: Send + Sync {
    /// Record one error-level message
    fn report(&self, message: &str);
}

/// Reports failures through the `log` facade at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, message: &str) {
        log::error!(target: LOG_TARGET, "{}", message);
    }
}

/// Whether a status code counts as success
pub fn is_success(status_code: u16) -> bool {
    (200..=299).contains(&status_code)
}

/// Sends requests to the events API over a shared HTTP client
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<ClientConfig>,
    http_client: HttpClient,
    reporter: Arc<dyn FailureReporter>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("api_base", &self.config.api_base)
            .field("api_version", &self.config.api_version)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build a dispatcher and its HTTP client
    pub fn new(config: Arc<ClientConfig>, reporter: Arc<dyn FailureReporter>) -> Result<Self> {
        let mut builder = HttpClient::builder().user_agent(&config.user_agent);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| Error::from(e).with_context("Building HTTP client"))?;

        Ok(Self {
            config,
            http_client,
            reporter,
        })
    }

    /// The configuration requests are built from
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Replace the failure reporter
    pub fn set_reporter(&mut self, reporter: Arc<dyn FailureReporter>) {
        self.reporter = reporter;
    }

    /// `POST {api_base}/buckets`, always waiting for the response
    pub async fn send_bucket_create(&self, request: &BucketRequest) -> Result<()> {
        let url = self.config.endpoint("buckets");
        let body = serde_json::to_string(request)?;

        let builder = self
            .http_client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT_VERSION, &self.config.api_version)
            .body(body.clone());

        log::debug!("Creating bucket {} at {}", request.bucket_key, url);

        execute(builder, body.clone()).await.map_err(|err| {
            self.reporter
                .report(&format!("Error creating bucket {}... {} {}", url, err, body));
            err
        })
    }

    /// `POST {api_base}/events` with every event in one body.
    ///
    /// In [`DispatchMode::Async`] the exchange runs on a spawned task and
    /// this returns `Ok(())` as soon as the task is scheduled.
    pub async fn send_events(
        &self,
        bucket_key: &str,
        events: &[Event],
        mode: DispatchMode,
    ) -> Result<()> {
        let url = self.config.endpoint("events");
        let body = serde_json::to_string(events)?;

        let builder = self
            .http_client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCESS_KEY_HEADER, &self.config.access_key)
            .header(BUCKET_KEY_HEADER, bucket_key)
            .header(ACCEPT_VERSION, &self.config.api_version)
            .body(body.clone());

        log::debug!(
            "Sending {} event(s) to bucket {} ({})",
            events.len(),
            bucket_key,
            mode
        );

        let failure_message = {
            let url = url.clone();
            let bucket_key = bucket_key.to_string();
            let body = body.clone();
            move |err: &Error| {
                format!(
                    "Unsuccessfully submitted events to {} ({})... {} {}",
                    url, bucket_key, err, body
                )
            }
        };

        match mode {
            DispatchMode::Sync => execute(builder, body).await.map_err(|err| {
                self.reporter.report(&failure_message(&err));
                err
            }),
            DispatchMode::Async => {
                let reporter = Arc::clone(&self.reporter);
                tokio::spawn(async move {
                    if let Err(err) = execute(builder, body).await {
                        reporter.report(&failure_message(&err));
                    }
                });
                Ok(())
            }
        }
    }
}

/// Run one exchange and classify the response
async fn execute(builder: RequestBuilder, request_body: String) -> Result<()> {
    let response = builder.send().await?;
    let status = response.status().as_u16();

    if is_success(status) {
        return Ok(());
    }

    let response_body = match response.text().await {
        Ok(text) => text,
        Err(err) => {
            log::debug!("Could not read body of HTTP {} response: {}", status, err);
            String::new()
        }
    };
    Err(Error::transport(status, request_body, response_body))
}
