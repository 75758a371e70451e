//! Client configuration and its validation.
//!
//! A [`ClientConfig`] can be built in code, read from the environment or
//! deserialized from JSON. The client never loads configuration on its own:
//! the loaders here are called by the application, which then hands the
//! resolved struct to [`EventsClient::new`](crate::EventsClient::new).

use crate::defaults;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable holding the access key
pub const ENV_ACCESS_KEY: &str = "INITIALSTATE_ACCESS_KEY";
/// Environment variable overriding the API base
pub const ENV_API_BASE: &str = "INITIALSTATE_API_BASE";
/// Environment variable overriding the API version
pub const ENV_API_VERSION: &str = "INITIALSTATE_API_VERSION";
/// Environment variable holding the default bucket key
pub const ENV_DEFAULT_BUCKET_KEY: &str = "INITIALSTATE_DEFAULT_BUCKET_KEY";

/// Configuration for the events client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Account access key, sent as `X-IS-AccessKey`
    pub access_key: String,
    /// Base URL of the API, without a trailing path such as `/buckets`
    pub api_base: String,
    /// Value of the `Accept-Version` header
    pub api_version: String,
    /// Bucket key used when a call does not name one
    pub default_bucket_key: Option<String>,
    /// Overall request timeout; `None` keeps the HTTP client's default
    #[serde(skip)]
    pub timeout: Option<Duration>,
    /// User agent sent with every request
    #[serde(skip)]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            api_base: defaults::API_BASE.to_string(),
            api_version: defaults::API_VERSION.to_string(),
            default_bucket_key: None,
            timeout: None,
            user_agent: defaults::user_agent(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with the given access key and default settings
    pub fn new<S: Into<String>>(access_key: S) -> Self {
        Self {
            access_key: access_key.into(),
            ..Default::default()
        }
    }

    /// Set the API base URL
    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the `Accept-Version` value
    pub fn with_api_version<S: Into<String>>(mut self, api_version: S) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set the default bucket key
    pub fn with_default_bucket_key<S: Into<String>>(mut self, bucket_key: S) -> Self {
        self.default_bucket_key = Some(bucket_key.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set custom user agent
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Check that the configuration can be used to talk to the service.
    ///
    /// The access key is checked first, so a missing key is always reported
    /// as `access key is required` whatever the other fields hold.
    pub fn validate(&self) -> Result<()> {
        if self.access_key.is_empty() {
            return Err(Error::configuration("access key is required"));
        }

        let base = Url::parse(&self.api_base)?;
        if base.cannot_be_a_base() {
            return Err(Error::configuration(format!(
                "invalid api base: {}",
                self.api_base
            )));
        }

        Ok(())
    }

    /// Read the configuration from `INITIALSTATE_*` environment variables.
    ///
    /// Unset or empty variables keep their defaults. The result is not
    /// validated.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(access_key) = var(ENV_ACCESS_KEY) {
            config.access_key = access_key;
        }
        if let Some(api_base) = var(ENV_API_BASE) {
            config.api_base = api_base;
        }
        if let Some(api_version) = var(ENV_API_VERSION) {
            config.api_version = api_version;
        }
        config.default_bucket_key = var(ENV_DEFAULT_BUCKET_KEY);

        config
    }

    /// Parse a JSON document such as
    /// `{"accessKey": "...", "apiBase": "...", "apiVersion": "~0", "defaultBucketKey": "..."}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e).with_context(format!("Reading {}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    /// URL of an endpoint below the API base, e.g. `buckets`
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }
}
