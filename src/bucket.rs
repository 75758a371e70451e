//! Bucket key resolution and the bucket creation request.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST {api_base}/buckets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRequest {
    /// Display name of the bucket
    pub bucket_name: String,
    /// Caller-unique key, scoped to the access key
    pub bucket_key: String,
    /// Tags attached on first creation; serialized as `null` when absent
    pub tags: Option<Vec<String>>,
}

impl BucketRequest {
    /// Create a request; an empty name falls back to the key
    pub fn new<K: Into<String>>(bucket_key: K, bucket_name: Option<&str>) -> Self {
        let bucket_key = bucket_key.into();
        Self {
            bucket_name: name_or_default(bucket_name, &bucket_key).to_string(),
            bucket_key,
            tags: None,
        }
    }

    /// Attach tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// Outcome of [`resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    /// The bucket key to use
    pub key: String,
    /// True when `key` was generated and must become the new default
    pub generated: bool,
}

/// Pick the bucket key for bucket creation.
///
/// An explicit key wins, then the current default. When neither is set a
/// fresh key is generated and `generated` is set.
pub fn resolve(explicit: Option<&str>, current_default: Option<&str>) -> ResolvedKey {
    if let Some(key) = non_empty(explicit) {
        return ResolvedKey {
            key: key.to_string(),
            generated: false,
        };
    }

    if let Some(key) = non_empty(current_default) {
        return ResolvedKey {
            key: key.to_string(),
            generated: false,
        };
    }

    ResolvedKey {
        key: generate_bucket_key(),
        generated: true,
    }
}

/// Pick the bucket key for event submission. Never generates one.
pub fn resolve_for_events(explicit: Option<&str>, current_default: Option<&str>) -> Result<String> {
    non_empty(explicit)
        .or_else(|| non_empty(current_default))
        .map(str::to_string)
        .ok_or_else(|| Error::configuration("bucket key is required"))
}

/// The bucket name, or the key when the name is missing or empty
pub fn name_or_default<'a>(name: Option<&'a str>, key: &'a str) -> &'a str {
    non_empty(name).unwrap_or(key)
}

/// A new 32 character lowercase hex bucket key
pub fn generate_bucket_key() -> String {
    Uuid::new_v4().simple().to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
