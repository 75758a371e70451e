//! Event encoding.
//!
//! Anything that can list named string values implements [`EventSource`].
//! Maps, key/value pairs and serde-serializable records wrapped in
//! [`Record`] are supported out of the box. [`encode`] turns a source into
//! the wire events of a single submission, all stamped with one epoch.

use crate::error::Result;
use crate::fields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;

/// A single timestamped key/value data point, as sent to `/events`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Signal name
    pub key: String,
    /// Value rendered as text
    pub value: String,
    /// Seconds since the Unix epoch, millisecond precision
    pub epoch: f64,
}

impl Event {
    /// Create a new event
    pub fn new<K, V>(key: K, value: V, epoch: f64) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            value: value.into(),
            epoch,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} @ {}", self.key, self.value, self.epoch)
    }
}

/// A value that can be flattened into named string fields.
///
/// Implement this for your own types to send them with
/// [`EventsClient::send_events`](crate::EventsClient::send_events):
///
/// ```rust
/// use initialstate::{EventSource, Result};
///
/// struct Reading {
///     celsius: f32,
///     door_open: bool,
/// }
///
/// impl EventSource for Reading {
///     fn fields(&self) -> Result<Vec<(String, String)>> {
///         Ok(vec![
///             ("celsius".to_string(), self.celsius.to_string()),
///             ("door_open".to_string(), self.door_open.to_string()),
///         ])
///     }
/// }
/// ```
pub trait EventSource {
    /// Field name and value pairs, in the order they should be sent
    fn fields(&self) -> Result<Vec<(String, String)>>;
}

impl<T: EventSource + ?Sized> EventSource for &T {
    fn fields(&self) -> Result<Vec<(String, String)>> {
        (**self).fields()
    }
}

impl<K, V, S> EventSource for HashMap<K, V, S>
where
    K: AsRef<str>,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn fields(&self) -> Result<Vec<(String, String)>> {
        Ok(pairs(self.iter()))
    }
}

impl<K, V> EventSource for BTreeMap<K, V>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn fields(&self) -> Result<Vec<(String, String)>> {
        Ok(pairs(self.iter()))
    }
}

impl<K, V> EventSource for [(K, V)]
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn fields(&self) -> Result<Vec<(String, String)>> {
        Ok(pairs(self.iter().map(|(k, v)| (k, v))))
    }
}

impl<K, V> EventSource for Vec<(K, V)>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn fields(&self) -> Result<Vec<(String, String)>> {
        self.as_slice().fields()
    }
}

/// A single key/value pair is a one-entry mapping
impl<K, V> EventSource for (K, V)
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn fields(&self) -> Result<Vec<(String, String)>> {
        Ok(vec![(self.0.as_ref().to_string(), self.1.as_ref().to_string())])
    }
}

fn pairs<'a, K, V, I>(iter: I) -> Vec<(String, String)>
where
    K: AsRef<str> + 'a,
    V: AsRef<str> + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    iter.map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect()
}

/// Adapter sending each field of a serializable struct as one event.
///
/// Field values are rendered as text: strings as-is, numbers and booleans
/// in their canonical form (`42`, `0.1`, `true`), `None` as an empty string
/// and nested arrays, maps or enum payloads as compact JSON. Non-finite
/// floats are sent as `NaN`, `inf` and `-inf`.
///
/// ```rust
/// use initialstate::{EventSource, Record};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Reading {
///     temperature: i32,
///     door_open: bool,
/// }
///
/// let fields = Record(Reading { temperature: 42, door_open: true }).fields().unwrap();
/// assert_eq!(fields[0], ("temperature".to_string(), "42".to_string()));
/// assert_eq!(fields[1], ("door_open".to_string(), "true".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct Record<T>(pub T);

impl<T: Serialize> EventSource for Record<T> {
    fn fields(&self) -> Result<Vec<(String, String)>> {
        fields::to_fields(&self.0)
    }
}

/// Seconds since 1970-01-01T00:00:00Z with millisecond precision
pub fn epoch_seconds(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_millis() as f64 / 1000.0
}

/// Encode a source into events sharing one epoch.
///
/// Without a timestamp the current wall-clock time is used. An empty
/// source yields an empty list.
pub fn encode<S>(source: &S, timestamp: Option<DateTime<Utc>>) -> Result<Vec<Event>>
where
    S: EventSource + ?Sized,
{
    let epoch = epoch_seconds(timestamp.unwrap_or_else(Utc::now));

    Ok(source
        .fields()?
        .into_iter()
        .map(|(key, value)| Event { key, value, epoch })
        .collect())
}
