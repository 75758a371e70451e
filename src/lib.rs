//! # Initial State Rust client
//!
//! A client library for the Initial State event-logging service. It creates
//! named, tagged buckets and submits timestamped key/value events into them,
//! either waiting for the service to confirm or firing and forgetting.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use initialstate::{ClientConfig, DispatchMode, EventsClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = EventsClient::new(ClientConfig::new("your-access-key"))?;
//!
//!     // No key given and no default configured: one is generated and
//!     // becomes the default for later calls.
//!     let bucket_key = client.create_bucket(None, Some("Kitchen"), Some(&["home"][..])).await?;
//!     println!("Created bucket {}", bucket_key);
//!
//!     // Fire and forget; failures are only logged
//!     client
//!         .send_event("door", "open", None, None, DispatchMode::Async)
//!         .await?;
//!
//!     // Wait for the service to confirm
//!     client
//!         .send_event("temperature", "21.5", None, None, DispatchMode::Sync)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! Fire-and-forget sends run as tasks on the tokio runtime. Tasks still in
//! flight when the runtime shuts down are dropped, so keep the runtime alive
//! until those sends have had time to complete.
//!
//! ## Sending records
//!
//! Maps of strings, key/value pairs and any serde-serializable struct
//! wrapped in [`Record`] can be sent in one request:
//!
//! ```rust,no_run
//! use initialstate::{DispatchMode, EventsClient, Record};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Reading {
//!     temperature: f64,
//!     humidity: u8,
//! }
//!
//! # async fn run(client: EventsClient) -> initialstate::Result<()> {
//! let reading = Reading { temperature: 21.5, humidity: 40 };
//! client
//!     .send_events(&Record(&reading), Some("kitchen"), None, DispatchMode::Sync)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Configuration problems are reported before anything is sent. Rejected
//! requests carry the status, the request body and the response body:
//!
//! ```rust,no_run
//! use initialstate::{Error, ErrorKind};
//!
//! # async fn run(client: initialstate::EventsClient) {
//! match client.create_bucket(Some("kitchen"), None, None).await {
//!     Ok(key) => println!("Bucket ready: {}", key),
//!     Err(Error { kind: ErrorKind::Transport { status_code, response_body, .. }, .. }) => {
//!         println!("Rejected with {}: {}", status_code, response_body);
//!     }
//!     Err(err) => println!("Unexpected error: {}", err),
//! }
//! # }
//! ```

pub mod bucket;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
mod fields;
pub mod transport;

pub use bucket::BucketRequest;
pub use client::EventsClient;
pub use config::ClientConfig;
pub use error::{Error, ErrorKind, Result};
pub use events::{Event, EventSource, Record};
pub use transport::{DispatchMode, FailureReporter, LogReporter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    /// Default API base URL
    pub const API_BASE: &str = "https://groker.init.st/api";

    /// Default `Accept-Version` header value
    pub const API_VERSION: &str = "~0";

    /// User agent sent when none is configured
    pub fn user_agent() -> String {
        format!("initialstate-rust/{}", super::VERSION)
    }
}

/// Initialize environment-based logging.
///
/// Safe to call more than once; only the first call installs the logger.
///
/// # Example
///
/// ```rust
/// initialstate::init_logging();
/// ```
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Get the crate version
pub fn version() -> &'static str {
    VERSION
}
