//! l2met Adapter Library
//!
//! A log router adapter that picks l2met metric lines (`measure#`, `sample#`,
//! `count#`) out of container output and forwards each one to an l2met drain
//! as an RFC5424 syslog message in its own HTTP(S) POST.
//!
//! - **message**: inbound log message model
//! - **filter**: metric line recognition
//! - **envelope**: RFC5424 rendering, with or without octet-count framing
//! - **target**: drain URL with route options as query string
//! - **transport**: connection dial observation
//! - **client**: pooled HTTP delivery
//! - **adapter**: the filter/render/deliver stream loop
//! - **registry**: router-facing factory registration
//! - **config**: environment-based configuration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use l2met_adapter::{Config, Container, L2metAdapter, LogMessage};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     l2met_adapter::logging::init_tracing();
//!
//!     let config = Config::from_env().expect("Failed to load config");
//!     let adapter = L2metAdapter::new(&config).expect("Failed to create adapter");
//!
//!     let (tx, rx) = mpsc::channel(1000);
//!     let container = Arc::new(Container::new("/web.1", "c0ffee", 42));
//!     tx.send(LogMessage::new(container, "stdout", Utc::now().fixed_offset(), "count#hits=1"))
//!         .await
//!         .ok();
//!     drop(tx);
//!
//!     adapter.stream(rx).await;
//! }
//! ```

// Module declarations
pub mod adapter;
pub mod client;
pub mod config;
pub mod envelope;
pub mod filter;
pub mod hostname;
pub mod logging;
pub mod message;
pub mod registry;
pub mod target;
pub mod transport;

// Re-export commonly used types at crate root for convenience
pub use adapter::{DeliveryMode, L2metAdapter, StreamSummary};
pub use client::{DeliveryClient, DeliveryError};
pub use config::{Config, ConfigError};
pub use envelope::{EnvelopeFormatter, FormatError, Framing, Priority, StructuredData};
pub use filter::MetricFilter;
pub use message::{Container, LogMessage, Source};
pub use registry::{register, AdapterFactories, LogAdapter, Route};
pub use target::DeliveryTarget;
pub use transport::DialStats;
