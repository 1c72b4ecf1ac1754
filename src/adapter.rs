//! The l2met adapter: filter, render, deliver.
//!
//! The router pushes log messages into a channel; [`L2metAdapter::stream`]
//! consumes it until the router closes it. Nothing on the per-message path
//! stops the loop early. Lines that are not metrics are skipped silently,
//! and render or delivery failures are logged and the line is dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::client::DeliveryClient;
use crate::config::{Config, ConfigError};
use crate::envelope::{EnvelopeFormatter, FormatError};
use crate::filter::MetricFilter;
use crate::message::LogMessage;

/// Default cap on outstanding deliveries in concurrent mode.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// How deliveries are scheduled relative to the inbound stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Await each POST before reading the next message. Deliveries happen in
    /// order, at most one at a time, and a slow drain slows the stream down.
    Sequential,

    /// Spawn a task per POST and keep reading. Completions are unordered.
    /// With `max_in_flight: None` the number of outstanding requests is
    /// unbounded; with a limit, reading stalls once that many are pending.
    Concurrent { max_in_flight: Option<usize> },
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::Concurrent {
            max_in_flight: Some(DEFAULT_MAX_IN_FLIGHT),
        }
    }
}

/// What happened to the messages of one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Messages read from the channel
    pub received: u64,

    /// Messages that looked like metrics
    pub matched: u64,

    /// Matched messages dropped because they could not be rendered
    pub format_errors: u64,

    /// Envelopes the drain answered 200 for
    pub delivered: u64,

    /// Envelopes lost to transport errors or non-200 answers
    pub failed: u64,
}

impl StreamSummary {
    fn record(&mut self, delivered: bool) {
        if delivered {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }

    fn record_joined(&mut self, joined: Result<bool, JoinError>) {
        match joined {
            Ok(delivered) => self.record(delivered),
            Err(e) => {
                warn!(target: "l2met", error = %e, "Delivery task did not complete");
                self.failed += 1;
            }
        }
    }
}

/// Forwards l2met metric lines as RFC5424 envelopes over HTTP(S).
pub struct L2metAdapter {
    filter: MetricFilter,
    formatter: EnvelopeFormatter,
    client: DeliveryClient,
    delivery: DeliveryMode,
}

impl L2metAdapter {
    /// Build an adapter from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the target is invalid, the metric pattern
    /// does not compile, or the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let filter = MetricFilter::new()?;
        let formatter = EnvelopeFormatter::new(
            config.hostname.clone(),
            config.framing,
            config.structured_data,
        );
        let client = DeliveryClient::new(config)?;

        info!(
            target: "l2met",
            url = %client.target(),
            hostname = %formatter.hostname(),
            framing = ?config.framing,
            delivery = ?config.delivery,
            "l2met adapter created"
        );

        Ok(Self {
            filter,
            formatter,
            client,
            delivery: config.delivery,
        })
    }

    /// The envelope for `message`, or `None` if it is not a metric line.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if a matching message cannot be rendered.
    pub fn envelope(&self, message: &LogMessage) -> Result<Option<Vec<u8>>, FormatError> {
        if !self.filter.is_match(&message.data) {
            return Ok(None);
        }
        self.formatter.render(message).map(Some)
    }

    pub fn client(&self) -> &DeliveryClient {
        &self.client
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery
    }

    /// Consume `messages` until the sender side is closed.
    ///
    /// In concurrent mode the deliveries still outstanding when the channel
    /// closes are awaited before returning.
    pub async fn stream(&self, mut messages: mpsc::Receiver<LogMessage>) -> StreamSummary {
        let mut summary = StreamSummary::default();
        let mut in_flight: JoinSet<bool> = JoinSet::new();
        let limiter = match self.delivery {
            DeliveryMode::Concurrent {
                max_in_flight: Some(limit),
            } => Some(Arc::new(Semaphore::new(limit.max(1)))),
            _ => None,
        };

        while let Some(message) = messages.recv().await {
            summary.received += 1;

            let envelope = match self.envelope(&message) {
                Ok(Some(envelope)) => envelope,
                Ok(None) => continue,
                Err(e) => {
                    summary.matched += 1;
                    summary.format_errors += 1;
                    error!(
                        target: "l2met",
                        error = %e,
                        container = %message.container.name,
                        "Failed to render envelope, dropping message"
                    );
                    continue;
                }
            };
            summary.matched += 1;
            drop(message);

            match self.delivery {
                DeliveryMode::Sequential => {
                    let delivered = forward(&self.client, envelope).await;
                    summary.record(delivered);
                }
                DeliveryMode::Concurrent { .. } => {
                    let permit = match &limiter {
                        Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
                        None => None,
                    };
                    let client = self.client.clone();
                    in_flight.spawn(async move {
                        let delivered = forward(&client, envelope).await;
                        drop(permit);
                        delivered
                    });

                    while let Some(joined) = in_flight.try_join_next() {
                        summary.record_joined(joined);
                    }
                }
            }
        }

        if !in_flight.is_empty() {
            debug!(target: "l2met", pending = in_flight.len(), "Waiting for in-flight deliveries");
        }
        while let Some(joined) = in_flight.join_next().await {
            summary.record_joined(joined);
        }

        info!(
            target: "l2met",
            received = summary.received,
            matched = summary.matched,
            delivered = summary.delivered,
            failed = summary.failed,
            "Log stream closed"
        );
        summary
    }
}

/// Deliver one envelope, logging instead of returning the failure.
async fn forward(client: &DeliveryClient, envelope: Vec<u8>) -> bool {
    match client.deliver(envelope).await {
        Ok(()) => true,
        Err(e) => {
            error!(target: "l2met", error = %e, url = %client.target(), "Failed to deliver envelope");
            false
        }
    }
}
