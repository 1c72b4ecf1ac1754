//! HTTP client module for delivering envelopes to the l2met drain.
//!
//! One POST per envelope over a pooled connection. There are no retries:
//! the caller logs whatever comes back and moves on.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, ConfigError};
use crate::target::DeliveryTarget;
use crate::transport::{DialLogLayer, DialStats};

/// Idle connections kept per host.
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// How long an idle pooled connection is kept.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Errors that can occur while delivering one envelope.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request could not be sent or the response not received
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),

    /// The request did not finish within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The drain answered with something other than 200
    #[error("Error sending log, status {code}")]
    Status { code: StatusCode },

    /// The response body could not be read to the end
    #[error("Failed to drain response body: {0}")]
    Drain(reqwest::Error),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeliveryError::Timeout
        } else {
            DeliveryError::Request(err)
        }
    }
}

/// HTTP client bound to one delivery target.
///
/// The underlying reqwest client is shared by every delivery the adapter
/// makes, so connections are pooled across them. Cloning is cheap.
#[derive(Clone)]
pub struct DeliveryClient {
    /// The underlying HTTP client (reused for connection pooling)
    client: Client,

    /// Where envelopes go
    target: Arc<DeliveryTarget>,

    /// Request timeout duration
    timeout: Duration,

    /// Counters from the connector stack
    dials: Arc<DialStats>,
}

impl DeliveryClient {
    /// Create a client for the target and timeout in `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the target is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Self::with_settings(config.target()?, config.request_timeout)
    }

    /// Create a client for an already resolved target.
    pub fn with_settings(target: DeliveryTarget, timeout: Duration) -> Result<Self, ConfigError> {
        let dial_log = DialLogLayer::new();
        let dials = dial_log.stats();

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .connector_layer(dial_log)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            target: Arc::new(target),
            timeout,
            dials,
        })
    }

    /// POST one envelope.
    ///
    /// The response body is always read to the end and discarded, whatever
    /// the status, so the connection can go back to the pool.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Status` for any status other than 200, even if
    /// its body cannot be drained, and the other variants for transport
    /// failures.
    pub async fn deliver(&self, envelope: Vec<u8>) -> Result<(), DeliveryError> {
        let bytes = envelope.len();

        let response = self
            .client
            .post(self.target.url().clone())
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            // The status is what gets reported; a broken error body only costs the connection.
            if let Err(e) = drain(response).await {
                warn!(target: "l2met", error = %e, status = %status, "Failed to drain error response");
            }
            return Err(DeliveryError::Status { code: status });
        }

        drain(response).await?;

        debug!(target: "l2met", bytes = bytes, status = %status, "Delivered envelope");
        Ok(())
    }

    /// The resolved target.
    pub fn target(&self) -> &DeliveryTarget {
        &self.target
    }

    /// Get the request timeout duration.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connection attempts made so far.
    pub fn dial_stats(&self) -> &DialStats {
        &self.dials
    }
}

/// Read and discard the rest of a response body.
async fn drain(mut response: Response) -> Result<(), DeliveryError> {
    while response.chunk().await.map_err(DeliveryError::Drain)?.is_some() {}
    Ok(())
}
