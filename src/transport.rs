//! Connection establishment hook.
//!
//! reqwest dials through a tower connector stack. `DialLogLayer` sits in that
//! stack and records every new connection, logging failed dials before they
//! propagate back to the request that triggered them. Connections served from
//! the pool never reach this layer, so `DialStats` shows how much reuse the
//! pool is giving.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};
use tracing::{debug, error};

/// Counters of connection attempts made by one client.
#[derive(Debug, Default)]
pub struct DialStats {
    attempts: AtomicU64,
    established: AtomicU64,
    failed: AtomicU64,
}

impl DialStats {
    /// Number of dials started.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Number of dials that produced a connection.
    pub fn established(&self) -> u64 {
        self.established.load(Ordering::Relaxed)
    }

    /// Number of dials that failed.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Layer wrapping a connector with [`DialLog`].
#[derive(Debug, Clone, Default)]
pub struct DialLogLayer {
    stats: Arc<DialStats>,
}

impl DialLogLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared counters, updated by every service this layer produces.
    pub fn stats(&self) -> Arc<DialStats> {
        Arc::clone(&self.stats)
    }
}

impl<S> Layer<S> for DialLogLayer {
    type Service = DialLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DialLog {
            inner,
            stats: Arc::clone(&self.stats),
        }
    }
}

/// Connector that passes dials through unchanged while observing them.
#[derive(Debug, Clone)]
pub struct DialLog<S> {
    inner: S,
    stats: Arc<DialStats>,
}

impl<S, R> Service<R> for DialLog<S>
where
    S: Service<R>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Display + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: R) -> Self::Future {
        let stats = Arc::clone(&self.stats);
        stats.attempts.fetch_add(1, Ordering::Relaxed);
        let dial = self.inner.call(request);

        Box::pin(async move {
            match dial.await {
                Ok(conn) => {
                    stats.established.fetch_add(1, Ordering::Relaxed);
                    debug!(target: "l2met", "Connection established");
                    Ok(conn)
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(target: "l2met", error = %e, "Dial failed");
                    Err(e)
                }
            }
        })
    }
}
