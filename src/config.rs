//! Configuration module for the l2met adapter.
//!
//! The router only tells an adapter which route it serves. Everything else,
//! the l2met drain URL included, comes from the environment of the
//! forwarding process.

use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::adapter::{DeliveryMode, DEFAULT_MAX_IN_FLIGHT};
use crate::envelope::{Framing, StructuredData};
use crate::hostname;
use crate::registry::Route;
use crate::target::DeliveryTarget;

/// Drain URL envelopes are POSTed to
pub const URL_ENV: &str = "L2MET_URL";

/// Envelope framing: `length-prefixed` (alias `octet-counted`) or `unframed`
pub const FRAMING_ENV: &str = "L2MET_FRAMING";

/// STRUCTURED-DATA rendering: `nil` or `empty`
pub const STRUCTURED_DATA_ENV: &str = "L2MET_STRUCTURED_DATA";

/// Delivery mode: `concurrent` or `sequential`
pub const DELIVERY_ENV: &str = "L2MET_DELIVERY";

/// Concurrent mode cap on outstanding requests, `0` for no cap
pub const MAX_IN_FLIGHT_ENV: &str = "L2MET_MAX_IN_FLIGHT";

/// Per-request timeout in seconds
pub const REQUEST_TIMEOUT_ENV: &str = "L2MET_REQUEST_TIMEOUT_SECS";

/// Upper bound for the in-flight cap
const MAX_MAX_IN_FLIGHT: usize = 10_000;

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Minimum request timeout
const MIN_REQUEST_TIMEOUT_SECS: u64 = 1;

/// Maximum request timeout
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Configuration for one adapter instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base drain URL
    pub endpoint: String,

    /// Route options, appended to the endpoint as a query string
    pub route_options: BTreeMap<String, String>,

    /// Reporting hostname written into every envelope
    pub hostname: String,

    /// Envelope framing
    pub framing: Framing,

    /// STRUCTURED-DATA rendering
    pub structured_data: StructuredData,

    /// Sequential or concurrent delivery
    pub delivery: DeliveryMode,

    /// HTTP request timeout duration
    pub request_timeout: Duration,
}

/// Errors that prevent an adapter from being constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("l2met url not found: set L2MET_URL or give the route an address")]
    MissingEndpoint,

    #[error("invalid l2met url '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Configuration error for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },

    #[error("invalid metric pattern: {0}")]
    Pattern(regex::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    fn invalid(var: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl Config {
    /// Configuration with defaults for everything but the endpoint.
    ///
    /// The hostname is resolved here, once.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            route_options: BTreeMap::new(),
            hostname: hostname::resolve(),
            framing: Framing::default(),
            structured_data: StructuredData::default(),
            delivery: DeliveryMode::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `L2MET_URL` is unset, blank, or not an http(s) URL
    /// - any optional `L2MET_*` variable holds an unrecognised value
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load configuration for a router route.
    ///
    /// `L2MET_URL` wins over the route's address; the route's options always
    /// become the query string.
    pub fn from_env_with_route(route: &Route) -> Result<Self, ConfigError> {
        Self::load(Some(route))
    }

    fn load(route: Option<&Route>) -> Result<Self, ConfigError> {
        let endpoint = env::var(URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| {
                route
                    .map(|r| r.address.clone())
                    .filter(|address| !address.trim().is_empty())
            })
            .ok_or(ConfigError::MissingEndpoint)?;

        let mut config = Self::new(endpoint);
        if let Some(route) = route {
            config.route_options = route.options.clone();
        }

        config.framing = Self::parse_choice(FRAMING_ENV, config.framing)?;
        config.structured_data = Self::parse_choice(STRUCTURED_DATA_ENV, config.structured_data)?;
        config.delivery = Self::parse_delivery()?;
        config.request_timeout = Duration::from_secs(Self::parse_request_timeout()?);

        // Surface a bad URL now rather than at adapter construction.
        config.target()?;

        Ok(config)
    }

    /// Resolve the delivery target from the endpoint and route options.
    pub fn target(&self) -> Result<DeliveryTarget, ConfigError> {
        DeliveryTarget::new(&self.endpoint, &self.route_options)
    }

    /// Parse an enumerated setting, keeping `default` when unset.
    fn parse_choice<T>(env_var: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr<Err = String>,
    {
        match env::var(env_var) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|reason| ConfigError::invalid(env_var, &value, reason)),
            Err(_) => Ok(default),
        }
    }

    /// Parse delivery mode and in-flight cap.
    fn parse_delivery() -> Result<DeliveryMode, ConfigError> {
        let mode = match env::var(DELIVERY_ENV) {
            Ok(value) => value.trim().to_string(),
            Err(_) => "concurrent".to_string(),
        };

        match mode.as_str() {
            "sequential" => Ok(DeliveryMode::Sequential),
            "concurrent" => {
                let max_in_flight = Self::parse_max_in_flight()?;
                Ok(DeliveryMode::Concurrent {
                    max_in_flight: (max_in_flight > 0).then_some(max_in_flight),
                })
            }
            other => Err(ConfigError::invalid(
                DELIVERY_ENV,
                other,
                format!("'{}' is not one of concurrent, sequential", other),
            )),
        }
    }

    /// Parse the in-flight cap with validation.
    fn parse_max_in_flight() -> Result<usize, ConfigError> {
        let env_var = MAX_IN_FLIGHT_ENV;

        match env::var(env_var) {
            Ok(value) => {
                let max: usize = value.trim().parse().map_err(|_| {
                    ConfigError::invalid(
                        env_var,
                        &value,
                        format!("'{}' is not a valid number", value),
                    )
                })?;

                if max > MAX_MAX_IN_FLIGHT {
                    return Err(ConfigError::invalid(
                        env_var,
                        &value,
                        format!(
                            "in-flight limit {} exceeds maximum allowed ({})",
                            max, MAX_MAX_IN_FLIGHT
                        ),
                    ));
                }

                Ok(max)
            }
            Err(_) => Ok(DEFAULT_MAX_IN_FLIGHT),
        }
    }

    /// Parse the request timeout with validation.
    fn parse_request_timeout() -> Result<u64, ConfigError> {
        let env_var = REQUEST_TIMEOUT_ENV;

        match env::var(env_var) {
            Ok(value) => {
                let secs: u64 = value.trim().parse().map_err(|_| {
                    ConfigError::invalid(
                        env_var,
                        &value,
                        format!("'{}' is not a valid number", value),
                    )
                })?;

                if secs < MIN_REQUEST_TIMEOUT_SECS {
                    return Err(ConfigError::invalid(
                        env_var,
                        &value,
                        format!(
                            "request timeout {} is below minimum ({}s)",
                            secs, MIN_REQUEST_TIMEOUT_SECS
                        ),
                    ));
                }

                if secs > MAX_REQUEST_TIMEOUT_SECS {
                    return Err(ConfigError::invalid(
                        env_var,
                        &value,
                        format!(
                            "request timeout {} exceeds maximum ({}s)",
                            secs, MAX_REQUEST_TIMEOUT_SECS
                        ),
                    ));
                }

                Ok(secs)
            }
            Err(_) => Ok(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}
