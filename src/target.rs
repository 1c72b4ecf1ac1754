//! Resolved delivery endpoint.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;

use crate::config::ConfigError;

/// Everything except RFC3986 unreserved characters is escaped.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Endpoint every envelope is POSTed to, fixed for the adapter's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    url: Url,
}

impl DeliveryTarget {
    /// Resolve `endpoint` plus the route's options into a target URL.
    ///
    /// Options become the query string, sorted by key. An endpoint that
    /// already carries a query keeps it and gets the options appended.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEndpoint` for a blank endpoint and
    /// `ConfigError::InvalidEndpoint` if it is not an absolute http(s) URL.
    pub fn new(endpoint: &str, options: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }

        let mut url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let options = build_query(options);
        if !options.is_empty() {
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{}&{}", existing, options),
                _ => options,
            };
            url.set_query(Some(&query));
        }

        match url.scheme() {
            "http" | "https" => Ok(Self { url }),
            scheme => Err(ConfigError::InvalidEndpoint {
                url: endpoint.to_string(),
                reason: format!("unsupported scheme '{}'", scheme),
            }),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Scheme, host, port and path only; drain URLs usually carry credentials.
impl std::fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.url.scheme(), self.url.host_str().unwrap_or(""))?;
        if let Some(port) = self.url.port() {
            write!(f, ":{}", port)?;
        }
        f.write_str(self.url.path())
    }
}

/// `key=value` pairs joined by `&`, keys in lexicographic order, both sides
/// percent-encoded.
pub fn build_query(options: &BTreeMap<String, String>) -> String {
    options
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
