//! Plugging the adapter into a log router.
//!
//! A router keeps a table of adapter factories keyed by name and, for each
//! route naming one of them, builds an adapter and hands it the route's
//! message stream. This module models that contract; the adapter core in
//! [`crate::adapter`] does not depend on it.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::adapter::{L2metAdapter, StreamSummary};
use crate::config::{Config, ConfigError};
use crate::message::LogMessage;

/// Name the l2met adapter registers under.
pub const ADAPTER_NAME: &str = "l2met";

/// A router binding of an adapter to a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Route identifier
    #[serde(default = "new_route_id")]
    pub id: String,

    /// Name of the adapter serving this route
    pub adapter: String,

    /// Destination address, may be empty
    #[serde(default)]
    pub address: String,

    /// Adapter options, sent along as query parameters
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

fn new_route_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Route {
    /// Create a route with a fresh random id and no options.
    pub fn new(adapter: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: new_route_id(),
            adapter: adapter.into(),
            address: address.into(),
            options: BTreeMap::new(),
        }
    }
}

/// Future returned by [`LogAdapter::stream`].
pub type StreamFuture = Pin<Box<dyn Future<Output = StreamSummary> + Send>>;

/// An adapter as the router sees it.
pub trait LogAdapter: Send {
    /// Consume the route's messages until the router closes the channel.
    fn stream(self: Box<Self>, messages: mpsc::Receiver<LogMessage>) -> StreamFuture;
}

impl LogAdapter for L2metAdapter {
    fn stream(self: Box<Self>, messages: mpsc::Receiver<LogMessage>) -> StreamFuture {
        Box::pin(async move { L2metAdapter::stream(&self, messages).await })
    }
}

/// Builds an adapter for a route.
pub type AdapterFactory = fn(&Route) -> Result<Box<dyn LogAdapter>, ConfigError>;

/// Table of adapter factories by name.
#[derive(Default)]
pub struct AdapterFactories {
    factories: HashMap<String, AdapterFactory>,
}

impl AdapterFactories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: AdapterFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn lookup(&self, name: &str) -> Option<AdapterFactory> {
        self.factories.get(name).copied()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Factory for the l2met adapter: environment configuration plus the route.
pub fn l2met_factory(route: &Route) -> Result<Box<dyn LogAdapter>, ConfigError> {
    let config = Config::from_env_with_route(route)?;
    Ok(Box::new(L2metAdapter::new(&config)?))
}

/// Register the l2met adapter with a router's factory table.
pub fn register(factories: &mut AdapterFactories) {
    factories.register(ADAPTER_NAME, l2met_factory);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_factory(_route: &Route) -> Result<Box<dyn LogAdapter>, ConfigError> {
        Err(ConfigError::MissingEndpoint)
    }

    #[test]
    fn test_route_new_assigns_id() {
        let first = Route::new("l2met", "https://l2met.example.com/logs");
        let second = Route::new("l2met", "https://l2met.example.com/logs");
        assert_eq!(first.id.len(), 32);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_route_deserialization() {
        let json = r#"{
            "adapter": "l2met",
            "address": "https://l2met.example.com/logs",
            "options": {"b": "2", "a": "1 1"}
        }"#;

        let route: Route = serde_json::from_str(json).unwrap();
        assert_eq!(route.adapter, "l2met");
        assert!(!route.id.is_empty());
        assert_eq!(
            route.options.keys().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_register_and_lookup() {
        let mut factories = AdapterFactories::new();
        assert!(factories.lookup(ADAPTER_NAME).is_none());

        register(&mut factories);
        factories.register("broken", failing_factory);

        assert!(factories.lookup(ADAPTER_NAME).is_some());
        assert_eq!(factories.names(), vec!["broken", "l2met"]);

        let factory = factories.lookup("broken").unwrap();
        let result = factory(&Route::new("broken", ""));
        assert!(matches!(result, Err(ConfigError::MissingEndpoint)));
    }
}
