pub mod mock_server;

use std::env;
use std::sync::Arc;

use chrono::DateTime;
use l2met_adapter::{Config, Container, DeliveryMode, LogMessage};

pub use mock_server::MockServer;

/// Adapter config pointed at `server`, with a fixed reporting host.
pub fn config_for(server: &MockServer, delivery: DeliveryMode) -> Config {
    let mut config = Config::new(server.url("/logs"));
    config.hostname = "forwarder".to_string();
    config.delivery = delivery;
    config
}

/// A stdout line from container `/web.1` (pid 42) at 2023-01-01T12:00:00Z.
pub fn message(data: &str) -> LogMessage {
    let container = Arc::new(Container::new("/web.1", "c0ffee", 42));
    let time = DateTime::parse_from_rfc3339("2023-01-01T12:00:00Z").unwrap();
    LogMessage::new(container, "stdout", time, data)
}

/// Sets or removes an environment variable, restoring the previous value on drop.
#[allow(dead_code)]
pub struct EnvGuard {
    key: String,
    original: Option<String>,
}

#[allow(dead_code)]
impl EnvGuard {
    pub fn set(key: &str, value: &str) -> Self {
        let original = env::var(key).ok();
        env::set_var(key, value);
        Self {
            key: key.to_string(),
            original,
        }
    }

    pub fn remove(key: &str) -> Self {
        let original = env::var(key).ok();
        env::remove_var(key);
        Self {
            key: key.to_string(),
            original,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.original {
            Some(val) => env::set_var(&self.key, val),
            None => env::remove_var(&self.key),
        }
    }
}
