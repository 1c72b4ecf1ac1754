//! Inbound log message model.
//!
//! These types mirror what the log router hands to an adapter: the raw line,
//! the stream it was written to, when it was written, and the container that
//! produced it. The adapter only ever reads them.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The output stream a log line was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    Stdout,
    Stderr,
    Other(String),
}

impl Source {
    pub fn as_str(&self) -> &str {
        match self {
            Source::Stdout => "stdout",
            Source::Stderr => "stderr",
            Source::Other(name) => name,
        }
    }
}

impl From<&str> for Source {
    fn from(value: &str) -> Self {
        match value {
            "stdout" => Source::Stdout,
            "stderr" => Source::Stderr,
            other => Source::Other(other.to_string()),
        }
    }
}

impl From<String> for Source {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stdout" => Source::Stdout,
            "stderr" => Source::Stderr,
            _ => Source::Other(value),
        }
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        source.as_str().to_string()
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of the container a line came from.
///
/// Docker reports container names with a leading `/`, e.g. `/web.1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container name as reported by the engine
    pub name: String,

    /// Hostname configured inside the container
    #[serde(default)]
    pub hostname: String,

    /// Process id of the container's init process
    #[serde(default)]
    pub pid: i64,
}

impl Container {
    pub fn new(name: impl Into<String>, hostname: impl Into<String>, pid: i64) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            pid,
        }
    }
}

/// A single log line delivered by the router.
///
/// Many messages share one container, so the metadata is reference counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Raw log text, without trailing newline
    pub data: String,

    /// Stream the line was written to
    pub source: Source,

    /// Time the line was emitted
    pub time: DateTime<FixedOffset>,

    /// Originating container
    pub container: Arc<Container>,
}

impl LogMessage {
    pub fn new(
        container: Arc<Container>,
        source: impl Into<Source>,
        time: DateTime<FixedOffset>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            source: source.into(),
            time,
            container,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_str() {
        assert_eq!(Source::from("stdout"), Source::Stdout);
        assert_eq!(Source::from("stderr"), Source::Stderr);
        assert_eq!(Source::from("tty"), Source::Other("tty".to_string()));
        assert_eq!(Source::from("tty").to_string(), "tty");
    }

    #[test]
    fn test_message_deserialization() {
        let json = r#"{
            "data": "measure#db.latency=12ms",
            "source": "stderr",
            "time": "2023-01-01T12:00:00Z",
            "container": {"name": "/web.1", "hostname": "abc123", "pid": 42}
        }"#;

        let message: LogMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.data, "measure#db.latency=12ms");
        assert_eq!(message.source, Source::Stderr);
        assert_eq!(message.container.name, "/web.1");
        assert_eq!(message.container.pid, 42);
        assert_eq!(message.time.to_rfc3339(), "2023-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_message_serialization_inlines_shared_container() {
        let container = Arc::new(Container::new("/web.1", "abc123", 42));
        let time = DateTime::parse_from_rfc3339("2023-01-01T12:00:00Z").unwrap();
        let first = LogMessage::new(container.clone(), "stdout", time, "count#a=1");
        let second = LogMessage::new(container, "stderr", time, "count#b=2");

        let value = serde_json::to_value([&first, &second]).unwrap();
        assert_eq!(value[0]["container"]["name"], "/web.1");
        assert_eq!(value[1]["container"]["pid"], 42);
        assert_eq!(value[0]["source"], "stdout");
        assert_eq!(value[1]["source"], "stderr");
    }

    #[test]
    fn test_container_defaults() {
        let json = r#"{"name": "/worker"}"#;
        let container: Container = serde_json::from_str(json).unwrap();
        assert_eq!(container.hostname, "");
        assert_eq!(container.pid, 0);
    }
}
