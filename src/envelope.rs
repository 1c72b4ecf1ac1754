//! RFC5424 envelope rendering.
//!
//! Every forwarded line becomes one syslog message:
//!
//! ```text
//! <PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID - SD MSG\n
//! ```
//!
//! optionally preceded by its own byte length (octet counting), which is the
//! framing Logplex-style drains use.

use std::fmt::Write;

use chrono::SecondsFormat;
use thiserror::Error;

use crate::message::{LogMessage, Source};

/// Syslog facilities this adapter reports under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facility {
    User = 1,
    Daemon = 3,
}

/// Syslog severities this adapter reports with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error = 3,
    Info = 6,
}

/// Facility/severity pair of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    pub facility: Facility,
    pub severity: Severity,
}

impl Priority {
    /// Map the stream a line was written to onto a priority.
    pub fn from_source(source: &Source) -> Self {
        match source {
            Source::Stdout => Self {
                facility: Facility::User,
                severity: Severity::Info,
            },
            Source::Stderr => Self {
                facility: Facility::User,
                severity: Severity::Error,
            },
            Source::Other(_) => Self {
                facility: Facility::Daemon,
                severity: Severity::Info,
            },
        }
    }

    /// Combined `PRI` value, `facility * 8 + severity`.
    pub fn code(&self) -> u8 {
        (self.facility as u8) * 8 + self.severity as u8
    }
}

/// How a rendered message is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// `<len> <message>`
    #[default]
    LengthPrefixed,
    /// The message as-is; the transport delimits it.
    Unframed,
}

impl std::str::FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "length-prefixed" | "octet-counted" => Ok(Framing::LengthPrefixed),
            "unframed" => Ok(Framing::Unframed),
            other => Err(format!(
                "'{}' is not one of length-prefixed, octet-counted, unframed",
                other
            )),
        }
    }
}

/// Rendering of the STRUCTURED-DATA field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructuredData {
    /// NILVALUE, `-`
    #[default]
    Nil,
    /// Empty bracket pair, `[]`
    Empty,
}

impl StructuredData {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructuredData::Nil => "-",
            StructuredData::Empty => "[]",
        }
    }
}

impl std::str::FromStr for StructuredData {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nil" | "-" => Ok(StructuredData::Nil),
            "empty" | "[]" => Ok(StructuredData::Empty),
            other => Err(format!("'{}' is not one of nil, empty", other)),
        }
    }
}

/// Errors that prevent a message from being rendered.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("container name is empty, cannot derive app name")]
    EmptyContainerName,

    #[error("failed to write envelope: {0}")]
    Write(#[from] std::fmt::Error),
}

/// Renders log messages into syslog envelopes.
///
/// Rendering is a pure function of the message and the formatter's settings.
#[derive(Debug, Clone)]
pub struct EnvelopeFormatter {
    hostname: String,
    framing: Framing,
    structured_data: StructuredData,
}

impl EnvelopeFormatter {
    /// `hostname` is the reporting host, i.e. the machine doing the forwarding.
    pub fn new(
        hostname: impl Into<String>,
        framing: Framing,
        structured_data: StructuredData,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            framing,
            structured_data,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Render `message` into the bytes to POST.
    ///
    /// # Errors
    ///
    /// Returns `FormatError::EmptyContainerName` when there is no app name
    /// to derive.
    pub fn render(&self, message: &LogMessage) -> Result<Vec<u8>, FormatError> {
        let app_name = app_name(&message.container.name)?;
        let priority = Priority::from_source(&message.source);
        let timestamp = message.time.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut line = String::with_capacity(64 + message.data.len());
        writeln!(
            line,
            "<{}>1 {} {} {} {} - {} {}",
            priority.code(),
            timestamp,
            self.hostname,
            app_name,
            message.container.pid,
            self.structured_data.as_str(),
            message.data,
        )?;

        match self.framing {
            Framing::Unframed => Ok(line.into_bytes()),
            Framing::LengthPrefixed => {
                let mut framed = String::with_capacity(line.len() + 8);
                write!(framed, "{} {}", line.len(), line)?;
                Ok(framed.into_bytes())
            }
        }
    }
}

/// Container name without its leading separator.
fn app_name(container_name: &str) -> Result<&str, FormatError> {
    let mut chars = container_name.chars();
    match chars.next() {
        Some(_) => Ok(chars.as_str()),
        None => Err(FormatError::EmptyContainerName),
    }
}
