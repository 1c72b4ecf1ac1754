//! Reporting hostname detection.
//!
//! The HOSTNAME field of every envelope names the machine running the
//! forwarder, not the container. It is resolved once when the configuration
//! is loaded and never changes afterwards.

use std::env;

use tracing::warn;

/// Environment override for the reporting hostname.
pub const HOSTNAME_ENV: &str = "L2MET_HOSTNAME";

/// RFC5424 NILVALUE, used when no hostname can be determined.
const NIL_HOSTNAME: &str = "-";

/// Resolve the hostname to report.
///
/// Order: `L2MET_HOSTNAME`, then the system hostname, then `-`.
pub fn resolve() -> String {
    if let Ok(hostname) = env::var(HOSTNAME_ENV) {
        let hostname = hostname.trim();
        if !hostname.is_empty() {
            return hostname.to_string();
        }
    }

    match nix::unistd::gethostname() {
        Ok(hostname) => match hostname.into_string() {
            Ok(hostname) if !hostname.is_empty() => return hostname,
            Ok(_) => warn!(target: "l2met", "System hostname is empty"),
            Err(raw) => warn!(target: "l2met", hostname = ?raw, "System hostname is not UTF-8"),
        },
        Err(e) => warn!(target: "l2met", error = %e, "Failed to get system hostname"),
    }

    NIL_HOSTNAME.to_string()
}
