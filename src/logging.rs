//! Tracing setup for hosts embedding the adapter.
//!
//! Adapter events are emitted under the `l2met` target, so
//! `RUST_LOG=l2met=debug` narrows output to the forwarding path.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Install a compact fmt subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case that one stays in effect.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .is_ok()
}
