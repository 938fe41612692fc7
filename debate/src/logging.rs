//! Diagnostic tracing for the debate binaries.
//!
//! Tracing output goes to stderr and is controlled by `RUST_LOG`. It is
//! separate from the debate's product artifacts (transcript, round
//! documents, synthesis), which are always written.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Reads `RUST_LOG`, falling back to `default_directive` (normally `warn`).
///
/// ```bash
/// RUST_LOG=debate=debug debate run
/// ```
pub fn init(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
