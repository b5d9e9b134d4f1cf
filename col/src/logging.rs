//! Diagnostic tracing for `col`.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. It is separate
//! from run artifacts under `runs_dir`, which are always written and are
//! unaffected by the filter. Command output on stdout never carries tracing.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Defaults to `warn` when `RUST_LOG` is unset.
///
/// ```bash
/// RUST_LOG=col=debug col run -c context.json -q "next step?"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
