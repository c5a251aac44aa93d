//! Logging setup.
//!
//! Logs go to stderr so they never interleave with the countdown line on
//! stdout. Set `DEBUG_LOGGING=1` to enable debug output for this crate.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub fn init() {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let filter_directive = if debug_logging {
        "warn,examtimer=debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(EnvFilter::new(filter_directive))
        .init();

    tracing::debug!(debug_logging, "logging initialized");
}
