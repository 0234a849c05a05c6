pub use tracing::{debug, error, info, warn, trace, instrument};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt::{self, format::FmtSpan}};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Installs the global subscriber. Pass timings are reported as span-close
/// events once the filter enables debug output. Later calls are no-ops.
pub fn init_with_default(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let is_debug = wants_span_events(&env_filter.to_string());

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_span_events(if is_debug {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

fn wants_span_events(filter: &str) -> bool {
    filter.contains("debug") || filter.contains("trace")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_events_follow_filter() {
        assert!(wants_span_events("opposed_hl_rs=debug"));
        assert!(wants_span_events("trace"));
        assert!(!wants_span_events("info"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_with_default("warn");
        init();
        info!(filter = DEFAULT_FILTER, "Logger initialized");
        debug!("Suppressed below the warn filter");
    }
}
