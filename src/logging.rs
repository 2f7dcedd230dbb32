//! Logging initialization and configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "profview=info";

fn build_filter(directive: Option<&str>) -> EnvFilter {
    match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .or_else(|_| EnvFilter::try_new(format!("profview={directive}")))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Initialize the logging system with an explicit filter directive.
///
/// `directive` is either a full `EnvFilter` directive (`"profview=debug,tower_http=info"`)
/// or a bare level (`"debug"`). Invalid directives fall back to `profview=info`.
///
/// # Panics
///
/// Panics if another tracing subscriber has already been set.
pub fn init(directive: &str) {
    tracing_subscriber::registry()
        .with(build_filter(Some(directive)))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

/// Try to initialize the logging system from `RUST_LOG`.
///
/// Returns `Err` if logging has already been initialized.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(build_filter(None))
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_idempotent() {
        let _ = try_init();
        let _ = try_init();
    }

    #[test]
    fn test_build_filter_accepts_bare_level() {
        let filter = build_filter(Some("debug"));
        assert!(filter.to_string().contains("debug"));
    }

    #[test]
    fn test_build_filter_accepts_full_directive() {
        let filter = build_filter(Some("profview=trace,tower_http=warn"));
        let rendered = filter.to_string();
        assert!(rendered.contains("profview=trace"));
        assert!(rendered.contains("tower_http=warn"));
    }

    #[test]
    fn test_logging_works() {
        let _ = try_init();

        tracing::info!("test info message");
        tracing::debug!("test debug message");
        tracing::warn!("test warn message");
    }
}
