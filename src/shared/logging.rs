use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_FILTER_ENV: &str = "P4AGENT_LOG";

/// Installs the stderr subscriber. `RUST_LOG` wins over `P4AGENT_LOG`, which
/// wins over `default_filter`. Safe to call more than once.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let fallback = std::env::var(LOG_FILTER_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default_filter.to_string());
        EnvFilter::new(fallback)
    });

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}
