use tracing_subscriber::EnvFilter;

/// Fallback filter when neither `RUST_LOG` nor a configured filter is usable.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `default_filter`. Returns `false` if a subscriber
/// was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
