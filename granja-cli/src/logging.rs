use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `GRANJA_LOG` wins over `RUST_LOG`;
/// with neither set only warnings are shown.
pub fn init() {
    let filter = std::env::var("GRANJA_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
