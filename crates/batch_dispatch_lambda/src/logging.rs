use tracing_subscriber::EnvFilter;

/// Installs the JSON subscriber used by both functions.
///
/// Lambda ships stdout to CloudWatch and stamps each line itself, so events
/// carry no timestamp of their own. Level comes from `RUST_LOG`, default `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second init (tests, warm reuse) is harmless.
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_target(false)
        .without_time()
        .try_init();
}
