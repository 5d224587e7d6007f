use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Init tracing with default level of `INFO`. `RUST_LOG` takes precedence, e.g.
/// `RUST_LOG=glucose_api::analytics=debug` logs the analytics windows and their reading counts.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter(LevelFilter::INFO))
        .try_init();
}

/// Init tracing with default level of `DEBUG`, writing through the test harness so output is only
/// shown for failing tests.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter(LevelFilter::DEBUG))
        .with_test_writer()
        .try_init();
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}
