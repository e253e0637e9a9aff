//! Shared test setup

use tracing_subscriber::EnvFilter;

/// Install a tracing subscriber honoring `RUST_LOG`, once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
