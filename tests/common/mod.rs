use std::path::PathBuf;

use ssa_interp::{Bridge, Result};

pub fn initialize_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

pub fn bridge(name: &str) -> Result<Bridge> {
    initialize_logger();
    Bridge::initialize(fixture(name), "main", true)
}
