// Logging bootstrap

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Install `env_logger` once per process. `RUST_LOG` overrides the default
/// `info` level. Does nothing if the host application already set a logger.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder()
            .is_test(false)
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .try_init();
    });
}

/// Logger setup for tests: output is captured by the test harness
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .parse_default_env()
        .try_init();
}
