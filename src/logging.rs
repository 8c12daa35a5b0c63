//! Logging setup. Library code only uses the `log` macros; binaries and tests pick the sink.

pub use log::{debug, error, info, trace, warn};

/// Initialize `env_logger`, honoring `RUST_LOG` and defaulting to `info`.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Like [`init`] but safe to call repeatedly, e.g. from several tests in one process.
pub fn try_init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
