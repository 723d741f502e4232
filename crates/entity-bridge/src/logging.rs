//! Logger setup.
//!
//! The crate logs through the `log` facade. Drivers that do not install their
//! own logger call [`init_logger`] once at startup; the filter comes from
//! `RUST_LOG` and defaults to `info`.

use log::LevelFilter;

/// Install an `env_logger` backend. Safe to call more than once: if a logger
/// is already installed this only prints a warning.
pub fn init_logger() {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();
    if builder.try_init().is_err() {
        eprintln!("[entity-bridge] Warning: a logger is already set.");
    }
}

/// Logger for unit tests: captured by the test harness, never fails.
#[cfg(test)]
pub(crate) fn init_test_logger() {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
