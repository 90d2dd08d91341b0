//! Logger setup for the `flinkpilot` binary
//!
//! Library code only uses the `log` macros; this is the single place that
//! installs a backend.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Install `env_logger` with `info` as default level (`debug` when verbose)
///
/// reqwest and hyper are held at `warn`. `RUST_LOG` is parsed last, so its
/// directives, including per-module ones such as `reqwest=debug`, win over
/// both. Calling this twice is harmless.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder = logging_builder(default_level, "RUST_LOG");

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

fn logging_builder(default_level: &str, filter_var: &str) -> Builder {
    let mut builder = Builder::new();
    builder
        .format_timestamp_millis()
        .format_target(false)
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("hyper_util", LevelFilter::Warn)
        .parse_env(Env::new().filter_or(filter_var, default_level));
    builder
}
