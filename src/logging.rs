//! Logging and tracing setup for the compiler binaries.
//!
//! Logs go to stderr; stdout is reserved for the user-facing report.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Initialize the tracing subscriber.
///
/// Reads log level from RUST_LOG environment variable.
/// Defaults to `rulecard_compiler=warn`, or `rulecard_compiler=debug` when verbose.
pub fn init(verbose: bool, format: LogFormat) {
    let default_directive = if verbose {
        "rulecard_compiler=debug"
    } else {
        "rulecard_compiler=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .init(),
    }
}

/// Initialize tracing for tests (human-readable format, no JSON).
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("rulecard_compiler=debug")
        .try_init();
}
