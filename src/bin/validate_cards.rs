//! Validate Rule Card files.
//!
//! ```bash
//! validate_cards rules/
//! validate_cards rules/secrets/api-keys.yml --verbose
//! ```
//!
//! Exit codes: 0 when every card is valid, 1 otherwise.

use clap::Parser;
use rulecard_compiler::cli::{self, ExitCode, ValidateArgs};
use rulecard_compiler::config::Config;
use rulecard_compiler::logging;

fn main() -> anyhow::Result<()> {
    let args = ValidateArgs::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            cli::render_config_error(&mut std::io::stdout(), &e)?;
            std::process::exit(ExitCode::Failure.into());
        }
    };
    logging::init(args.verbose, config.logging.format);

    let code = match cli::validate(&args, &mut std::io::stdout().lock()) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Failed to write report");
            ExitCode::Failure
        }
    };
    std::process::exit(code.into());
}
