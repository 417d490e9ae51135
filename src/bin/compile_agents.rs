//! Compile agent packages from the Rule Card corpus.
//!
//! ```bash
//! compile_agents --manifest agents.yaml --output dist/agents
//! compile_agents --check
//! ```
//!
//! Exit codes:
//! - 0: every agent compiled (or is up to date with `--check`)
//! - 1: an agent failed, strict mode aborted, or packages drifted
//! - 2: the manifest or configuration is unusable

use clap::Parser;
use rulecard_compiler::cli::{self, CompileArgs, ExitCode};
use rulecard_compiler::config::Config;
use rulecard_compiler::engine::Cancellation;
use rulecard_compiler::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CompileArgs::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            cli::render_config_error(&mut std::io::stdout(), &e)?;
            std::process::exit(ExitCode::ConfigError.into());
        }
    };
    logging::init(args.verbose, config.logging.format);

    tracing::info!("Starting compile_agents v{}", env!("CARGO_PKG_VERSION"));

    let cancel = Cancellation::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight packages");
            on_interrupt.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    let mut code = cli::compile(&args, &config, &cancel, &mut stdout).await?;
    if cancel.is_cancelled() && code == ExitCode::Success {
        code = ExitCode::Failure;
    }
    std::process::exit(code.into());
}
