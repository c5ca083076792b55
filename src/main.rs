use anyhow::Context;
use clap::Parser;
use std::io::Write;
use upscale_pipeline::utils::{logger, validation::Validate};
use upscale_pipeline::{CliConfig, OutputOutcome, UpscaleEngine, UpscaleError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }
    tracing::debug!("CLI config: {:?}", config);

    let outcome = match run(&config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(
                "❌ Upscale failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            if e.is_retryable() {
                tracing::info!("🔁 The same request may succeed if run again");
            }
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };

    // The only line ever written to stdout.
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", outcome.resolution()).context("failed to write the result line")?;
    Ok(())
}

async fn run(config: &CliConfig) -> Result<OutputOutcome, UpscaleError> {
    config.validate()?;
    let tools = config.tool_config()?;
    let engine = UpscaleEngine::from_config(&tools)?;
    engine.run(&config.to_raw_request()).await
}
