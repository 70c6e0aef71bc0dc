use anyhow::{Context, Result};
use clap::Parser;

use rwinrm::app::{run_one_shot_mode, run_repl_mode, setup_from_cli};
use rwinrm::logging::request_logger::log_session_summary;
use rwinrm::{Cli, WinRmSession};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Resolve credentials, encoding and the rest of the configuration
    let app_config = setup_from_cli(&cli)?;
    let config = &app_config.configuration;
    log_session_summary(&app_config.summary(), config.verbose);

    let session = WinRmSession::connect(config)
        .with_context(|| format!("Failed to set up a session to {}", config.host))?;

    // One-shot mode replaces the REPL entirely
    if config.is_one_shot() {
        let code = run_one_shot_mode(&session, config).await?;
        std::process::exit(code);
    }

    run_repl_mode(&session, config).await
}
