use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;

use chatflow_cli::{config::Config, logging::init_logging, run_turn, Cli, TerminalSink};
use chatflow_client::ChatClient;
use chatflow_stream::{CancellationToken, Terminal};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration, then let flags win
    let mut config = Config::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config.apply_cli(&cli);

    init_logging(&config.logging);
    tracing::debug!("Using backend at {}", config.server.base_url);

    let mut builder = ChatClient::builder()
        .base_url(&config.server.base_url)
        .connect_timeout(config.timeout());
    if let Some(api_key) = &config.api_key {
        builder = builder.api_key(api_key);
    }
    let client = builder.build().context("Failed to create chat client")?;

    // Ctrl-C stops the stream; the partial reply stays on screen
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling the reply stream");
            on_interrupt.cancel();
        }
    });

    let mut sink = TerminalSink::stdio();
    let outcome = run_turn(&client, cli.mode, &cli.message, &config, &mut sink, cancel).await?;

    tracing::debug!(
        renders = outcome.renders,
        malformed_lines = outcome.malformed_lines,
        "Reply finished: {} bytes",
        outcome.text.len()
    );

    match outcome.terminal {
        Terminal::Failed { message } => anyhow::bail!("Server reported an error: {}", message),
        Terminal::Cancelled => Ok(ExitCode::from(130)),
        Terminal::Done | Terminal::Sentinel | Terminal::Exhausted => Ok(ExitCode::SUCCESS),
    }
}
