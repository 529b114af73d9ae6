use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use atm_sim::Controller;
use atm_sim::config::load_settings;
use atm_sim::speech::{Muted, Speaker, TtsClient, spawn_worker};
use atm_sim::store::{BalanceStore, DocumentStore};
use atm_sim::terminal::{Command, HELP, parse_line, render_log, render_screen, render_table};

#[derive(Debug, Parser)]
#[command(name = "atm-sim", about = "Terminal ATM session simulator")]
struct Cli {
    /// Settings file (defaults to ./atm.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Account document, overrides the settings file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Disable spoken feedback
    #[arg(long)]
    mute: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(store) = cli.store {
        settings.store_path = store;
    }
    if cli.mute {
        settings.speech.enabled = false;
    }

    let defaults = settings.account_defaults();
    let store = Arc::new(
        DocumentStore::open(&settings.store_path, &defaults)
            .await
            .with_context(|| format!("failed to open account {}", settings.store_path.display()))?,
    );

    let speaker: Arc<dyn Speaker> = match settings.tts_options() {
        Some(options) => Arc::new(TtsClient::new(options).context("failed to build tts client")?),
        None => {
            if settings.speech.enabled {
                warn!("speech skipped: GEMINI_API_KEY is not configured");
            }
            Arc::new(Muted)
        }
    };
    let (feedback, speech_worker) = spawn_worker(speaker);

    let mut atm = Controller::new(store.clone(), settings.rules()).with_feedback(feedback);
    println!("{}", render_screen(&atm));

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    'input: while let Some(line) = lines.next().await {
        let line = line.context("failed to read stdin")?;
        for command in parse_line(&line) {
            match command {
                Ok(Command::Key(key)) => {
                    atm.press(key).await;
                }
                Ok(Command::ShowLog) => print!("{}", render_log(atm.log())),
                Ok(Command::ClearLog) => atm.clear_log(),
                Ok(Command::ResetBalance) => {
                    match store.write_balance(defaults.starting_balance).await {
                        Ok(()) => println!("Balance reset to {}.", defaults.starting_balance),
                        Err(e) => {
                            error!(error = %e, "balance reset failed");
                            println!("Failed to reset balance.");
                        }
                    }
                }
                Ok(Command::ShowTable) => print!("{}", render_table()),
                Ok(Command::Help) => print!("{HELP}"),
                Ok(Command::Quit) => break 'input,
                Err(e) => println!("{e}"),
            }
        }
        println!("{}", render_screen(&atm));
    }

    // closing the feedback channel lets queued speech finish
    drop(atm);
    if let Err(e) = speech_worker.await {
        error!(error = %e, "speech worker panicked");
    }
    Ok(())
}
