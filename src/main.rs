//! nyaastream - search nyaa.si and stream torrents from the terminal
//!
//! # Usage
//!
//! ```bash
//! # Search nyaa.si
//! nyaastream
//!
//! # Pick files from a pasted link, or stream one whole
//! nyaastream link
//! nyaastream stream
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nyaastream::api::NyaaClient;
use nyaastream::app::{Mode, SessionState};
use nyaastream::cli::{Cli, ExitCode};
use nyaastream::config::Config;
use nyaastream::history::HistoryLog;
use nyaastream::navigator::{Navigator, Services};
use nyaastream::stream::{WebtorrentPlayer, WebtorrentResolver, Workspace};
use nyaastream::ui::TerminalConsole;

/// Environment variable holding the log filter
const LOG_ENV: &str = "NYAASTREAM_LOG";

/// How long to wait for blocking tasks (the stdin reader) at shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!("Fatal error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::Error
        }
    };
    std::process::exit(code.into());
}

fn run(cli: Cli) -> Result<()> {
    init_logging();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => Config::path().context("Could not determine config directory")?,
    };
    tracing::info!("Loading configuration from {:?}", config_path);
    let config = Config::load_or_prompt(&config_path, std::io::stdin().lock(), std::io::stdout())
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    let history_path = config
        .history_path()
        .context("Could not determine history location")?;
    let history = HistoryLog::open(history_path, config.history.record)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(session(cli.mode(), config, history));

    // A pending stdin read never finishes on its own
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn session(mode: Mode, config: Config, history: HistoryLog) -> Result<()> {
    let workspace = Workspace::in_temp_dir();
    let _cleanup = workspace.guard();

    let (tx, interrupts) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });

    let services = Services {
        listing: Box::new(NyaaClient::new(config.search_params())),
        resolver: Box::new(WebtorrentResolver::new(workspace.clone())),
        player: Box::new(WebtorrentPlayer::new(
            workspace.clone(),
            config.playback.player,
            config.playback.player_args.clone(),
        )),
        history: Box::new(history),
    };
    let console = TerminalConsole::new().context("Failed to open terminal")?;
    let state = SessionState::new(mode, config.playback.formats.clone());

    let outcome = Navigator::new(services, console, interrupts)
        .run(state)
        .await?;
    tracing::info!(exit = ?outcome.exit, "bye");
    Ok(())
}

/// Log to a file under the cache dir; the terminal belongs to the UI
fn init_logging() {
    let Some(path) = log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
}

fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("nyaastream").join("nyaastream.log"))
}
