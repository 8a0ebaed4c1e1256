//! Crossfade - custom radio stations for Fortnite.
//!
//! This is the main binary that runs the full companion:
//! - MITM proxy redirecting radio manifest requests to the backend
//! - Game log watcher deriving the current party
//! - Party sync so everyone hears the leader's stations
//! - Interactive shell for managing stations and bindings

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crossfade_api::{load_or_register, ApiClient, CredentialStore, SyncEngine};
use crossfade_core::{ClientState, LOG_CLOSED_MARKER};
use crossfade_logwatch::{LogEvent, LogTailer};
use crossfade_proxy::{CaManager, Platform, ProxyConfig, ProxyServer, SystemPlatform};

mod shell;

/// Crossfade - custom radio stations for Fortnite
#[derive(Parser, Debug)]
#[command(name = "crossfade", version, about)]
struct Args {
    /// Backend API root URL
    #[arg(long, default_value = "https://api.crossfade.app")]
    api_root: String,

    /// Proxy listen address
    #[arg(long, default_value = "127.0.0.1:18149")]
    listen: SocketAddr,

    /// Game log file (defaults to the game's install location)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "crossfade", "Crossfade").map(|dirs| dirs.data_dir().join("logs"))
}

/// Default location of the game's log file.
fn default_game_log() -> PathBuf {
    let local_app_data = std::env::var_os("LOCALAPPDATA")
        .map(PathBuf::from)
        .unwrap_or_default();

    local_app_data
        .join("FortniteGame")
        .join("Saved")
        .join("Logs")
        .join("FortniteGame.log")
}

/// Initialize logging with file rotation.
///
/// The shell owns stdout, so logs normally go to file only; `--debug` mirrors
/// them to the console as well.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,crossfade={level},crossfade_core={level},crossfade_api={level},\
             crossfade_logwatch={level},crossfade_proxy={level}",
            level = log_level
        ))
    });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("crossfade")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                if args.debug {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stdout))
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                }

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (keep guard alive for the duration of the program)
    let _log_guard = init_logging(&args);

    println!("Crossfade {}", env!("CARGO_PKG_VERSION"));
    println!("Custom radio stations for Fortnite. Type 'help' for commands.");
    println!();

    tracing::info!("Starting Crossfade...");
    tracing::info!("Args: {:?}", args);

    // CA material and the trust store come first; nothing works until the
    // game accepts our certificates. An untrusted root cannot be papered
    // over, so install failures stop the process.
    let ca_manager = CaManager::with_default_dir().context("CA setup failed")?;
    ca_manager.ensure_ca().context("CA setup failed")?;

    let platform = SystemPlatform;
    platform
        .ensure_root_certificate(&ca_manager.cert_path())
        .context("Failed to install the CA certificate")?;

    let store = CredentialStore::with_default_dir().context("Credential store unavailable")?;
    let credentials = load_or_register(&store, &args.api_root)
        .await
        .context("Account registration failed")?;
    let api = ApiClient::new(&args.api_root, credentials).context("API client setup failed")?;

    tracing::info!("Fetching local account");
    let local = api
        .get_user("@me")
        .await
        .context("Failed to fetch the local account")?;
    let state = ClientState::new(api.account_id(), local).into_shared();

    let config = ProxyConfig::new()?
        .with_addr(args.listen)
        .with_ca_manager(ca_manager);
    let server = ProxyServer::new(config, state.clone(), api.clone())?;
    let proxy_handle = server.start().context("Failed to start the proxy")?;

    let previous_proxy = platform
        .enable_system_proxy()
        .context("Failed to enable the system proxy")?;

    // Feed game log batches through the party state machine; each transition
    // kicks off an independent sync so retries never delay newer batches.
    let log_path = args.log_file.clone().unwrap_or_else(default_game_log);
    tracing::info!(path = %log_path.display(), "Watching game log");

    let engine = SyncEngine::new(api.clone(), state.clone());
    let mut log_events = LogTailer::new(&log_path).spawn();
    let consumer_state = state.clone();
    tokio::spawn(async move {
        while let Some(event) = log_events.recv().await {
            let lines = match event {
                LogEvent::Initial(lines) => {
                    // A closed log means the game is not running; its party
                    // lines are history, not current state.
                    if lines
                        .last()
                        .is_some_and(|line| line.contains(LOG_CLOSED_MARKER))
                    {
                        tracing::debug!("Game log is from a finished session; skipping catch-up");
                        continue;
                    }
                    lines
                }
                LogEvent::Append(lines) => lines,
                LogEvent::Error(err) => {
                    tracing::warn!(error = %err, "Game log unavailable; party sync disabled");
                    continue;
                }
            };

            let change = consumer_state.lock().apply_log_lines(&lines);
            if let Some(change) = change {
                let engine = engine.clone();
                tokio::spawn(async move { engine.handle_change(change).await });
            }
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
        _ = shell::run(state.clone(), api.clone()) => {
            tracing::info!("Shell exited");
        }
    }

    if let Err(e) = platform.restore_system_proxy(&previous_proxy) {
        tracing::warn!(error = %e, "Failed to restore the system proxy");
    }
    proxy_handle.stop().await;

    tracing::info!("Crossfade shut down");
    Ok(())
}
