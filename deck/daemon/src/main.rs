//! Deck Daemon - HTTP Remote Control for Presentations
//!
//! Serves a directory of decks over HTTP and drives the presentation viewer
//! on the machine it runs on. Clients start and stop decks, upload files,
//! build table slides and play media.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (port 1958, current directory)
//! deck-daemon
//!
//! # Serve a deck directory on another port
//! deck-daemon --listen :8080 --dir /srv/decks
//!
//! # With config file
//! deck-daemon --config /etc/deck/daemon.toml
//!
//! # Verbose logging
//! RUST_LOG=debug deck-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown (stops the running deck, removes the PID file)

mod server;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use deck_core::{
    default_config_path, load_config_from_path, ConfigOverrides, DeckController, DeckLibrary,
    SystemLauncher,
};
use server::AppState;

/// Deck Daemon - HTTP remote control for presentation decks
#[derive(Parser, Debug)]
#[command(name = "deck-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// HTTP listen address (`host:port` or `:port`)
    #[arg(short = 'p', long, env = "DECK_LISTEN", value_name = "ADDR")]
    listen: Option<String>,

    /// Directory holding decks and media
    #[arg(short = 'd', long = "dir", env = "DECK_DIR", value_name = "DIR")]
    deck_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "DECK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// PID file path
    #[arg(long, env = "DECK_PID_FILE", value_name = "PATH")]
    pid_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "DECK_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref listen) = self.listen {
            overrides = overrides.with_listen(listen.clone());
        }
        if let Some(ref dir) = self.deck_dir {
            overrides = overrides.with_deck_dir(dir.clone());
        }
        overrides
    }
}

/// Get the default PID file path
///
/// Uses XDG_RUNTIME_DIR if available, otherwise /tmp/deck-$UID/
fn default_pid_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("deck").join("deck-daemon.pid")
    } else {
        let uid = nix::unistd::getuid();
        PathBuf::from(format!("/tmp/deck-{uid}/deck-daemon.pid"))
    }
}

/// Write PID file
fn write_pid_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create PID directory: {parent:?}"))?;
    }

    let pid = std::process::id();
    let mut file =
        fs::File::create(path).with_context(|| format!("Failed to create PID file: {path:?}"))?;
    writeln!(file, "{pid}")?;

    info!(pid = pid, path = ?path, "PID file created");
    Ok(())
}

/// Remove PID file
fn remove_pid_file(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(error = %e, path = ?path, "Failed to remove PID file");
        } else {
            info!(path = ?path, "PID file removed");
        }
    }
}

/// Check if another daemon is running by checking PID file
fn check_existing_daemon(pid_path: &Path) -> Result<()> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if !pid_path.exists() {
        return Ok(());
    }

    let pid_str = fs::read_to_string(pid_path)
        .with_context(|| format!("Failed to read PID file: {pid_path:?}"))?;

    let pid: i32 = pid_str
        .trim()
        .parse()
        .with_context(|| "Invalid PID in file")?;

    // Signal 0 only checks existence
    if kill(Pid::from_raw(pid), None).is_ok() {
        anyhow::bail!(
            "Another deck-daemon is already running (PID: {pid}). \
             Stop it first or remove {pid_path:?} if it's stale."
        );
    }

    warn!(pid = pid, "Removing stale PID file");
    fs::remove_file(pid_path)?;
    Ok(())
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("deck_daemon={level},deck_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Resolves when SIGTERM or SIGINT arrives
async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
        _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Deck Daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate()?;
    let addr = config.listen_addr()?;

    info!(
        listen = %addr,
        deck_dir = ?config.deck_dir,
        viewer = %config.controller.viewer.program,
        source = %config.source(),
        "Configuration loaded"
    );

    let pid_path = args.pid_file.clone().unwrap_or_else(default_pid_path);
    check_existing_daemon(&pid_path)?;
    write_pid_file(&pid_path)?;

    let launcher = Arc::new(SystemLauncher::new().with_working_dir(&config.deck_dir));
    let controller = Arc::new(DeckController::new(launcher, config.controller.clone()));
    let state = AppState::new(controller, DeckLibrary::new(&config.deck_dir));
    let app = server::router(state.clone());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            remove_pid_file(&pid_path);
            return Err(e).with_context(|| format!("Failed to bind to {addr}"));
        }
    };
    info!(listen = %addr, "Listening for requests");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Shutting down...");
    if let Some(stopped) = state.controller().shutdown().await {
        info!(pid = %stopped.pid, "Stopped running deck");
    }
    remove_pid_file(&pid_path);

    match result {
        Ok(()) => {
            info!("Deck daemon stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Daemon stopped with error");
            Err(e.into())
        }
    }
}
