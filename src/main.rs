//! Jazz for the Dead - game entry point
//!
//! `host` listens for a teammate and runs the authoritative simulation.
//! `join` connects to a host. Both run until the leaderboard, a quit, or an
//! unrecoverable network error.

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jazz_game::config::Config;
use jazz_game::frontend::HeadlessFrontend;
use jazz_game::session::host::run_host;
use jazz_game::session::peer::run_peer;
use jazz_game::session::SessionEnd;
use jazz_game::store::JsonFileStore;

#[derive(Debug, Parser)]
#[command(name = "jazz_game", version, about = "Two-player LAN arcade game")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Host a session and wait for a teammate
    Host,
    /// Join a host on the local network
    Join {
        /// IPv4 address of the host (falls back to HOST_ADDR)
        addr: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    let outcome = match cli.command {
        Command::Host => {
            info!(port = config.port, db = %config.db_path.display(), "Starting as host");
            // No leaderboard without a store
            let store = JsonFileStore::open(&config.db_path)?;
            let frontend = HeadlessFrontend::new(config.team_name.clone(), None);
            tokio::select! {
                result = run_host(&config, frontend, store) => result?,
                _ = shutdown_signal() => SessionEnd::Quit,
            }
        }
        Command::Join { addr } => {
            info!(port = config.port, "Starting as peer");
            let frontend = HeadlessFrontend::new(None, addr.or_else(|| config.host_addr.clone()));
            tokio::select! {
                result = run_peer(&config, frontend) => result?,
                _ = shutdown_signal() => SessionEnd::Quit,
            }
        }
    };

    match outcome {
        SessionEnd::Finished { victory, score } => info!(victory, score, "Game over"),
        SessionEnd::Quit => info!("Quit before the end of the game"),
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, leaving the session");
        }
        _ = terminate => {
            info!("Received terminate signal, leaving the session");
        }
    }
}
