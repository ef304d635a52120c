//! Standalone Meeple game server.
//!
//! Serves a new game, or a saved one with `--load`, until Ctrl+C.  Clients
//! that host their own game run the same server embedded instead.
//!
//! ```text
//! meeple-server --port 37447 --slots 5
//! meeple-server --load saves/friday.msav
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use meeple_core::{Game, Snapshot};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use meeple_server::{start_server, GameHub, ServerConfig, DEFAULT_PORT};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Meeple game server.
#[derive(Debug, Parser)]
#[command(name = "meeple-server", about = "Hosts a Meeple game over TCP", version)]
struct Cli {
    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT, env = "MEEPLE_PORT")]
    port: u16,

    /// IP address to bind to.
    #[arg(long, default_value = "0.0.0.0", env = "MEEPLE_BIND")]
    bind: String,

    /// Number of seats in a new game.
    #[arg(long, default_value_t = meeple_core::domain::game::DEFAULT_SLOT_COUNT)]
    slots: usize,

    /// Turns after which a new game ends; `0` for no limit.
    #[arg(long, default_value_t = meeple_core::domain::game::DEFAULT_TURN_LIMIT)]
    turn_limit: u32,

    /// Seconds a connection may take to say hello.
    #[arg(long, default_value_t = 5)]
    handshake_timeout: u64,

    /// Serve a saved game instead of a new one.
    #[arg(long)]
    load: Option<PathBuf>,
}

impl Cli {
    fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let bind_address: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;
        Ok(ServerConfig {
            bind_address,
            port: self.port,
            handshake_timeout: Duration::from_secs(self.handshake_timeout),
        })
    }

    fn hub(&self) -> anyhow::Result<GameHub> {
        match &self.load {
            Some(path) => {
                let snapshot = Snapshot::load(path)
                    .with_context(|| format!("cannot load {}", path.display()))?;
                Ok(GameHub::from_snapshot(snapshot))
            }
            None => Ok(GameHub::new(Game::new(self.slots, self.turn_limit))),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.server_config()?;
    let hub = cli.hub()?;

    let server = start_server(&config, hub).await?;
    info!("Meeple server ready on {}.  Press Ctrl-C to exit.", server.local_addr());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl+C signal: {e}");
    }
    info!("shutdown signal received");

    server.stop().await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
