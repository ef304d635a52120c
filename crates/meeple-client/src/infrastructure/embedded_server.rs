//! The game server a hosting client runs in its own process.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use meeple_core::Game;
use meeple_server::{start_server, GameHub, ServerConfig, ServerError, ServerHandle};
use tracing::{info, warn};

use crate::application::ports::{GameHost, HostSeed};

/// Owns a running [`ServerHandle`] until stopped.
#[derive(Debug)]
pub struct EmbeddedServer {
    port: u16,
    handle: Option<ServerHandle>,
}

impl EmbeddedServer {
    /// Binds `bind:port` and starts serving the game described by `seed`.
    ///
    /// # Errors
    ///
    /// [`ServerError::BindFailed`] when the port is taken.
    pub async fn start(
        seed: HostSeed,
        bind: IpAddr,
        port: u16,
        handshake_timeout: Duration,
    ) -> Result<Self, ServerError> {
        let hub = match seed {
            HostSeed::Blank { slots, turn_limit } => GameHub::new(Game::new(slots, turn_limit)),
            HostSeed::Saved(snapshot) => GameHub::from_snapshot(snapshot),
        };
        let config = ServerConfig {
            bind_address: bind,
            port,
            handshake_timeout,
        };
        let handle = start_server(&config, hub).await?;
        let port = handle.local_addr().port();
        info!("embedded server listening on port {port}");
        Ok(Self {
            port,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

#[async_trait]
impl GameHost for EmbeddedServer {
    fn local_port(&self) -> u16 {
        self.port
    }

    async fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match handle.stop().await {
            Ok(()) => info!("embedded server on port {} stopped", self.port),
            Err(e) => warn!("embedded server on port {} did not stop cleanly: {e}", self.port),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
