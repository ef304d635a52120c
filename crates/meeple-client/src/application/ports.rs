//! Ports: what the session controller needs from the network side.
//!
//! The controller never names a socket type.  It asks a [`SessionTransport`]
//! to host a game or to connect somewhere, and gets back trait objects it
//! can drop or stop.  Infrastructure implements these over TCP; unit tests
//! implement them in memory.

use async_trait::async_trait;
use meeple_core::{ClientId, ClientRequest, Game, Player, Snapshot, SnapshotError};
use thiserror::Error;

/// Errors the controller reports to the user.  None of them escape its
/// public operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot start the game server: {0}")]
    Host(String),
    #[error("cannot connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },
    #[error("connection to the server was lost: {0}")]
    ConnectionLost(String),
    #[error("{0}")]
    Snapshot(#[from] SnapshotError),
    #[error("no game is running")]
    NoGame,
}

/// What an embedded server starts with.
#[derive(Debug, Clone)]
pub enum HostSeed {
    Blank { slots: usize, turn_limit: u32 },
    Saved(Snapshot),
}

/// The connection to a server, as seen from the UI context.
pub trait ServerConnection: Send {
    /// Identity the server assigned to this connection.
    fn client_id(&self) -> ClientId;

    /// Whether `player`'s seat is controlled through this connection.
    fn is_local_player(&self, player: &Player) -> bool;

    /// Queues a request.  Never waits for the server.
    fn send(&self, request: ClientRequest);
}

/// An in-process server owned by a hosting session.
#[async_trait]
pub trait GameHost: Send {
    /// The port actually bound.
    fn local_port(&self) -> u16;

    /// Stops the server.  Failures are logged, not returned.
    async fn stop(&mut self);
}

/// A freshly established connection and the game it was welcomed into.
pub struct Connection {
    pub server: Box<dyn ServerConnection>,
    pub game: Game,
}

/// Opens hosted games and connections.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Starts an embedded server on `port` (`0` for any free port).
    async fn host(&self, seed: HostSeed, port: u16) -> Result<Box<dyn GameHost>, SessionError>;

    /// Connects and completes the handshake.  Events pushed on this
    /// connection are tagged with `epoch` when they reach the UI context.
    async fn connect(
        &self,
        host: &str,
        port: u16,
        nickname: &str,
        epoch: u64,
    ) -> Result<Connection, SessionError>;
}
