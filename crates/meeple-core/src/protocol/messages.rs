//! All Meeple protocol message types.
//!
//! Two directions share one connection:
//!
//! - [`ClientRequest`] – operations the client invokes on the server.  They
//!   are fire-and-forget; the server answers, if at all, with later pushed
//!   events.
//! - [`ServerMessage`] – handshake replies and pushed [`SessionEvent`]s.
//!
//! [`SessionEvent`] is the complete set of notifications a client observes.
//! It is split into game-state notifications ([`GameEvent`]) and UI prompts
//! ([`UiEvent`]); new kinds are added as new variants.

use serde::{Deserialize, Serialize};

use crate::domain::game::{ClientId, Game, PlayerSlot, Ranking};

/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// TCP port a game is served on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 37447;

// ── Client → server ───────────────────────────────────────────────────────────

/// Requests sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientRequest {
    /// First frame on every connection.
    Hello {
        protocol_version: u8,
        nickname: String,
    },
    TakeSlot {
        number: u8,
        nickname: String,
    },
    SetSlotAi {
        number: u8,
    },
    LeaveSlot {
        number: u8,
    },
    StartGame,
    /// Ends the active player's turn, crediting the points scored in it.
    EndTurn {
        points: u32,
    },
    DiscardTile {
        tile: String,
    },
    Chat {
        text: String,
    },
    Ping(u64),
    /// Polite close; the server drops the connection afterwards.
    Goodbye,
}

// ── Server → client ───────────────────────────────────────────────────────────

/// Why the server closed a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    ServerShutdown,
    ProtocolError,
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted.  Carries the identity assigned to this connection
    /// and the current game.
    Welcome { client_id: ClientId, game: Game },
    /// Handshake refused; the connection is closed after this frame.
    Rejected { reason: String },
    Event(SessionEvent),
    Pong(u64),
    Disconnect { reason: DisconnectReason },
}

// ── Pushed notifications ──────────────────────────────────────────────────────

/// Game-state notifications.  Applying them in order to a replica of the
/// game reproduces the server's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    SlotChanged(PlayerSlot),
    /// Setup finished; carries the game with its player list.
    GameStarted(Game),
    PlayerActivated { player: u8, turn: u32 },
    ScoreChanged { player: u8, points: u32 },
    TileDiscarded { tile: String },
    GameOver { ranking: Vec<Ranking> },
}

/// Notifications meant for the user rather than the game model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
    /// The given player may act; `actions` names what they may do.
    ActionsOffered { player: u8, actions: Vec<String> },
    Warning { text: String },
    Chat { nickname: String, text: String },
}

/// Every notification a client observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    Game(GameEvent),
    Ui(UiEvent),
}

impl From<GameEvent> for SessionEvent {
    fn from(event: GameEvent) -> Self {
        SessionEvent::Game(event)
    }
}

impl From<UiEvent> for SessionEvent {
    fn from(event: UiEvent) -> Self {
        SessionEvent::Ui(event)
    }
}

impl From<SessionEvent> for ServerMessage {
    fn from(event: SessionEvent) -> Self {
        ServerMessage::Event(event)
    }
}

impl SessionEvent {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Game(GameEvent::SlotChanged(_)) => "slot-changed",
            SessionEvent::Game(GameEvent::GameStarted(_)) => "game-started",
            SessionEvent::Game(GameEvent::PlayerActivated { .. }) => "player-activated",
            SessionEvent::Game(GameEvent::ScoreChanged { .. }) => "score-changed",
            SessionEvent::Game(GameEvent::TileDiscarded { .. }) => "tile-discarded",
            SessionEvent::Game(GameEvent::GameOver { .. }) => "game-over",
            SessionEvent::Ui(UiEvent::ActionsOffered { .. }) => "actions-offered",
            SessionEvent::Ui(UiEvent::Warning { .. }) => "warning",
            SessionEvent::Ui(UiEvent::Chat { .. }) => "chat",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
