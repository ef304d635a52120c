//! # meeple-core
//!
//! Shared library for Meeple containing the game model, the wire protocol
//! spoken between clients and the game server, stream framing, and the
//! snapshot format used for save/load.
//!
//! This crate is used by both the server and the client applications.  It
//! has no dependencies on UI frameworks or sockets; the framing helpers work
//! over any tokio `AsyncRead`/`AsyncWrite`.
//!
//! # Architecture overview
//!
//! Meeple is a networked multiplayer board-game client.  One process may host
//! the authoritative game in an embedded server; other processes join it over
//! TCP.  Every participant keeps a *view* of the game that is only ever
//! changed by events pushed from the server.
//!
//! - **`domain`** – The game model (`Game`, `PlayerSlot`, `Player`) and the
//!   player colour palette.
//!
//! - **`protocol`** – The request/notification enums exchanged on the wire
//!   and the length-prefixed framing that carries them.
//!
//! - **`snapshot`** – Point-in-time capture of a `Game` for persistence, in a
//!   gzip-compressed or plain JSON encoding.

pub mod domain;
pub mod protocol;
pub mod snapshot;

pub use domain::color::{parse_color, ColorError, PlayerPalette, Rgb};
pub use domain::game::{
    ClientId, Game, GameError, Phase, Player, PlayerSlot, Ranking, SlotType, TurnOutcome,
};
pub use protocol::framing::{read_frame, write_frame, FrameError};
pub use protocol::messages::{
    ClientRequest, GameEvent, ServerMessage, SessionEvent, UiEvent, DEFAULT_PORT,
};
pub use snapshot::{Snapshot, SnapshotEncoding, SnapshotError};
