//! meeple-server library entry point.
//!
//! The server hosts one authoritative game.  It is used two ways: as the
//! standalone `meeple-server` binary, and embedded in a client that hosts a
//! game for others.  Both go through [`infrastructure::listener::start_server`].

pub mod application;
pub mod infrastructure;

pub use application::hub::GameHub;
pub use infrastructure::listener::{start_server, ServerConfig, ServerError, ServerHandle, DEFAULT_PORT};
