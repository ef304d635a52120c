//! Domain entities for Meeple.
//!
//! This module contains pure data and state transitions with no
//! infrastructure dependencies.  The server owns the authoritative [`game::Game`];
//! clients hold a replica that only changes when a pushed event is applied.

/// Game handle, seats and players.
pub mod game;

/// Player display colours.
pub mod color;
