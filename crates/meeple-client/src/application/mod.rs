//! Application layer of the client.
//!
//! Nothing here opens a socket, reads a file handle directly, or draws
//! anything.  The controller talks to the outside world through the traits
//! in [`ports`] and [`presentation`], which the infrastructure layer
//! implements.
//!
//! # Sub-modules
//!
//! - **`session`** – The session controller: lifecycle operations
//!   (create, load, connect, save, close, quit) and the application of pushed
//!   events to the local game view.
//!
//! - **`ports`** – Traits for hosting a game and talking to a server.
//!
//! - **`presentation`** – The narrow interface the controller uses to show
//!   things to the user.

pub mod ports;
pub mod presentation;
pub mod session;
