//! meeple-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does meeple-client do? (for beginners)
//!
//! The client is what a player runs.  It either *hosts* a game, by starting
//! an embedded server in its own process and connecting to it, or *joins* a
//! game hosted elsewhere.  Either way it ends up holding a connection to a
//! server and a local view of the game.
//!
//! Two kinds of work happen concurrently:
//!
//! 1. Network tasks read frames from the server at any time.
//! 2. A single UI task owns the session state and the presentation.
//!
//! The only bridge between them is a FIFO queue of [`UiTask`]s: network tasks
//! queue server events through an [`EventMarshaller`] and never touch
//! session state themselves.  The UI task applies them one at a time, in
//! arrival order.
//!
//! [`UiTask`]: infrastructure::ui_bridge::UiTask
//! [`EventMarshaller`]: infrastructure::ui_bridge::EventMarshaller

/// Application layer: the session controller and the ports it drives.
pub mod application;

/// Infrastructure layer: network stub, embedded server, UI queue, storage,
/// and presentation adapters.
pub mod infrastructure;
