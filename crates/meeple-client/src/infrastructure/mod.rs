//! Infrastructure layer for the client application.
//!
//! Contains the adapters behind the application layer's traits: TCP I/O,
//! the in-process server, the UI task queue, configuration storage and the
//! concrete presentations.
//!
//! **Dependency rule**: this layer may depend on `application`,
//! `meeple_core` and `meeple_server`, but MUST NOT be imported by the
//! `application` layer.
//!
//! # Sub-modules
//!
//! - **`network`** – `ServerStub`: connects to a game server, performs the
//!   handshake, then forwards pushed events to the UI queue from a reader
//!   task while a writer task sends queued requests.
//!
//! - **`embedded_server`** – `EmbeddedServer`: the server a hosting client
//!   runs in its own process.
//!
//! - **`transport`** – `NetworkTransport`, the `SessionTransport` built from
//!   the two modules above.
//!
//! - **`ui_bridge`** – The UI task queue and the loop that applies queued
//!   events and commands to the session controller.
//!
//! - **`storage`** – TOML configuration file persistence.
//!
//! - **`presentation`** – Console and recording implementations of
//!   `Presentation`.

pub mod embedded_server;
pub mod network;
pub mod presentation;
pub mod storage;
pub mod transport;
pub mod ui_bridge;
