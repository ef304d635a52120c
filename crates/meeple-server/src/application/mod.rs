//! Application layer of the server.
//!
//! - **`hub`** – Applies client requests to the authoritative game and
//!   decides which messages go to which connection.  No sockets here; the
//!   listener does the delivery.

pub mod hub;
