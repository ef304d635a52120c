//! Protocol module containing message types and stream framing.

pub mod framing;
pub mod messages;

pub use framing::{read_frame, write_frame, FrameError};
pub use messages::*;
