//! Implementations of the [`Presentation`] trait.
//!
//! - **`console`** – headless presentation for the `meeple-client` binary.
//!   Everything shown is written through `tracing` and, for user-facing
//!   lines, to stdout.
//! - **`recording`** – keeps every call in order so tests can assert on
//!   what the user would have seen.
//!
//! [`Presentation`]: crate::application::presentation::Presentation

pub mod console;
pub mod recording;

pub use console::ConsolePresentation;
pub use recording::{PresentationCall, RecordingPresentation};
