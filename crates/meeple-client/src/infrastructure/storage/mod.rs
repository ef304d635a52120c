//! Storage infrastructure: configuration file persistence.
//!
//! Snapshots are read and written by `meeple_core::snapshot`; this module
//! only deals with the client's own settings file.  The `config` sub-module
//! handles:
//!
//! - Reading the TOML configuration file from an explicit path or the
//!   platform config directory.
//! - Validating the colour palette and locale before a session starts.
//! - Writing the file back, creating its directory on first use.

pub mod config;
