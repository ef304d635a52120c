//! Infrastructure layer of the server: the TCP listener and its tasks.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `meeple_core`, but MUST NOT be imported by the `application` layer.

pub mod listener;
