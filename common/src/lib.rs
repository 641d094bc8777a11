//! Shared building blocks for `sshsweep`.
//!
//! * [`config`]: scan constants and their overridable defaults.
//! * [`error`]: the target-scoped error taxonomy.
//! * [`network`]: target parsing, CIDR expansion and route lookup.

pub mod config;
pub mod error;
pub mod network;
pub mod utils;
