//! Scan engine for `sshsweep`.
//!
//! Every target runs the same pipeline on its own capture channel:
//! route lookup, ARP resolution of the next hop, one SYN probe and, when
//! the port answers, a banner read over an ordinary TCP connection.
//! [`scanner::Scanner`] drives that pipeline for many targets at once.

pub mod network;
pub mod report;
pub mod scanner;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
