use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use thiserror::Error;

/// Failures of a capture channel. Timeouts are not errors and never appear here.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("opening capture channel on {interface}: {source}")]
    Open {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} is not an ethernet interface")]
    NotEthernet(String),

    #[error("writing frame: {0}")]
    Send(#[source] io::Error),

    #[error("reading frame: {0}")]
    Read(#[source] io::Error),

    #[error("capture channel closed")]
    Closed,
}

/// Everything that can end the scan of a single target.
///
/// Errors never cross targets: each one is reported for its own address and
/// the remaining scans carry on.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid IP entered: {0:?}")]
    InvalidTarget(String),

    #[error("non-IPv4 target: {0:?}")]
    NonIpv4Target(String),

    #[error("no route to {target}: {reason}")]
    RouteLookup { target: Ipv4Addr, reason: String },

    #[error("no ARP reply from {target} within {timeout:?}")]
    ResolutionTimeout { target: Ipv4Addr, timeout: Duration },

    #[error("failed to build {0} frame")]
    FrameBuild(&'static str),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("connecting to {target}:{port}: {source}")]
    Connect {
        target: Ipv4Addr,
        port: u16,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub fn route(target: Ipv4Addr, reason: impl Into<String>) -> Self {
        Self::RouteLookup {
            target,
            reason: reason.into(),
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
