use std::fmt;
use std::net::Ipv4Addr;

use sshsweep_common::config::NO_BANNER;
use sshsweep_common::error::ScanError;

/// An open port together with whatever the service announced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanResult {
    pub addr: Ipv4Addr,
    pub port: u16,
    /// First line sent by the service. `None` when no complete line arrived.
    pub banner: Option<String>,
}

impl ScanResult {
    pub fn new(addr: Ipv4Addr, port: u16, banner: Option<String>) -> Self {
        Self { addr, port, banner }
    }

    pub fn banner_text(&self) -> &str {
        self.banner.as_deref().unwrap_or(NO_BANNER)
    }
}

/// Renders the report line `<address>:<port>,<banner>`.
impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{}", self.addr, self.port, self.banner_text())
    }
}

/// Outcome of one target. `Ok(None)` covers closed, filtered and silent ports.
#[derive(Debug)]
pub struct ScanEvent {
    pub target: Ipv4Addr,
    pub outcome: Result<Option<ScanResult>, ScanError>,
}

impl ScanEvent {
    pub fn is_open(&self) -> bool {
        matches!(self.outcome, Ok(Some(_)))
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
