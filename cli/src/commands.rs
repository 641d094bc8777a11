pub mod scan;

use std::time::Duration;

use clap::{ArgAction, Parser};
use sshsweep_common::config::{DEFAULT_DST_PORT, REPLY_TIMEOUT, ScanConfig};

#[derive(Parser, Debug)]
#[command(name = "sshsweep")]
#[command(about = "Half-open SSH sweeper: SYN probes over raw ethernet, banners for open ports.")]
pub struct CommandLine {
    /// IPv4 addresses or CIDR ranges, e.g. 10.0.0.7 or 192.168.1.0/24
    #[arg(required = true, value_name = "TARGET")]
    pub targets: Vec<String>,

    /// TCP port to probe
    #[arg(short, long, default_value_t = DEFAULT_DST_PORT)]
    pub port: u16,

    /// Deadline for the ARP reply and for the SYN+ACK, each
    #[arg(long, value_name = "MS", default_value_t = REPLY_TIMEOUT.as_millis() as u64)]
    pub timeout_ms: u64,

    /// Scan at most this many targets at once (default: all of them)
    #[arg(long, value_name = "N")]
    pub max_in_flight: Option<usize>,

    /// More diagnostics on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Fewer diagnostics on stderr (-q warnings, -qq errors only)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .with_port(self.port)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_max_in_flight(self.max_in_flight)
    }

    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (q, _) if q >= 2 => "error",
            (1, _) => "warn",
            (_, 0) => "info",
            (_, 1) => "debug",
            _ => "trace",
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
