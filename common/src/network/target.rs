//! # Scan Target Model
//!
//! Command line arguments are either a single IPv4 address
//! (`192.168.1.5`) or an IPv4 CIDR block (`192.168.1.0/24`). CIDR blocks
//! expand into every address they contain, network and broadcast included.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use tracing::debug;

use crate::error::ScanError;
use crate::network::range::{self, Ipv4Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Host { target_addr: Ipv4Addr },
    Range { ipv4_range: Ipv4Range },
}

impl FromStr for Target {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('/') {
            return parse_cidr_range(s);
        }
        parse_host(s)
    }
}

impl Target {
    pub fn addrs(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let ipv4_range = match *self {
            Target::Host { target_addr } => Ipv4Range::new(target_addr, target_addr),
            Target::Range { ipv4_range } => ipv4_range,
        };
        ipv4_range.to_iter()
    }
}

/// Result of expanding the raw arguments.
#[derive(Debug, Default)]
pub struct TargetList {
    /// Addresses to scan, in argument order, without duplicates.
    pub addrs: Vec<Ipv4Addr>,
    /// Arguments that could not be turned into targets.
    pub rejected: Vec<ScanError>,
}

/// Parses and expands every argument. Bad arguments are collected, not fatal.
pub fn expand<I, S>(args: I) -> TargetList
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut list = TargetList::default();
    let mut seen: HashSet<Ipv4Addr> = HashSet::new();

    for arg in args {
        match Target::from_str(arg.as_ref()) {
            Ok(target) => {
                for addr in target.addrs() {
                    if seen.insert(addr) {
                        list.addrs.push(addr);
                    }
                }
            }
            Err(e) => list.rejected.push(e),
        }
    }

    debug!("{} target address(es) after expansion", list.addrs.len());
    list
}

fn parse_host(s: &str) -> Result<Target, ScanError> {
    match s.parse::<IpAddr>() {
        Ok(IpAddr::V4(target_addr)) => Ok(Target::Host { target_addr }),
        Ok(IpAddr::V6(_)) => Err(ScanError::NonIpv4Target(s.to_string())),
        Err(_) => Err(ScanError::InvalidTarget(s.to_string())),
    }
}

fn parse_cidr_range(s: &str) -> Result<Target, ScanError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Err(ScanError::InvalidTarget(s.to_string()));
    };

    let ip = match ip_str.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => ip,
        Ok(IpAddr::V6(_)) => return Err(ScanError::NonIpv4Target(s.to_string())),
        Err(_) => return Err(ScanError::InvalidTarget(s.to_string())),
    };

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|_| ScanError::InvalidTarget(s.to_string()))?;

    let ipv4_range =
        range::cidr_range(ip, prefix).map_err(|_| ScanError::InvalidTarget(s.to_string()))?;

    Ok(Target::Range { ipv4_range })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
