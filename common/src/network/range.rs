use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;

/// Inclusive span of IPv4 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn len(&self) -> u64 {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if end < start {
            return 0;
        }
        u64::from(end - start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every address of `ip/prefix`, network and broadcast addresses included.
pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> Result<Ipv4Range, String> {
    let network = Ipv4Network::new(ip, prefix).map_err(|e| e.to_string())?;
    Ok(Ipv4Range::new(network.network(), network.broadcast()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
