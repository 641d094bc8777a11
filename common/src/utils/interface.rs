use std::net::{IpAddr, Ipv4Addr};

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    /// The IPv4 network of this interface that contains `addr`, if any.
    fn find_ipv4_net_for(&self, addr: Ipv4Addr) -> Option<Ipv4Network>;
    fn owns_addr(&self, addr: IpAddr) -> bool;
    /// Up, not loopback, has a MAC and at least one IPv4 address.
    fn is_scannable(&self) -> bool;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V4(ipv4) = ip {
                    Some(*ipv4)
                } else {
                    None
                }
            })
            .collect()
    }

    fn find_ipv4_net_for(&self, addr: Ipv4Addr) -> Option<Ipv4Network> {
        self.get_ipv4_nets()
            .into_iter()
            .find(|net| net.prefix() > 0 && net.contains(addr))
    }

    fn owns_addr(&self, addr: IpAddr) -> bool {
        self.ips.iter().any(|net| net.ip() == addr)
    }

    fn is_scannable(&self) -> bool {
        self.is_up()
            && !self.is_loopback()
            && self.mac.is_some()
            && !self.get_ipv4_nets().is_empty()
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
