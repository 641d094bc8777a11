//! # Route Lookup
//!
//! Maps a destination address to the interface, source address and
//! (optional) gateway used to reach it. The scan engine only sees the
//! [`RouteLookup`] trait; [`SystemRouter`] is the implementation backed by
//! the host's interfaces and routing table.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::Ipv4Network;
use pnet::util::MacAddr;
use tracing::debug;

use crate::error::ScanError;
use crate::utils::interface::NetworkInterfaceExtension;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Interface the probe leaves through.
    pub interface: NetworkInterface,
    /// Hardware address of `interface`.
    pub mac: MacAddr,
    /// Next hop. `None` means the destination is on the local link.
    pub gateway: Option<Ipv4Addr>,
    /// Address stamped as sender on every frame.
    pub source: Ipv4Addr,
}

impl RouteInfo {
    /// The address whose hardware address has to be resolved before probing.
    pub fn next_hop(&self, destination: Ipv4Addr) -> Ipv4Addr {
        self.gateway.unwrap_or(destination)
    }
}

pub trait RouteLookup: Send + Sync {
    fn route(&self, destination: Ipv4Addr) -> Result<RouteInfo, ScanError>;
}

/// One row of the kernel's IPv4 routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelRoute {
    pub iface: String,
    pub destination: Ipv4Network,
    /// `None` for directly connected routes.
    pub gateway: Option<Ipv4Addr>,
    pub metric: u32,
}

/// Routes using the live interface list and, on Linux, `/proc/net/route`.
#[derive(Debug, Clone)]
pub struct SystemRouter {
    interfaces: Vec<NetworkInterface>,
    table: Vec<KernelRoute>,
}

impl SystemRouter {
    pub fn new() -> Self {
        let interfaces: Vec<NetworkInterface> = datalink::interfaces()
            .into_iter()
            .filter(|intf| intf.is_scannable())
            .collect();
        let table = read_routing_table();
        debug!(
            "router knows {} interface(s) and {} kernel route(s)",
            interfaces.len(),
            table.len()
        );
        Self::from_parts(interfaces, table)
    }

    pub fn from_parts(interfaces: Vec<NetworkInterface>, table: Vec<KernelRoute>) -> Self {
        Self { interfaces, table }
    }

    fn on_link(&self, destination: Ipv4Addr) -> Option<(&NetworkInterface, Ipv4Addr)> {
        self.interfaces.iter().find_map(|intf| {
            intf.find_ipv4_net_for(destination)
                .map(|net| (intf, net.ip()))
        })
    }

    /// Longest-prefix match over the kernel table, lowest metric on a tie.
    ///
    /// Only rows leaving through a known interface are considered.
    fn best_route(&self, destination: Ipv4Addr) -> Option<(&KernelRoute, &NetworkInterface)> {
        self.table
            .iter()
            .filter(|row| row.destination.contains(destination))
            .filter_map(|row| {
                self.interfaces
                    .iter()
                    .find(|intf| intf.name == row.iface)
                    .map(|intf| (row, intf))
            })
            .min_by_key(|(row, _)| (std::cmp::Reverse(row.destination.prefix()), row.metric))
    }

    fn routed(&self, destination: Ipv4Addr) -> Result<(&NetworkInterface, Ipv4Addr, Ipv4Addr), ScanError> {
        let (row, intf) = self
            .best_route(destination)
            .ok_or_else(|| ScanError::route(destination, "no kernel route"))?;

        let gateway = row.gateway.ok_or_else(|| {
            ScanError::route(destination, format!("route {} has no gateway", row.destination))
        })?;

        let source = resolve_route_source_ip(destination)
            .filter(|ip| intf.owns_addr(IpAddr::V4(*ip)))
            .or_else(|| intf.get_ipv4_nets().first().map(|net| net.ip()))
            .ok_or_else(|| ScanError::route(destination, format!("{} has no IPv4 address", intf.name)))?;

        Ok((intf, source, gateway))
    }
}

impl Default for SystemRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteLookup for SystemRouter {
    fn route(&self, destination: Ipv4Addr) -> Result<RouteInfo, ScanError> {
        let (interface, source, gateway) = match self.on_link(destination) {
            Some((intf, source)) => (intf, source, None),
            None => {
                let (intf, source, gateway) = self.routed(destination)?;
                (intf, source, Some(gateway))
            }
        };

        let mac = interface
            .mac
            .ok_or_else(|| ScanError::route(destination, format!("{} has no MAC", interface.name)))?;

        Ok(RouteInfo {
            interface: interface.clone(),
            mac,
            gateway,
            source,
        })
    }
}

/// Asks the kernel which source address it would use, without sending anything.
fn resolve_route_source_ip(target: Ipv4Addr) -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect((target, 53)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

#[cfg(target_os = "linux")]
fn read_routing_table() -> Vec<KernelRoute> {
    match std::fs::read_to_string("/proc/net/route") {
        Ok(contents) => parse_proc_route(&contents),
        Err(e) => {
            debug!("cannot read /proc/net/route: {e}");
            Vec::new()
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn read_routing_table() -> Vec<KernelRoute> {
    Vec::new()
}

/// Parses the kernel's routing table dump. Rows that are down or malformed
/// are skipped.
///
/// Addresses are hex encoded in host byte order (`0101A8C0` is 192.168.1.1).
pub fn parse_proc_route(contents: &str) -> Vec<KernelRoute> {
    const RTF_UP: u16 = 0x1;
    const RTF_GATEWAY: u16 = 0x2;

    let hex_addr = |field: &str| u32::from_str_radix(field, 16).ok().map(|raw| Ipv4Addr::from(raw.to_le_bytes()));

    contents
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [iface, destination, gateway, flags, _refcnt, _use, metric, mask, ..] = fields.as_slice() else {
                return None;
            };
            let flags = u16::from_str_radix(flags, 16).ok()?;
            if flags & RTF_UP == 0 {
                return None;
            }
            let destination = Ipv4Network::with_netmask(hex_addr(*destination)?, hex_addr(*mask)?).ok()?;
            let gateway = if flags & RTF_GATEWAY != 0 {
                Some(hex_addr(*gateway)?)
            } else {
                None
            };
            Some(KernelRoute {
                iface: iface.to_string(),
                destination,
                gateway,
                metric: metric.parse().ok()?,
            })
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
