//! Borrowed view over a captured ethernet frame.
//!
//! Nothing is parsed up front. Each accessor decodes only the layers it
//! needs, straight out of the capture buffer, and answers `None` for frames
//! that are truncated, malformed or simply of another protocol. Unrelated
//! traffic is the norm on a promiscuous capture, so a miss is never an error.

use std::net::Ipv4Addr;

use pnet::packet::arp::{ArpOperation, ArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::{TcpFlags, TcpPacket};
use pnet::util::MacAddr;

use crate::{ARP_LEN, ETH_HDR_LEN, IPV4_HDR_LEN, TCP_HDR_LEN};

/// Direction-sensitive pair of network endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flow {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

impl Flow {
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        Self { src, dst }
    }

    pub fn reverse(&self) -> Self {
        Self::new(self.dst, self.src)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpView {
    pub operation: ArpOperation,
    pub sender_hw: MacAddr,
    pub sender_proto: Ipv4Addr,
    pub target_proto: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpView {
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: u8,
}

impl TcpView {
    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag == flag
    }

    pub fn is_syn_ack(&self) -> bool {
        self.has(TcpFlags::SYN | TcpFlags::ACK)
    }
}

#[derive(Debug)]
pub struct CapturedFrame<'a> {
    bytes: &'a [u8],
    eth: EthernetPacket<'a>,
}

impl<'a> CapturedFrame<'a> {
    /// `None` when the buffer cannot even hold an ethernet header.
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        let eth = EthernetPacket::new(bytes)?;
        Some(Self { bytes, eth })
    }

    pub fn ethernet(&self) -> &EthernetPacket<'a> {
        &self.eth
    }

    pub fn source_mac(&self) -> MacAddr {
        self.ethernet().get_source()
    }

    fn l3(&self) -> &'a [u8] {
        &self.bytes[ETH_HDR_LEN..]
    }

    pub fn arp(&self) -> Option<ArpView> {
        if self.ethernet().get_ethertype() != EtherTypes::Arp || self.l3().len() < ARP_LEN {
            return None;
        }
        let arp = ArpPacket::new(self.l3())?;
        if arp.get_protocol_type() != EtherTypes::Ipv4
            || arp.get_hw_addr_len() != 6
            || arp.get_proto_addr_len() != 4
        {
            return None;
        }
        Some(ArpView {
            operation: arp.get_operation(),
            sender_hw: arp.get_sender_hw_addr(),
            sender_proto: arp.get_sender_proto_addr(),
            target_proto: arp.get_target_proto_addr(),
        })
    }

    pub fn ipv4(&self) -> Option<Ipv4Packet<'a>> {
        if self.ethernet().get_ethertype() != EtherTypes::Ipv4 {
            return None;
        }
        let ip = Ipv4Packet::new(self.l3())?;
        let header_len = usize::from(ip.get_header_length()) * 4;
        if ip.get_version() != 4 || header_len < IPV4_HDR_LEN || header_len > self.l3().len() {
            return None;
        }
        Some(ip)
    }

    pub fn network_flow(&self) -> Option<Flow> {
        let ip = self.ipv4()?;
        Some(Flow::new(ip.get_source(), ip.get_destination()))
    }

    pub fn tcp(&self) -> Option<TcpView> {
        let ip = self.ipv4()?;
        if ip.get_next_level_protocol() != IpNextHeaderProtocols::Tcp || ip.get_fragment_offset() != 0 {
            return None;
        }
        let header_len = usize::from(ip.get_header_length()) * 4;
        let segment = &self.l3()[header_len..];
        if segment.len() < TCP_HDR_LEN {
            return None;
        }
        let tcp = TcpPacket::new(segment)?;
        Some(TcpView {
            src_port: tcp.get_source(),
            dst_port: tcp.get_destination(),
            flags: tcp.get_flags(),
        })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arp, tcp::TcpSegment};
    use pnet::packet::arp::ArpOperations;

    const LOCAL: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
    const REMOTE: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 20);

    fn mac(last: u8) -> MacAddr {
        MacAddr::new(0x02, 0, 0, 0, 0, last)
    }

    #[test]
    fn too_short_buffer_has_no_frame() {
        assert!(CapturedFrame::new(&[0u8; 13]).is_none());
        assert!(CapturedFrame::new(&[0u8; 14]).is_some());
    }

    #[test]
    fn arp_layer_is_decoded_from_reply() {
        let bytes = arp::create_reply(mac(0x20), REMOTE, mac(0x10), LOCAL).unwrap();
        let frame = CapturedFrame::new(&bytes).unwrap();
        let view = frame.arp().unwrap();
        assert_eq!(view.operation, ArpOperations::Reply);
        assert_eq!(view.sender_hw, mac(0x20));
        assert_eq!(view.sender_proto, REMOTE);
        assert_eq!(view.target_proto, LOCAL);
        assert!(frame.tcp().is_none());
        assert!(frame.network_flow().is_none());
    }

    #[test]
    fn truncated_arp_is_absent_not_an_error() {
        let bytes = arp::create_reply(mac(0x20), REMOTE, mac(0x10), LOCAL).unwrap();
        let frame = CapturedFrame::new(&bytes[..ETH_HDR_LEN + 10]).unwrap();
        assert!(frame.arp().is_none());
    }

    #[test]
    fn tcp_layer_and_flow_are_decoded() {
        let bytes = TcpSegment::syn(mac(0x20), mac(0x10), REMOTE, LOCAL, 22, 63323)
            .with_flags(TcpFlags::SYN | TcpFlags::ACK)
            .build()
            .unwrap();
        let frame = CapturedFrame::new(&bytes).unwrap();

        assert_eq!(frame.network_flow(), Some(Flow::new(REMOTE, LOCAL)));
        let tcp = frame.tcp().unwrap();
        assert_eq!(tcp.src_port, 22);
        assert_eq!(tcp.dst_port, 63323);
        assert!(tcp.is_syn_ack());
        assert!(frame.arp().is_none());
    }

    #[test]
    fn truncated_tcp_keeps_network_layer() {
        let bytes = TcpSegment::syn(mac(0x20), mac(0x10), REMOTE, LOCAL, 22, 63323)
            .build()
            .unwrap();
        let cut = &bytes[..ETH_HDR_LEN + IPV4_HDR_LEN + 8];
        let frame = CapturedFrame::new(cut).unwrap();
        assert_eq!(frame.network_flow(), Some(Flow::new(REMOTE, LOCAL)));
        assert!(frame.tcp().is_none());
    }

    #[test]
    fn garbage_after_ethernet_header_decodes_nothing() {
        let mut bytes = vec![0xffu8; 64];
        bytes[12] = 0x08;
        bytes[13] = 0x00;
        let frame = CapturedFrame::new(&bytes).unwrap();
        assert!(frame.ipv4().is_none());
        assert!(frame.tcp().is_none());
        assert!(frame.arp().is_none());
    }

    #[test]
    fn flow_is_order_sensitive() {
        let flow = Flow::new(REMOTE, LOCAL);
        assert_ne!(flow, flow.reverse());
        assert_eq!(flow, flow.reverse().reverse());
    }

    #[test]
    fn syn_alone_is_not_syn_ack() {
        let view = TcpView {
            src_port: 22,
            dst_port: 63323,
            flags: TcpFlags::SYN,
        };
        assert!(!view.is_syn_ack());
        assert!(view.has(TcpFlags::SYN));
    }
}
