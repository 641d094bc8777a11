use std::net::Ipv4Addr;

use pnet::packet::ethernet::EtherTypes;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, MutableIpv4Packet};
use pnet::packet::tcp::{self, MutableTcpPacket, TcpFlags};
use pnet::util::MacAddr;
use sshsweep_common::error::ScanError;

use crate::{ETH_HDR_LEN, IPV4_HDR_LEN, TCP_HDR_LEN, ethernet};

const FRAME_LEN: usize = ETH_HDR_LEN + IPV4_HDR_LEN + TCP_HDR_LEN;
const DEFAULT_TTL: u8 = 64;
const DEFAULT_WINDOW: u16 = 65535;

/// One header-only TCP segment wrapped in IPv4 and ethernet.
///
/// Lengths and both checksums are recomputed on every [`TcpSegment::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSegment {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: u8,
    pub sequence: u32,
    pub acknowledgement: u32,
    pub ttl: u8,
}

impl TcpSegment {
    /// A plain SYN with a random initial sequence number.
    pub fn syn(
        src_mac: MacAddr,
        dst_mac: MacAddr,
        src_addr: Ipv4Addr,
        dst_addr: Ipv4Addr,
        src_port: u16,
        dst_port: u16,
    ) -> Self {
        Self {
            src_mac,
            dst_mac,
            src_addr,
            dst_addr,
            src_port,
            dst_port,
            flags: TcpFlags::SYN,
            sequence: rand::random(),
            acknowledgement: 0,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn build(&self) -> Result<Vec<u8>, ScanError> {
        let mut buffer = vec![0u8; FRAME_LEN];
        ethernet::make_header(&mut buffer, self.src_mac, self.dst_mac, EtherTypes::Ipv4)?;
        self.write_ipv4_header(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + IPV4_HDR_LEN])?;
        self.write_tcp_header(&mut buffer[ETH_HDR_LEN + IPV4_HDR_LEN..])?;
        Ok(buffer)
    }

    fn write_ipv4_header(&self, buf: &mut [u8]) -> Result<(), ScanError> {
        let mut ip = MutableIpv4Packet::new(buf).ok_or(ScanError::FrameBuild("ipv4"))?;
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_dscp(0);
        ip.set_ecn(0);
        ip.set_total_length((IPV4_HDR_LEN + TCP_HDR_LEN) as u16);
        ip.set_identification(rand::random());
        ip.set_flags(2); // don't fragment
        ip.set_fragment_offset(0);
        ip.set_ttl(self.ttl);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
        ip.set_source(self.src_addr);
        ip.set_destination(self.dst_addr);
        ip.set_checksum(0);
        let csm = ipv4::checksum(&ip.to_immutable());
        ip.set_checksum(csm);
        Ok(())
    }

    fn write_tcp_header(&self, buf: &mut [u8]) -> Result<(), ScanError> {
        let mut tcp = MutableTcpPacket::new(buf).ok_or(ScanError::FrameBuild("tcp"))?;
        tcp.set_source(self.src_port);
        tcp.set_destination(self.dst_port);
        tcp.set_sequence(self.sequence);
        tcp.set_acknowledgement(self.acknowledgement);
        tcp.set_data_offset(5);
        tcp.set_flags(self.flags);
        tcp.set_window(DEFAULT_WINDOW);
        tcp.set_urgent_ptr(0);
        tcp.set_checksum(0);
        let csm = tcp::ipv4_checksum(&tcp.to_immutable(), &self.src_addr, &self.dst_addr);
        tcp.set_checksum(csm);
        Ok(())
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
