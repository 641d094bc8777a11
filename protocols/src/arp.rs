use std::net::Ipv4Addr;

use pnet::packet::arp::{ArpHardwareTypes, ArpOperation, ArpOperations, MutableArpPacket};
use pnet::packet::ethernet::EtherTypes;
use pnet::util::MacAddr;
use sshsweep_common::error::ScanError;

use crate::{ARP_LEN, ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS, ethernet};

/// Broadcast "who has `target_addr`" request, padded to the minimum frame size.
pub fn create_request(
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    target_addr: Ipv4Addr,
) -> Result<Vec<u8>, ScanError> {
    create_packet(
        ArpOperations::Request,
        src_mac,
        MacAddr::broadcast(),
        src_addr,
        MacAddr::zero(),
        target_addr,
    )
}

/// Unicast reply announcing `src_mac` as the owner of `src_addr`.
pub fn create_reply(
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    dst_mac: MacAddr,
    dst_addr: Ipv4Addr,
) -> Result<Vec<u8>, ScanError> {
    create_packet(
        ArpOperations::Reply,
        src_mac,
        dst_mac,
        src_addr,
        dst_mac,
        dst_addr,
    )
}

fn create_packet(
    operation: ArpOperation,
    src_mac: MacAddr,
    eth_dst_mac: MacAddr,
    src_addr: Ipv4Addr,
    target_mac: MacAddr,
    target_addr: Ipv4Addr,
) -> Result<Vec<u8>, ScanError> {
    let mut buffer = [0u8; MIN_ETH_FRAME_NO_FCS];
    ethernet::make_header(&mut buffer, src_mac, eth_dst_mac, EtherTypes::Arp)?;
    let mut arp_packet = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .ok_or(ScanError::FrameBuild("arp"))?;
    arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp_packet.set_protocol_type(EtherTypes::Ipv4);
    arp_packet.set_hw_addr_len(6);
    arp_packet.set_proto_addr_len(4);
    arp_packet.set_operation(operation);
    arp_packet.set_sender_hw_addr(src_mac);
    arp_packet.set_sender_proto_addr(src_addr);
    arp_packet.set_target_hw_addr(target_mac);
    arp_packet.set_target_proto_addr(target_addr);
    Ok(Vec::from(buffer))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
