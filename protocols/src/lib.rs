//! # Frame Codec
//!
//! Builds the frames `sshsweep` sends (ARP requests and TCP SYN probes) and
//! decodes captured traffic through the borrowed, lazily evaluated
//! [`frame::CapturedFrame`] view.

pub mod arp;
pub mod ethernet;
pub mod frame;
pub mod tcp;

pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
pub const IPV4_HDR_LEN: usize = 20;
pub const TCP_HDR_LEN: usize = 20;
/// Smallest ethernet frame without the frame check sequence.
pub const MIN_ETH_FRAME_NO_FCS: usize = 60;
