//! Half-open port probe.
//!
//! A single SYN goes out from a fixed source port and the channel is watched
//! for the matching SYN+ACK. The handshake is never completed, so the probe
//! leaves no connection behind on either side.

use std::net::Ipv4Addr;
use std::time::Duration;

use pnet::util::MacAddr;
use sshsweep_common::config::ScanConfig;
use sshsweep_common::error::ScanError;
use sshsweep_common::network::route::RouteInfo;
use sshsweep_protocols::frame::{CapturedFrame, Flow};
use sshsweep_protocols::tcp::TcpSegment;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::receive_until;
use crate::network::channel::CaptureChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A SYN+ACK came back. `port` is the source port of that reply.
    Open { port: u16 },
    /// No qualifying reply before the deadline: closed, filtered or down.
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct Prober {
    src_port: u16,
    timeout: Duration,
    poll_interval: Duration,
    attempts: u8,
}

impl Prober {
    pub fn new(src_port: u16, timeout: Duration, poll_interval: Duration, attempts: u8) -> Self {
        Self {
            src_port,
            timeout,
            poll_interval,
            attempts: attempts.max(1),
        }
    }

    pub fn from_config(cfg: &ScanConfig) -> Self {
        Self::new(cfg.src_port, cfg.probe_timeout, cfg.poll_interval, cfg.attempts)
    }

    pub async fn probe(
        &self,
        channel: &mut dyn CaptureChannel,
        target: Ipv4Addr,
        route: &RouteInfo,
        dst_mac: MacAddr,
        port: u16,
    ) -> Result<Verdict, ScanError> {
        let expected = Flow::new(target, route.source);

        for attempt in 1..=self.attempts {
            let frame = TcpSegment::syn(route.mac, dst_mac, route.source, target, self.src_port, port).build()?;
            if let Err(e) = channel.send(&frame) {
                warn!("SYN to {target}:{port} not sent: {e}");
            }

            let deadline = Instant::now() + self.timeout;
            let reply = receive_until(channel, deadline, self.poll_interval, |frame| {
                self.syn_ack_port(frame, expected)
            })
            .await?;

            if let Some(port) = reply {
                return Ok(Verdict::Open { port });
            }
            debug!("attempt {attempt}/{}: no SYN+ACK from {target}:{port}", self.attempts);
        }

        Ok(Verdict::Closed)
    }

    /// Source port of `frame` if it answers our probe.
    ///
    /// The flow is checked first; the transport layer is only decoded for
    /// frames that travel from the target to us.
    fn syn_ack_port(&self, frame: &CapturedFrame<'_>, expected: Flow) -> Option<u16> {
        if frame.network_flow()? != expected {
            return None;
        }
        let segment = frame.tcp()?;
        (segment.dst_port == self.src_port && segment.is_syn_ack()).then_some(segment.src_port)
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
