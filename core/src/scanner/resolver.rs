use std::net::Ipv4Addr;
use std::time::Duration;

use pnet::util::MacAddr;
use sshsweep_common::config::ScanConfig;
use sshsweep_common::error::ScanError;
use sshsweep_common::network::route::RouteInfo;
use sshsweep_protocols::arp;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::receive_until;
use crate::network::channel::CaptureChannel;

/// Finds the hardware address frames to a destination have to be sent to.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    timeout: Duration,
    poll_interval: Duration,
}

impl Resolver {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn from_config(cfg: &ScanConfig) -> Self {
        Self::new(cfg.resolve_timeout, cfg.poll_interval)
    }

    /// Sends one ARP request for the next hop towards `destination` and waits
    /// for any ARP frame whose sender is that next hop.
    ///
    /// Off-link destinations resolve to their gateway's address.
    pub async fn resolve(
        &self,
        channel: &mut dyn CaptureChannel,
        destination: Ipv4Addr,
        route: &RouteInfo,
    ) -> Result<MacAddr, ScanError> {
        let next_hop = route.next_hop(destination);
        let request = arp::create_request(route.mac, route.source, next_hop)?;

        if let Err(e) = channel.send(&request) {
            warn!("ARP request for {next_hop} not sent: {e}");
        }

        let deadline = Instant::now() + self.timeout;
        let found = receive_until(channel, deadline, self.poll_interval, |frame| {
            frame
                .arp()
                .filter(|arp| arp.sender_proto == next_hop)
                .map(|arp| arp.sender_hw)
        })
        .await?;

        match found {
            Some(mac) => {
                debug!("{next_hop} is at {mac}");
                Ok(mac)
            }
            None => Err(ScanError::ResolutionTimeout {
                target: next_hop,
                timeout: self.timeout,
            }),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChannel, MockRead, arp_reply_frame, mock_interface, mock_route, syn_ack_frame};
    use pnet::packet::arp::ArpOperations;
    use sshsweep_common::error::ChannelError;
    use sshsweep_protocols::frame::CapturedFrame;
    use std::io;

    const LOCAL_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x01);
    const TARGET_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x20);
    const GATEWAY_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0xfe);
    const SOURCE: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
    const TARGET: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 20);
    const GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
    const REMOTE: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 9);

    fn resolver() -> Resolver {
        Resolver::from_config(&ScanConfig::default())
    }

    fn route(gateway: Option<Ipv4Addr>) -> RouteInfo {
        mock_route(mock_interface("eth0", LOCAL_MAC, SOURCE, 24), SOURCE, gateway)
    }

    fn reply_from(mac: MacAddr, addr: Ipv4Addr) -> MockRead {
        MockRead::Frame(arp_reply_frame(mac, addr, LOCAL_MAC, SOURCE))
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_on_link_target() {
        let mut channel = MockChannel::new([MockRead::Timeout, reply_from(TARGET_MAC, TARGET)]);
        let log = channel.log();

        let mac = resolver().resolve(&mut channel, TARGET, &route(None)).await.unwrap();
        assert_eq!(mac, TARGET_MAC);

        let sent = log.sent();
        assert_eq!(sent.len(), 1);
        let request = CapturedFrame::new(&sent[0]).unwrap();
        assert_eq!(request.ethernet().get_destination(), MacAddr::broadcast());
        let arp = request.arp().unwrap();
        assert_eq!(arp.operation, ArpOperations::Request);
        assert_eq!(arp.sender_hw, LOCAL_MAC);
        assert_eq!(arp.sender_proto, SOURCE);
        assert_eq!(arp.target_proto, TARGET);
    }

    #[tokio::test(start_paused = true)]
    async fn routed_target_resolves_gateway() {
        let mut channel = MockChannel::new([
            reply_from(TARGET_MAC, TARGET),
            reply_from(GATEWAY_MAC, GATEWAY),
        ]);
        let log = channel.log();

        let mac = resolver()
            .resolve(&mut channel, REMOTE, &route(Some(GATEWAY)))
            .await
            .unwrap();
        assert_eq!(mac, GATEWAY_MAC);

        let sent = log.sent();
        let request = CapturedFrame::new(&sent[0]).unwrap();
        assert_eq!(request.arp().unwrap().target_proto, GATEWAY);
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_traffic_does_not_cut_the_wait_short() {
        let noise = syn_ack_frame(TARGET_MAC, LOCAL_MAC, TARGET, SOURCE, 22, 63323);
        let mut channel = MockChannel::new([
            MockRead::Frame(noise.clone()),
            reply_from(GATEWAY_MAC, GATEWAY),
            MockRead::Frame(vec![0u8; 5]),
            MockRead::Frame(noise),
        ]);

        let started = Instant::now();
        let result = resolver().resolve(&mut channel, TARGET, &route(None)).await;
        match result {
            Err(ScanError::ResolutionTimeout { target, timeout }) => {
                assert_eq!(target, TARGET);
                assert_eq!(timeout, Duration::from_secs(3));
            }
            other => panic!("expected resolution timeout, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_still_waits_for_reply() {
        let mut channel = MockChannel::new([reply_from(TARGET_MAC, TARGET)]).failing_send();
        let mac = resolver().resolve(&mut channel, TARGET, &route(None)).await.unwrap();
        assert_eq!(mac, TARGET_MAC);
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_aborts() {
        let mut channel = MockChannel::new([
            MockRead::Timeout,
            MockRead::Error(io::ErrorKind::NetworkDown),
            reply_from(TARGET_MAC, TARGET),
        ]);
        let result = resolver().resolve(&mut channel, TARGET, &route(None)).await;
        assert!(matches!(
            result,
            Err(ScanError::Channel(ChannelError::Read(_)))
        ));
    }
}
