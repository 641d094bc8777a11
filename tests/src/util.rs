use std::net::Ipv4Addr;
use std::sync::Arc;

use pnet::datalink::{MacAddr, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use sshsweep_common::config::ScanConfig;
use sshsweep_core::report::ScanEvent;
use sshsweep_core::scanner::Scanner;
use sshsweep_core::testing::{MockNetwork, MockProvider, ScriptedDialer, StaticRouter};

pub const LOCAL_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x01);
pub const SOURCE: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 100);

pub fn ni(name: &str, index: u32, mac: Option<MacAddr>, ips: &[IpNetwork], flags: u32) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        description: "".into(),
        index,
        mac,
        ips: ips.to_vec(),
        flags,
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8, p: u8) -> IpNetwork {
    IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(a, b, c, d), p).unwrap())
}

pub fn host_mac(addr: Ipv4Addr) -> MacAddr {
    let [_, _, c, d] = addr.octets();
    MacAddr(0x02, 0xaa, 0, 0, c, d)
}

pub struct Lab {
    pub scanner: Arc<Scanner>,
    pub provider: Arc<MockProvider>,
}

pub fn lab(cfg: ScanConfig, router: StaticRouter, network: MockNetwork, dialer: ScriptedDialer) -> Lab {
    let provider = Arc::new(MockProvider::new(network));
    let scanner = Arc::new(Scanner::new(cfg, Arc::new(router), provider.clone(), Arc::new(dialer)));
    Lab { scanner, provider }
}

/// Runs every target to completion and returns all events.
pub async fn sweep(lab: &Lab, targets: Vec<Ipv4Addr>) -> Vec<ScanEvent> {
    let mut rx = lab.scanner.clone().spawn_scans(targets);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Sorted report lines of the open targets.
pub fn report_lines(events: &[ScanEvent]) -> Vec<String> {
    let mut lines: Vec<String> = events
        .iter()
        .filter_map(|event| event.outcome.as_ref().ok().and_then(Option::as_ref))
        .map(ToString::to_string)
        .collect();
    lines.sort();
    lines
}
