use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use sshsweep_common::config::ScanConfig;
use sshsweep_common::error::ScanError;
use sshsweep_common::network::target;
use sshsweep_core::testing::{MockNetwork, ScriptedDialer, StaticRouter, mock_interface, mock_route};
use tokio::time::Instant;

use crate::util::{LOCAL_MAC, SOURCE, host_mac, lab, report_lines, sweep};

fn on_link_router() -> StaticRouter {
    StaticRouter::new().with_default(mock_route(mock_interface("eth0", LOCAL_MAC, SOURCE, 24), SOURCE, None))
}

/// Every even host in 10.0.0.0/28 runs sshd, every odd one is up with 22 closed.
fn subnet() -> (MockNetwork, ScriptedDialer) {
    let mut network = MockNetwork::new();
    let mut dialer = ScriptedDialer::new();
    for last in 0..16u8 {
        let addr = Ipv4Addr::new(10, 0, 0, last);
        if last % 2 == 0 {
            network = network.with_host(addr, host_mac(addr), &[22]);
            dialer = dialer.with_greeting(SocketAddrV4::new(addr, 22), &format!("SSH-2.0-host{last}\r\n"));
        } else {
            network = network.with_host(addr, host_mac(addr), &[]);
        }
    }
    (network, dialer)
}

fn expected_lines() -> Vec<String> {
    let mut lines: Vec<String> = (0..16u8)
        .step_by(2)
        .map(|last| format!("10.0.0.{last}:22,SSH-2.0-host{last}"))
        .collect();
    lines.sort();
    lines
}

#[tokio::test(start_paused = true)]
async fn cidr_sweep_reports_each_open_host_once() {
    let targets = target::expand(["10.0.0.0/28"]);
    assert_eq!(targets.addrs.len(), 16);

    let (network, dialer) = subnet();
    let lab = lab(ScanConfig::default(), on_link_router(), network, dialer);
    let events = sweep(&lab, targets.addrs).await;

    assert_eq!(events.len(), 16);
    let seen: HashSet<Ipv4Addr> = events.iter().map(|e| e.target).collect();
    assert_eq!(seen.len(), 16);
    assert!(events.iter().all(|e| e.outcome.is_ok()));
    assert_eq!(report_lines(&events), expected_lines());

    assert_eq!(lab.provider.log().opens(), 16);
    assert_eq!(lab.provider.log().closes(), 16);
}

#[tokio::test(start_paused = true)]
async fn bounded_pool_gives_the_same_report() {
    let (network, dialer) = subnet();
    let cfg = ScanConfig::default().with_max_in_flight(Some(3));
    let lab = lab(cfg, on_link_router(), network, dialer);
    let events = sweep(&lab, target::expand(["10.0.0.0/28"]).addrs).await;

    assert_eq!(events.len(), 16);
    assert_eq!(report_lines(&events), expected_lines());
    assert_eq!(lab.provider.log().closes(), 16);
}

#[tokio::test(start_paused = true)]
async fn unbounded_targets_run_side_by_side() {
    let (network, dialer) = subnet();
    let lab = lab(ScanConfig::default(), on_link_router(), network, dialer);

    let started = Instant::now();
    let events = sweep(&lab, target::expand(["10.0.0.0/28"]).addrs).await;

    assert_eq!(events.len(), 16);
    // Closed hosts each wait out one probe deadline, concurrently.
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn failures_stay_with_their_target() {
    let reachable = Ipv4Addr::new(10, 0, 0, 2);
    let unroutable = Ipv4Addr::new(198, 51, 100, 7);
    let silent = Ipv4Addr::new(10, 0, 0, 99);
    let refusing = Ipv4Addr::new(10, 0, 0, 4);

    let route = mock_route(mock_interface("eth0", LOCAL_MAC, SOURCE, 24), SOURCE, None);
    let router = StaticRouter::new()
        .with_route(reachable, route.clone())
        .with_route(silent, route.clone())
        .with_route(refusing, route);

    let network = MockNetwork::new()
        .with_host(reachable, host_mac(reachable), &[22])
        .with_host(refusing, host_mac(refusing), &[22]);
    let dialer = ScriptedDialer::new().with_greeting(SocketAddrV4::new(reachable, 22), "SSH-2.0-ok\n");
    let lab = lab(ScanConfig::default(), router, network, dialer);

    let events = sweep(&lab, vec![reachable, unroutable, silent, refusing]).await;
    assert_eq!(events.len(), 4);

    for event in &events {
        match (event.target, &event.outcome) {
            (t, Ok(Some(result))) if t == reachable => {
                assert_eq!(result.to_string(), "10.0.0.2:22,SSH-2.0-ok");
            }
            (t, Err(ScanError::RouteLookup { .. })) if t == unroutable => {}
            (t, Err(ScanError::ResolutionTimeout { .. })) if t == silent => {}
            (t, Err(ScanError::Connect { port: 22, .. })) if t == refusing => {}
            (t, other) => panic!("unexpected outcome for {t}: {other:?}"),
        }
    }

    assert_eq!(lab.provider.log().opens(), 3);
    assert_eq!(lab.provider.log().closes(), 3);
}

#[tokio::test(start_paused = true)]
async fn custom_port_is_probed_and_reported() {
    let addr = Ipv4Addr::new(10, 0, 0, 9);
    let network = MockNetwork::new().with_host(addr, host_mac(addr), &[2222]);
    let dialer = ScriptedDialer::new().with_greeting(SocketAddrV4::new(addr, 2222), "SSH-2.0-alt\n");

    let lab_22 = lab(ScanConfig::default(), on_link_router(), network.clone(), dialer.clone());
    assert!(report_lines(&sweep(&lab_22, vec![addr]).await).is_empty());

    let lab_2222 = lab(ScanConfig::default().with_port(2222), on_link_router(), network, dialer);
    assert_eq!(
        report_lines(&sweep(&lab_2222, vec![addr]).await),
        vec!["10.0.0.9:2222,SSH-2.0-alt".to_string()]
    );
}

#[test]
fn arguments_expand_in_order_without_duplicates() {
    let targets = target::expand(["10.0.0.2", "10.0.0.0/30", "not-an-ip", "fe80::1", "10.0.0.3"]);
    assert_eq!(
        targets.addrs,
        vec![
            Ipv4Addr::new(10, 0, 0, 2),
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 3),
        ]
    );
    assert_eq!(targets.rejected.len(), 2);
    assert!(matches!(targets.rejected[0], ScanError::InvalidTarget(_)));
    assert!(matches!(targets.rejected[1], ScanError::NonIpv4Target(_)));
}
