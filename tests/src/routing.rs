use std::net::Ipv4Addr;

use pnet::datalink::{MacAddr, NetworkInterface};
use sshsweep_common::network::route::{RouteLookup, SystemRouter, parse_proc_route};

use crate::util::{ni, v4};

/*************************************************************
                    On-link route selection
**************************************************************/

#[test]
fn lan_target_leaves_through_owning_interface() {
    let router = SystemRouter::from_parts(iface_all(), Vec::new());

    let route = router.route(Ipv4Addr::new(192, 168, 0, 77)).unwrap();
    assert_eq!(route.interface, enp9s0());
    assert_eq!(route.mac, enp9s0().mac.unwrap());
    assert_eq!(route.source, Ipv4Addr::new(192, 168, 0, 32));
    assert_eq!(route.gateway, None);
}

#[test]
fn second_subnet_selects_wlan0() {
    let router = SystemRouter::from_parts(iface_all(), Vec::new());

    let route = router.route(Ipv4Addr::new(10, 13, 37, 200)).unwrap();
    assert_eq!(route.interface, wlan0());
    assert_eq!(route.source, Ipv4Addr::new(10, 13, 37, 4));
}

const PROC_ROUTE: &str = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
enp9s0\t00000000\t0100A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
wlan0\t00000000\t01250D0A\t0003\t0\t0\t600\t00000000\t0\t0\t0
wlan0\t000010AC\tFE250D0A\t0003\t0\t0\t600\t0000F0FF\t0\t0\t0
";

#[test]
fn on_link_wins_over_default_gateway() {
    let table = parse_proc_route(PROC_ROUTE);
    assert_eq!(table[0].gateway, Some(Ipv4Addr::new(192, 168, 0, 1)));

    let router = SystemRouter::from_parts(iface_all(), table);
    let route = router.route(Ipv4Addr::new(192, 168, 0, 1)).unwrap();
    assert_eq!(route.gateway, None);
    assert_eq!(route.next_hop(Ipv4Addr::new(192, 168, 0, 1)), Ipv4Addr::new(192, 168, 0, 1));
}

#[test]
fn specific_route_picks_its_own_interface_and_gateway() {
    let router = SystemRouter::from_parts(iface_all(), parse_proc_route(PROC_ROUTE));

    let route = router.route(Ipv4Addr::new(172, 16, 4, 9)).unwrap();
    assert_eq!(route.interface, wlan0());
    assert_eq!(route.source, Ipv4Addr::new(10, 13, 37, 4));
    assert_eq!(route.gateway, Some(Ipv4Addr::new(10, 13, 37, 254)));
}

#[test]
fn default_route_with_lowest_metric_wins() {
    let router = SystemRouter::from_parts(iface_all(), parse_proc_route(PROC_ROUTE));

    let route = router.route(Ipv4Addr::new(1, 1, 1, 1)).unwrap();
    assert_eq!(route.interface, enp9s0());
    assert_eq!(route.gateway, Some(Ipv4Addr::new(192, 168, 0, 1)));
}

/*************************************************************
                  Mock interfaces for testing
**************************************************************/

fn iface_all() -> Vec<NetworkInterface> {
    vec![enp9s0(), wlan0()]
}

fn enp9s0() -> NetworkInterface {
    ni(
        "enp9s0",
        2,
        Some(MacAddr::new(0xa8, 0xa1, 0x59, 0x13, 0x41, 0x46)),
        &[v4(192, 168, 0, 32, 24)],
        69699,
    )
}

fn wlan0() -> NetworkInterface {
    ni(
        "wlan0",
        3,
        Some(MacAddr::new(0x3c, 0x21, 0x9c, 0x11, 0x22, 0x33)),
        &[v4(10, 13, 37, 4, 24)],
        69699,
    )
}
