//! In-memory stand-ins for the scan engine's collaborators.
//!
//! [`MockNetwork`] plays the hosts on the wire: every frame written to a
//! [`MockChannel`] is shown to it and the frames it answers with are queued
//! for reading, so concurrent scans each see their own replies.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use pnet::packet::arp::ArpOperations;
use pnet::packet::tcp::TcpFlags;
use pnet::util::MacAddr;
use sshsweep_common::error::{ChannelError, ScanError};
use sshsweep_common::network::route::{RouteInfo, RouteLookup};
use sshsweep_protocols::frame::CapturedFrame;
use sshsweep_protocols::{arp, tcp::TcpSegment};
use tokio::io::{AsyncRead, ReadBuf};

use crate::network::channel::{CaptureChannel, ChannelProvider};
use crate::scanner::banner::{BannerStream, Dialer};

/// Builds an up, broadcast-capable ethernet interface with one IPv4 network.
pub fn mock_interface(name: &str, mac: MacAddr, addr: Ipv4Addr, prefix: u8) -> NetworkInterface {
    let ips = Ipv4Network::new(addr, prefix)
        .map(|net| vec![IpNetwork::V4(net)])
        .unwrap_or_default();
    NetworkInterface {
        name: name.to_string(),
        description: String::new(),
        index: 2,
        mac: Some(mac),
        ips,
        flags: 0x1 | 0x2 | 0x40,
    }
}

/// Route leaving through `intf`, on-link when `gateway` is `None`.
pub fn mock_route(intf: NetworkInterface, source: Ipv4Addr, gateway: Option<Ipv4Addr>) -> RouteInfo {
    let mac = intf.mac.unwrap_or_else(MacAddr::zero);
    RouteInfo {
        interface: intf,
        mac,
        gateway,
        source,
    }
}

pub fn arp_reply_frame(
    responder_mac: MacAddr,
    responder_addr: Ipv4Addr,
    asker_mac: MacAddr,
    asker_addr: Ipv4Addr,
) -> Vec<u8> {
    arp::create_reply(responder_mac, responder_addr, asker_mac, asker_addr).unwrap_or_default()
}

/// Header-only TCP segment with arbitrary flags, as a remote host would send it.
pub fn tcp_frame(
    src_mac: MacAddr,
    dst_mac: MacAddr,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    src_port: u16,
    dst_port: u16,
    flags: u8,
) -> Vec<u8> {
    TcpSegment::syn(src_mac, dst_mac, src_addr, dst_addr, src_port, dst_port)
        .with_flags(flags)
        .build()
        .unwrap_or_default()
}

pub fn syn_ack_frame(
    src_mac: MacAddr,
    dst_mac: MacAddr,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    src_port: u16,
    dst_port: u16,
) -> Vec<u8> {
    tcp_frame(
        src_mac,
        dst_mac,
        src_addr,
        dst_addr,
        src_port,
        dst_port,
        TcpFlags::SYN | TcpFlags::ACK,
    )
}

// ---------------------------------------------------------------------------
// Capture channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum MockRead {
    Frame(Vec<u8>),
    /// One read that waits out its full timeout.
    Timeout,
    Error(io::ErrorKind),
}

/// Shared record of what happened on one or more mock channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelLog {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl ChannelLog {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record_send(&self, frame: &[u8]) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.to_vec());
    }
}

pub struct MockChannel {
    reads: VecDeque<MockRead>,
    network: Option<MockNetwork>,
    fail_send: bool,
    log: ChannelLog,
}

impl MockChannel {
    pub fn new(reads: impl IntoIterator<Item = MockRead>) -> Self {
        Self {
            reads: reads.into_iter().collect(),
            network: None,
            fail_send: false,
            log: ChannelLog::default(),
        }
    }

    /// Answers every sent frame the way `network` would.
    pub fn wired_to(network: MockNetwork) -> Self {
        let mut channel = Self::new([]);
        channel.network = Some(network);
        channel
    }

    /// Every `send` fails, reads still work.
    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn with_log(mut self, log: ChannelLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> ChannelLog {
        self.log.clone()
    }
}

#[async_trait]
impl CaptureChannel for MockChannel {
    fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        self.log.record_send(frame);
        if self.fail_send {
            return Err(ChannelError::Send(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock send failure",
            )));
        }
        if let Some(network) = &self.network {
            self.reads
                .extend(network.answer(frame).into_iter().map(MockRead::Frame));
        }
        Ok(())
    }

    async fn next_frame(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, ChannelError> {
        match self.reads.pop_front() {
            Some(MockRead::Frame(bytes)) => Ok(Some(bytes)),
            Some(MockRead::Error(kind)) => Err(ChannelError::Read(io::Error::from(kind))),
            Some(MockRead::Timeout) | None => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    fn close(self: Box<Self>) {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Opens [`MockChannel`]s wired to a [`MockNetwork`], counting opens and closes.
#[derive(Default)]
pub struct MockProvider {
    network: MockNetwork,
    unopenable: HashSet<String>,
    scripts: HashMap<String, VecDeque<MockRead>>,
    log: ChannelLog,
}

impl MockProvider {
    pub fn new(network: MockNetwork) -> Self {
        Self {
            network,
            ..Default::default()
        }
    }

    /// Opening a channel on `intf_name` fails with a permission error.
    pub fn refusing(mut self, intf_name: &str) -> Self {
        self.unopenable.insert(intf_name.to_string());
        self
    }

    /// Frames served before any network answers on channels of `intf_name`.
    pub fn with_script(mut self, intf_name: &str, reads: impl IntoIterator<Item = MockRead>) -> Self {
        self.scripts
            .insert(intf_name.to_string(), reads.into_iter().collect());
        self
    }

    pub fn log(&self) -> ChannelLog {
        self.log.clone()
    }
}

impl ChannelProvider for MockProvider {
    fn open(&self, intf: &NetworkInterface) -> Result<Box<dyn CaptureChannel>, ChannelError> {
        if self.unopenable.contains(&intf.name) {
            return Err(ChannelError::Open {
                interface: intf.name.clone(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "mock open failure"),
            });
        }
        self.log.opens.fetch_add(1, Ordering::SeqCst);

        let script = self.scripts.get(&intf.name).cloned().unwrap_or_default();
        let mut channel = MockChannel::wired_to(self.network.clone()).with_log(self.log.clone());
        channel.reads = script;
        Ok(Box::new(channel))
    }
}

// ---------------------------------------------------------------------------
// Simulated link
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct MockHost {
    mac: MacAddr,
    open_ports: HashSet<u16>,
}

/// Hosts that answer ARP for their address and SYNs for their ports.
///
/// Open ports answer SYN+ACK, every other port answers RST+ACK.
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    hosts: HashMap<Ipv4Addr, MockHost>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, addr: Ipv4Addr, mac: MacAddr, open_ports: &[u16]) -> Self {
        self.hosts.insert(
            addr,
            MockHost {
                mac,
                open_ports: open_ports.iter().copied().collect(),
            },
        );
        self
    }

    /// Frames the link sends back in response to `sent`.
    pub fn answer(&self, sent: &[u8]) -> Vec<Vec<u8>> {
        let Some(frame) = CapturedFrame::new(sent) else {
            return Vec::new();
        };

        if let Some(request) = frame.arp() {
            if request.operation != ArpOperations::Request {
                return Vec::new();
            }
            return self
                .hosts
                .get(&request.target_proto)
                .map(|host| {
                    arp_reply_frame(
                        host.mac,
                        request.target_proto,
                        request.sender_hw,
                        request.sender_proto,
                    )
                })
                .into_iter()
                .collect();
        }

        let (Some(flow), Some(segment)) = (frame.network_flow(), frame.tcp()) else {
            return Vec::new();
        };
        if segment.flags != TcpFlags::SYN {
            return Vec::new();
        }
        let Some(host) = self.hosts.get(&flow.dst) else {
            return Vec::new();
        };
        let flags = if host.open_ports.contains(&segment.dst_port) {
            TcpFlags::SYN | TcpFlags::ACK
        } else {
            TcpFlags::RST | TcpFlags::ACK
        };
        vec![tcp_frame(
            host.mac,
            frame.source_mac(),
            flow.dst,
            flow.src,
            segment.dst_port,
            segment.src_port,
            flags,
        )]
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Fixed routing table. Destinations without an entry use the default route, if any.
#[derive(Debug, Clone, Default)]
pub struct StaticRouter {
    routes: HashMap<Ipv4Addr, RouteInfo>,
    default: Option<RouteInfo>,
}

impl StaticRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, destination: Ipv4Addr, route: RouteInfo) -> Self {
        self.routes.insert(destination, route);
        self
    }

    pub fn with_default(mut self, route: RouteInfo) -> Self {
        self.default = Some(route);
        self
    }
}

impl RouteLookup for StaticRouter {
    fn route(&self, destination: Ipv4Addr) -> Result<RouteInfo, ScanError> {
        self.routes
            .get(&destination)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| ScanError::route(destination, "no static route"))
    }
}

// ---------------------------------------------------------------------------
// Stream connections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum DialScript {
    /// Connects and serves these bytes, then closes.
    Greeting(Vec<u8>),
    /// Connects but never sends anything.
    Silent,
    /// The connect itself never completes.
    Hang,
}

/// Dialer serving canned streams. Unknown addresses refuse the connection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDialer {
    scripts: HashMap<SocketAddrV4, DialScript>,
    dials: Arc<AtomicUsize>,
}

impl ScriptedDialer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, addr: SocketAddrV4, script: DialScript) -> Self {
        self.scripts.insert(addr, script);
        self
    }

    pub fn with_greeting(self, addr: SocketAddrV4, greeting: &str) -> Self {
        self.with(addr, DialScript::Greeting(greeting.as_bytes().to_vec()))
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for ScriptedDialer {
    async fn dial(&self, addr: SocketAddrV4) -> io::Result<BannerStream> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(&addr) {
            Some(DialScript::Greeting(bytes)) => Ok(Box::new(io::Cursor::new(bytes.clone()))),
            Some(DialScript::Silent) => Ok(Box::new(SilentStream)),
            Some(DialScript::Hang) => std::future::pending().await,
            None => Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")),
        }
    }
}

/// A connection that stays open without ever delivering data.
struct SilentStream;

impl AsyncRead for SilentStream {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}
