//! Link-layer capture channel.
//!
//! A channel is bound to one interface and used by exactly one target scan.
//! Frames are pulled off the socket by a dedicated reader thread and queued
//! for the async side, which waits on them with a bounded timeout so the
//! resolver and prober can keep checking their deadlines.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use sshsweep_common::error::ChannelError;
use tokio::sync::mpsc;
use tracing::{debug, trace};

type Captured = io::Result<Vec<u8>>;

#[async_trait]
pub trait CaptureChannel: Send {
    /// Best-effort write of one complete frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError>;

    /// Waits at most `wait` for the next captured frame.
    ///
    /// `Ok(None)` means the wait elapsed without traffic, which is not an error.
    async fn next_frame(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, ChannelError>;

    /// Releases the underlying handle. Consuming `self` makes a second close impossible.
    fn close(self: Box<Self>);
}

pub trait ChannelProvider: Send + Sync {
    fn open(&self, intf: &NetworkInterface) -> Result<Box<dyn CaptureChannel>, ChannelError>;
}

type Opener = fn(&NetworkInterface, Config) -> io::Result<Channel>;

/// Opens promiscuous ethernet channels through `pnet::datalink`.
pub struct DatalinkProvider {
    poll_interval: Duration,
    opener: Opener,
}

impl DatalinkProvider {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            opener: datalink::channel,
        }
    }

    fn config(&self) -> Config {
        Config {
            read_timeout: Some(self.poll_interval),
            promiscuous: true,
            ..Default::default()
        }
    }
}

impl ChannelProvider for DatalinkProvider {
    fn open(&self, intf: &NetworkInterface) -> Result<Box<dyn CaptureChannel>, ChannelError> {
        let (tx, rx) = open_eth_channel(intf, &self.config(), self.opener)?;
        debug!("capture channel opened on {}", intf.name);
        Ok(Box::new(DatalinkChannel::start(intf.name.clone(), tx, rx)))
    }
}

pub struct DatalinkChannel {
    intf_name: String,
    tx: Box<dyn DataLinkSender>,
    rx: mpsc::UnboundedReceiver<Captured>,
    running: Arc<AtomicBool>,
}

impl DatalinkChannel {
    fn start(intf_name: String, tx: Box<dyn DataLinkSender>, rx: Box<dyn DataLinkReceiver>) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        std::thread::spawn(move || capture_loop(rx, queue_tx, flag));

        Self {
            intf_name,
            tx,
            rx: queue_rx,
            running,
        }
    }
}

/// Forwards frames until the channel is closed or the socket fails.
fn capture_loop(
    mut rx: Box<dyn DataLinkReceiver>,
    queue: mpsc::UnboundedSender<Captured>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Relaxed) {
        match rx.next() {
            Ok(frame) => {
                if queue.send(Ok(frame.to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if is_read_timeout(&e) => continue,
            Err(e) => {
                let _ = queue.send(Err(e));
                break;
            }
        }
    }
    trace!("capture thread finished");
}

fn is_read_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

#[async_trait]
impl CaptureChannel for DatalinkChannel {
    fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        match self.tx.send_to(frame, None) {
            Some(result) => result.map_err(ChannelError::Send),
            None => Err(ChannelError::Send(io::Error::other("no write buffer available"))),
        }
    }

    async fn next_frame(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, ChannelError> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Some(Ok(bytes))) => Ok(Some(bytes)),
            Ok(Some(Err(e))) => Err(ChannelError::Read(e)),
            Ok(None) => Err(ChannelError::Closed),
        }
    }

    fn close(self: Box<Self>) {
        self.running.store(false, Ordering::Relaxed);
        debug!("capture channel on {} closed", self.intf_name);
    }
}

fn open_eth_channel(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: Opener,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>), ChannelError> {
    let ch: Channel = channel_opener(intf, *cfg).map_err(|source| ChannelError::Open {
        interface: intf.name.clone(),
        source,
    })?;
    match ch {
        Channel::Ethernet(tx, rx) => Ok((tx, rx)),
        _ => Err(ChannelError::NotEthernet(intf.name.clone())),
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
