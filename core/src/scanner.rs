//! Per-target scan pipeline and its concurrent driver.
//!
//! Each target runs `route -> open channel -> resolve -> probe -> close
//! channel -> banner` on its own task. The capture channel belongs to that
//! task alone and is closed exactly once, whatever the resolver or prober
//! returned. Targets are independent: a failure ends only its own scan.
//!
//! [`Scanner::spawn_scans`] hands back a receiver that yields one
//! [`ScanEvent`] per target and closes once the last task has finished.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use sshsweep_common::config::ScanConfig;
use sshsweep_common::error::{ChannelError, ScanError};
use sshsweep_common::network::route::{RouteInfo, RouteLookup, SystemRouter};
use sshsweep_protocols::frame::CapturedFrame;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span};

use crate::network::channel::{CaptureChannel, ChannelProvider, DatalinkProvider};
use crate::report::{ScanEvent, ScanResult};

pub mod banner;
pub mod prober;
pub mod resolver;

use banner::{BannerReader, Dialer, TcpDialer};
use prober::{Prober, Verdict};
use resolver::Resolver;

pub struct Scanner {
    cfg: ScanConfig,
    router: Arc<dyn RouteLookup>,
    provider: Arc<dyn ChannelProvider>,
    resolver: Resolver,
    prober: Prober,
    banner: BannerReader,
}

impl Scanner {
    pub fn new(
        cfg: ScanConfig,
        router: Arc<dyn RouteLookup>,
        provider: Arc<dyn ChannelProvider>,
        dialer: Arc<dyn Dialer>,
    ) -> Self {
        Self {
            resolver: Resolver::from_config(&cfg),
            prober: Prober::from_config(&cfg),
            banner: BannerReader::new(dialer, cfg.banner_timeout),
            cfg,
            router,
            provider,
        }
    }

    /// Scanner backed by the host's interfaces, raw ethernet capture and TCP.
    pub fn system(cfg: ScanConfig) -> Self {
        let provider = DatalinkProvider::new(cfg.poll_interval);
        Self::new(
            cfg,
            Arc::new(SystemRouter::new()),
            Arc::new(provider),
            Arc::new(TcpDialer),
        )
    }

    /// Scans one target. `Ok(None)` means the port did not answer with SYN+ACK.
    pub async fn scan_one(&self, target: Ipv4Addr) -> Result<Option<ScanResult>, ScanError> {
        self.pipeline(target)
            .instrument(info_span!("scan", target = %target))
            .await
    }

    async fn pipeline(&self, target: Ipv4Addr) -> Result<Option<ScanResult>, ScanError> {
        let route = self.router.route(target)?;
        debug!(
            "leaving via {} from {} (gateway {:?})",
            route.interface.name, route.source, route.gateway
        );

        let mut channel = self.provider.open(&route.interface)?;
        let verdict = self.resolve_and_probe(&mut *channel, target, &route).await;
        channel.close();

        match verdict? {
            Verdict::Closed => {
                debug!("no SYN+ACK on port {}", self.cfg.dst_port);
                Ok(None)
            }
            Verdict::Open { port } => {
                info!("port {} open", self.cfg.dst_port);
                // The banner comes from the probed port; the report keeps the replying one.
                let banner = self.banner.fetch(target, self.cfg.dst_port).await?;
                Ok(Some(ScanResult::new(target, port, banner)))
            }
        }
    }

    async fn resolve_and_probe(
        &self,
        channel: &mut dyn CaptureChannel,
        target: Ipv4Addr,
        route: &RouteInfo,
    ) -> Result<Verdict, ScanError> {
        let dst_mac = self.resolver.resolve(channel, target, route).await?;
        self.prober
            .probe(channel, target, route, dst_mac, self.cfg.dst_port)
            .await
    }

    /// Starts one task per target and streams their outcomes.
    ///
    /// With `max_in_flight` set, at most that many targets are scanned at once.
    pub fn spawn_scans(self: Arc<Self>, targets: Vec<Ipv4Addr>) -> mpsc::UnboundedReceiver<ScanEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let limiter = self.cfg.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));

        for target in targets {
            let scanner = Arc::clone(&self);
            let tx = tx.clone();
            let limiter = limiter.clone();

            tokio::spawn(async move {
                let _permit = match limiter {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                let outcome = scanner.scan_one(target).await;
                let _ = tx.send(ScanEvent { target, outcome });
            });
        }

        rx
    }
}

/// Reads frames until `matcher` accepts one or `deadline` passes.
///
/// Each read blocks for at most `poll`, so the deadline is honoured on a
/// silent link. Frames the matcher rejects are dropped.
pub(crate) async fn receive_until<T, F>(
    channel: &mut dyn CaptureChannel,
    deadline: Instant,
    poll: Duration,
    mut matcher: F,
) -> Result<Option<T>, ChannelError>
where
    F: FnMut(&CapturedFrame<'_>) -> Option<T>,
{
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }

        let Some(bytes) = channel.next_frame(poll.min(deadline - now)).await? else {
            continue;
        };
        if let Some(found) = CapturedFrame::new(&bytes).and_then(|frame| matcher(&frame)) {
            return Ok(Some(found));
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
