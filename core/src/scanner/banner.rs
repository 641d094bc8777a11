//! Service greeting retrieval.
//!
//! Runs after the SYN probe has confirmed the port. The kernel knows nothing
//! about the half-open probe, so this is a fresh, ordinary TCP connection.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sshsweep_common::error::ScanError;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

/// Longest greeting line accepted before giving up on finding its end.
const MAX_BANNER_LEN: u64 = 4096;

pub type BannerStream = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, addr: SocketAddrV4) -> io::Result<BannerStream>;
}

pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, addr: SocketAddrV4) -> io::Result<BannerStream> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Box::new(stream))
    }
}

pub struct BannerReader {
    dialer: Arc<dyn Dialer>,
    timeout: Duration,
}

impl BannerReader {
    pub fn new(dialer: Arc<dyn Dialer>, timeout: Duration) -> Self {
        Self { dialer, timeout }
    }

    /// Connects to `target:port` and returns the first line the service sends.
    ///
    /// A missing or incomplete line is `Ok(None)`. Only a failed connection
    /// is an error. Connect and read share one deadline of `timeout`.
    pub async fn fetch(&self, target: Ipv4Addr, port: u16) -> Result<Option<String>, ScanError> {
        let addr = SocketAddrV4::new(target, port);
        let deadline = Instant::now() + self.timeout;

        let stream = match timeout_at(deadline, self.dialer.dial(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ScanError::Connect { target, port, source }),
            Err(_elapsed) => {
                return Err(ScanError::Connect {
                    target,
                    port,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                });
            }
        };

        match timeout_at(deadline, read_banner(stream)).await {
            Ok(banner) => Ok(banner),
            Err(_elapsed) => {
                debug!("{addr} sent no greeting within {:?}", self.timeout);
                Ok(None)
            }
        }
    }
}

/// Reads one `\n` terminated line and strips the terminator (and a preceding `\r`).
pub async fn read_banner<R>(stream: R) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream.take(MAX_BANNER_LEN));
    let mut line: Vec<u8> = Vec::new();

    match reader.read_until(b'\n', &mut line).await {
        Ok(_) if line.last() == Some(&b'\n') => {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            Some(String::from_utf8_lossy(&line).into_owned())
        }
        Ok(n) => {
            debug!("greeting ended after {n} byte(s) without a line break");
            None
        }
        Err(e) => {
            debug!("reading greeting: {e}");
            None
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
