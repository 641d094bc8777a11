use std::time::Duration;

/// TCP port probed when nothing else is requested.
pub const DEFAULT_DST_PORT: u16 = 22;

/// Source port stamped on every SYN probe. Lies above the usual ephemeral
/// ranges so replies cannot be confused with the kernel's own connections.
pub const PROBE_SRC_PORT: u16 = 63323;

/// Deadline for both the ARP exchange and the SYN/SYN+ACK exchange.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(3);

/// Upper bound for a single capture read, so deadlines are observed on idle links.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for connecting to the service and reading its greeting.
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(5);

/// Placeholder used in a report when no greeting line could be read.
pub const NO_BANNER: &str = "Unable to get banner";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Port the SYN probe is sent to and the banner is read from.
    pub dst_port: u16,
    /// Fixed source port of the probe.
    pub src_port: u16,
    /// How long to wait for an ARP reply after sending the request.
    pub resolve_timeout: Duration,
    /// How long to wait for a SYN+ACK after sending the probe.
    pub probe_timeout: Duration,
    /// Maximum blocking time of one capture read.
    pub poll_interval: Duration,
    /// Bound on the banner connection (connect and first line).
    pub banner_timeout: Duration,
    /// Number of SYN probes per target. Each attempt gets its own deadline.
    pub attempts: u8,
    /// Caps the number of targets scanned at once. `None` scans every target concurrently.
    pub max_in_flight: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            dst_port: DEFAULT_DST_PORT,
            src_port: PROBE_SRC_PORT,
            resolve_timeout: REPLY_TIMEOUT,
            probe_timeout: REPLY_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            banner_timeout: BANNER_TIMEOUT,
            attempts: 1,
            max_in_flight: None,
        }
    }
}

impl ScanConfig {
    pub fn with_port(mut self, dst_port: u16) -> Self {
        self.dst_port = dst_port;
        self
    }

    /// Applies the same deadline to resolution and probing.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self.probe_timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.max_in_flight = limit.filter(|n| *n > 0);
        self
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
