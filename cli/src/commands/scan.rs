use std::sync::Arc;

use is_root::is_root;
use sshsweep_common::error::ScanError;
use sshsweep_common::network::target::{self, TargetList};
use sshsweep_core::report::ScanEvent;
use sshsweep_core::scanner::Scanner;
use tracing::{error, info, warn};

use super::CommandLine;
use crate::terminal::spinner;

pub async fn scan(cmd: &CommandLine) -> anyhow::Result<()> {
    let TargetList { addrs, rejected } = target::expand(&cmd.targets);
    for e in &rejected {
        error!("{e}");
    }
    if addrs.is_empty() {
        warn!("no valid targets, nothing to scan");
        return Ok(());
    }

    if !is_root() {
        warn!("not running as root: opening capture channels will most likely fail");
    }

    let cfg = cmd.scan_config();
    let total = addrs.len();
    info!("probing port {} on {total} target(s)", cfg.dst_port);

    let scanner = Arc::new(Scanner::system(cfg));
    spinner::start(total, cmd.quiet > 0);

    let mut events = scanner.spawn_scans(addrs);
    let mut done = 0;
    let mut open = 0;
    while let Some(event) = events.recv().await {
        done += 1;
        if event.is_open() {
            open += 1;
        }
        report(event);
        spinner::set_progress(done, total);
    }

    spinner::finish();
    info!("{open} of {total} target(s) answered");
    Ok(())
}

/// Prints the report line of an open target. Everything else goes to the log.
fn report(event: ScanEvent) {
    match event.outcome {
        Ok(Some(result)) => spinner::suspend(|| println!("{result}")),
        Ok(None) => {}
        Err(e @ ScanError::ResolutionTimeout { .. }) => warn!("skipping {}: {e}", event.target),
        Err(e) => error!("{}: {e}", event.target),
    }
}
