use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

static SPINNER: OnceLock<ProgressBar> = OnceLock::new();

/// Shows the progress spinner on stderr. `hidden` keeps it invisible.
pub fn start(total: usize, hidden: bool) {
    let pb = SPINNER.get_or_init(|| init_spinner(hidden));
    set_progress(0, total);
    if !pb.is_hidden() {
        pb.enable_steady_tick(Duration::from_millis(100));
    }
}

fn init_spinner(hidden: bool) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    if hidden {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);
    pb.set_style(style);
    pb
}

pub fn set_progress(done: usize, total: usize) {
    if let Some(pb) = SPINNER.get() {
        pb.set_message(progress_message(done, total));
    }
}

fn progress_message(done: usize, total: usize) -> String {
    format!(
        "{} of {} target(s) scanned...",
        done.to_string().green().bold(),
        total
    )
}

pub fn finish() {
    if let Some(pb) = SPINNER.get() {
        pb.finish_and_clear();
    }
}

/// Runs `f` with the spinner temporarily erased, so output does not tear it.
pub fn suspend<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    match SPINNER.get() {
        Some(pb) => pb.suspend(f),
        None => f(),
    }
}

/// Log sink on stderr that keeps log lines above the spinner.
pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
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

    #[test]
    fn progress_message_counts_targets() {
        colored::control::set_override(false);
        assert_eq!(progress_message(3, 16), "3 of 16 target(s) scanned...");
    }

    #[test]
    fn suspend_without_spinner_just_runs() {
        assert_eq!(suspend(|| 7), 7);
    }
}
