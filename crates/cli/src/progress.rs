use std::io::IsTerminal;

use branchwatch_monitor::{ProgressSink, TracingProgress};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TEMPLATE: &str = "{spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {msg}";

/// Progress bar on stderr, out of 100.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    /// Hidden under `--quiet` or when stderr is not a terminal.
    pub fn new(quiet: bool) -> Self {
        let target = if quiet || !std::io::stderr().is_terminal() {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        let bar = ProgressBar::with_draw_target(Some(100), target);
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style.progress_chars("█▓▒░"));
        }
        TerminalProgress { bar }
    }
}

impl ProgressSink for TerminalProgress {
    fn update(&mut self, percent: u8, label: &str) {
        self.bar.set_position(u64::from(percent));
        self.bar.set_message(label.to_string());
        if percent >= 100 {
            self.bar.finish_and_clear();
        }
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// The bar when stderr is a terminal. Redirected runs get `tracing` debug
/// events instead.
pub fn sink(quiet: bool) -> Box<dyn ProgressSink> {
    if !quiet && !std::io::stderr().is_terminal() {
        Box::new(TracingProgress)
    } else {
        Box::new(TerminalProgress::new(quiet))
    }
}
