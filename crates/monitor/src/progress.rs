//! Progress reporting for long-running checks.
//!
//! Checks report through a [`ProgressSink`] supplied by the caller. The
//! [`ProgressReporter`] in front of it clamps percentages to 100 and keeps
//! them from moving backwards within one run.

/// Receives progress updates. Implementations decide how to show them.
pub trait ProgressSink: Send {
    fn update(&mut self, percent: u8, label: &str);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _percent: u8, _label: &str) {}
}

/// Keeps every update, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedProgress {
    pub updates: Vec<(u8, String)>,
}

impl ProgressSink for RecordedProgress {
    fn update(&mut self, percent: u8, label: &str) {
        self.updates.push((percent, label.to_string()));
    }
}

/// Emits each update as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn update(&mut self, percent: u8, label: &str) {
        tracing::debug!(percent, "{}", label);
    }
}

/// Clamping, monotonic front for one run.
pub struct ProgressReporter<'a> {
    sink: &'a mut dyn ProgressSink,
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        ProgressReporter { sink, last: 0 }
    }

    pub fn report(&mut self, percent: u32, label: &str) {
        let clamped = percent.min(100) as u8;
        self.last = self.last.max(clamped);
        self.sink.update(self.last, label);
    }

    /// Progress through `done` of `total` steps, mapped onto `from..=to`.
    pub fn report_step(&mut self, from: u32, to: u32, done: usize, total: usize, label: &str) {
        let span = to.saturating_sub(from) as usize;
        let offset = if total == 0 { span } else { span * done.min(total) / total };
        self.report(from + offset as u32, label);
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_and_never_goes_back() {
        let mut sink = RecordedProgress::default();
        let mut reporter = ProgressReporter::new(&mut sink);
        reporter.report(40, "load");
        reporter.report(20, "late");
        reporter.report(250, "done");
        assert_eq!(reporter.last(), 100);
        let percents: Vec<u8> = sink.updates.iter().map(|(p, _)| *p).collect();
        assert_eq!(percents, vec![40, 40, 100]);
        assert_eq!(sink.updates[1].1, "late");
    }

    #[test]
    fn step_mapping() {
        let mut sink = RecordedProgress::default();
        let mut reporter = ProgressReporter::new(&mut sink);
        reporter.report_step(50, 99, 1, 4, "a");
        reporter.report_step(50, 99, 4, 4, "b");
        reporter.report_step(50, 99, 0, 0, "c");
        let percents: Vec<u8> = sink.updates.iter().map(|(p, _)| *p).collect();
        assert_eq!(percents, vec![62, 99, 99]);
    }
}
