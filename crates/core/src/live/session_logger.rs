use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for live-session orchestration events.
///
/// Keeps the owner loop free of any particular output mechanism; the CLI
/// logs through the `log` facade, tests use [`NullSessionLogger`].
pub trait SessionLogger: Send {
    /// Record how long a named stage took (`detect`, `recognize`, `edges`).
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Count an occurrence (`cycles`, `skipped`, `recognition_failed`).
    fn count(&mut self, event: &str);

    fn info(&mut self, message: &str);

    /// Emit an end-of-session report. Default: no-op.
    fn summary(&self) {}
}

pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn count(&mut self, _event: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// `log`-backed logger that aggregates per-stage timings and event counts
/// and prints them when the session ends.
pub struct LogSessionLogger {
    timings: BTreeMap<String, Vec<f64>>,
    counts: BTreeMap<String, usize>,
    started: Instant,
}

impl LogSessionLogger {
    pub fn new() -> Self {
        Self {
            timings: BTreeMap::new(),
            counts: BTreeMap::new(),
            started: Instant::now(),
        }
    }

    pub fn count_of(&self, event: &str) -> usize {
        self.counts.get(event).copied().unwrap_or(0)
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    /// Returns the formatted report, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.counts.is_empty() {
            return None;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!("Live session summary ({elapsed:.1}s):")];

        for (stage, durations) in &self.timings {
            let total: f64 = durations.iter().sum();
            let avg = total / durations.len().max(1) as f64;
            let max = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:10}: avg {avg:6.1}ms  max {max:6.1}ms  ({} runs)",
                durations.len()
            ));
        }
        for (event, n) in &self.counts {
            lines.push(format!("  {event}: {n}"));
        }
        if let Some(cycles) = self.counts.get("cycles") {
            if elapsed > 0.0 {
                lines.push(format!("  Detection rate: {:.1} Hz", *cycles as f64 / elapsed));
            }
        }

        Some(lines.join("\n"))
    }
}

impl Default for LogSessionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLogger for LogSessionLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn count(&mut self, event: &str) {
        *self.counts.entry(event.to_string()).or_default() += 1;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
