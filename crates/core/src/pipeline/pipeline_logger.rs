use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for pipeline events.
///
/// Keeps the frame processor free of output concerns so the CLI and tests
/// can observe it differently.
pub trait PipelineLogger: Send {
    /// Report how many frames have been processed so far. A live stream has
    /// no known total.
    fn progress(&mut self, processed: u64);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a per-frame metric (e.g. face count).
    fn metric(&mut self, name: &str, value: f64);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _processed: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// CLI-oriented logger that tracks per-stage timing and metrics and
/// reports a summary when the run ends.
///
/// Progress lines are throttled to every `throttle_frames` frames.
pub struct StdoutPipelineLogger {
    throttle_frames: u64,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    processed: u64,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            processed: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.processed;
        let mut lines = Vec::new();

        lines.push(format!(
            "Pipeline summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let avg = mean(&self.metrics[name]);
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, processed: u64) {
        self.processed = processed;
        if processed % self.throttle_frames == 0 {
            let secs = self.start_time.elapsed().as_secs_f64();
            log::info!("Processed {processed} frames ({secs:.1}s)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
