use std::time::Instant;

/// Observer for transcription runs.
///
/// Lets the CLI print a timing report while tests and embedding callers stay
/// silent, without the orchestrator knowing which one it talks to.
pub trait PipelineLogger: Send {
    /// Record how long a named stage took for one request.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (segment count, speaker count...).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit a report of everything recorded so far. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Accumulates stage timings and metrics, forwarding messages and the final
/// report to the `log` facade.
///
/// Stages keep the order in which they were first reported.
pub struct LogPipelineLogger {
    timings: Vec<(String, Vec<f64>)>,
    metrics: Vec<(String, f64)>,
    start_time: Instant,
    requests: usize,
}

impl LogPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: Vec::new(),
            metrics: Vec::new(),
            start_time: Instant::now(),
            requests: 0,
        }
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, values)| values.as_slice())
    }

    /// Latest value recorded for `name`.
    pub fn metric_value(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(metric, _)| metric == name)
            .map(|(_, value)| *value)
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Transcription summary ({} request(s), {:.1}s wall clock):",
            self.requests,
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:8.1}ms  total {total_ms:9.0}ms"
            ));
        }
        for (name, value) in &self.metrics {
            lines.push(format!("  {name}: {value}"));
        }

        Some(lines.join("\n"))
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        log::debug!("{stage} took {duration_ms:.1}ms");
        // The audio stage opens every request.
        if stage == "audio" {
            self.requests += 1;
        }
        match self.timings.iter_mut().find(|(name, _)| name == stage) {
            Some((_, values)) => values.push(duration_ms),
            None => self.timings.push((stage.to_string(), vec![duration_ms])),
        }
    }

    fn metric(&mut self, name: &str, value: f64) {
        match self.metrics.iter_mut().find(|(metric, _)| metric == name) {
            Some((_, current)) => *current = value,
            None => self.metrics.push((name.to_string(), value)),
        }
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
