//! Per-stage counters for one pipeline run.

use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMetrics {
    pub stage: &'static str,
    pub input: usize,
    pub output: usize,
    /// `output / input` as a percentage; 100 for an empty input.
    pub pass_rate: f64,
    pub elapsed_ms: u64,
}

impl StageMetrics {
    #[must_use]
    pub fn new(stage: &'static str, input: usize, output: usize, elapsed: Duration) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let pass_rate = if input == 0 {
            100.0
        } else {
            output as f64 / input as f64 * 100.0
        };
        Self {
            stage,
            input,
            output,
            pass_rate,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Collected metrics; serialized into `pipeline_runs.metrics`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    pub stages: Vec<StageMetrics>,
    pub saved: usize,
    pub duplicates: usize,
    pub save_failures: usize,
}

impl RunMetrics {
    /// Record a finished stage and log it.
    pub(crate) fn record(&mut self, stage: &'static str, input: usize, output: usize, started: Instant) {
        let m = StageMetrics::new(stage, input, output, started.elapsed());
        tracing::info!(
            stage = m.stage,
            input = m.input,
            output = m.output,
            pass_rate = m.pass_rate,
            elapsed_ms = m.elapsed_ms,
            "stage complete"
        );
        self.stages.push(m);
    }

    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageMetrics> {
        self.stages.iter().find(|s| s.stage == name)
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
