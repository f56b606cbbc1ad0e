//! Report module: per-batch timing lines and the end-of-run summary.

use std::time::Duration;

/// Timing of one batch of probe executions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchTiming {
    pub elapsed: Duration,
    pub iterations: u64,
}

impl BatchTiming {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Executions per second, 0 when no time was measurable.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.iterations as f64 / secs
    }

    /// The line printed to stdout for each batch.
    pub fn line(&self) -> String {
        format!("time {:.0} ms rate {:.0}", self.elapsed_ms(), self.rate())
    }
}

/// Results of a whole benchmark run.
#[derive(Debug, Clone, Default)]
pub struct BenchReport {
    pub batches: Vec<BatchTiming>,
    /// Probe executions across all batches.
    pub executions: u64,
    /// Column 0 from the last execution, widened to `i64`.
    pub last_value: Option<i64>,
    /// Executions whose value did not fit in 32 bits.
    pub overflows: u64,
}

impl BenchReport {
    pub fn push(&mut self, timing: BatchTiming) {
        self.batches.push(timing);
    }

    pub fn mean_ms(&self) -> f64 {
        if self.batches.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.batches.iter().map(BatchTiming::elapsed_ms).sum();
        sum / self.batches.len() as f64
    }

    pub fn min_ms(&self) -> f64 {
        self.batches
            .iter()
            .map(BatchTiming::elapsed_ms)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    pub fn max_ms(&self) -> f64 {
        self.batches
            .iter()
            .map(BatchTiming::elapsed_ms)
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    pub fn percentile_ms(&self, pct: f64) -> f64 {
        if self.batches.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.batches.iter().map(BatchTiming::elapsed_ms).collect();
        sorted.sort_by(f64::total_cmp);
        let idx = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    /// Overall executions per second across all batches.
    pub fn mean_rate(&self) -> f64 {
        let total: Duration = self.batches.iter().map(|b| b.elapsed).sum();
        let iterations: u64 = self.batches.iter().map(|b| b.iterations).sum();
        BatchTiming {
            elapsed: total,
            iterations,
        }
        .rate()
    }
}

/// Log the run summary at info level; stdout is reserved for batch lines.
pub fn log_summary(report: &BenchReport) {
    log::info!(
        "{} batches, {} executions, {} overflowing",
        report.batches.len(),
        report.executions,
        report.overflows
    );
    log::info!(
        "batch ms: mean {:.2} min {:.2} p50 {:.2} max {:.2}",
        report.mean_ms(),
        report.min_ms(),
        report.percentile_ms(50.0),
        report.max_ms()
    );
    log::info!("mean rate {:.0}/s", report.mean_rate());
    if let Some(value) = report.last_value {
        log::info!("last value {value}");
    }
}
