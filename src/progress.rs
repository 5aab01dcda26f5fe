//! Progress accounting for long-running searches.
//!
//! None of these numbers affect the search itself. They assume every attempt
//! independently matches with probability `2^-precision_bits`.

use std::fmt;
use std::time::{Duration, Instant};

/// Fraction of the expected number of attempts that `completed` represents.
///
/// This is the optimistic view where the search space is `2^precision_bits`
/// nonces and exactly one of them matches.
pub fn space_exhausted(completed: u64, precision_bits: u32) -> f64 {
    completed as f64 / 2f64.powi(precision_bits as i32)
}

/// Probability of having found at least one match after `completed` attempts,
/// i.e. `1 - (1 - 2^-precision_bits)^completed`.
pub fn success_probability(completed: u64, precision_bits: u32) -> f64 {
    if completed == 0 {
        return 0.0;
    }
    if precision_bits == 0 {
        return 1.0;
    }

    let miss_log = (-2f64.powi(-(precision_bits as i32))).ln_1p();
    -(completed as f64 * miss_log).exp_m1()
}

/// Throughput and probability estimates at one point of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    /// 1-based number of the batch that just finished
    pub iteration: u64,
    pub elapsed: Duration,
    /// Hashes per second of the batch that just finished
    pub last_rate: Option<f64>,
    /// Hashes per second since the search started
    pub average_rate: f64,
    pub space_exhausted: f64,
    pub probability: f64,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processing GS iteration {}", self.iteration)?;
        writeln!(f, "   Time:         {:.3?}", self.elapsed)?;
        match self.last_rate {
            Some(rate) => writeln!(
                f,
                "   Last Speed:   {:.4} MH/s     (Avg: {:.4} MH/s)",
                rate / 1e6,
                self.average_rate / 1e6
            )?,
            None => writeln!(f, "   Last Speed:   N/A MH/s      (Avg: N/A MH/s)")?,
        }
        writeln!(
            f,
            "   Tries remaining (optimistic):  {:.6}% ...",
            100.0 * (1.0 - self.space_exhausted)
        )?;
        write!(
            f,
            "   Chance (CDF):                  {:.6}% ...",
            100.0 * self.probability
        )
    }
}

/// Running statistics of a search, owned by the search loop.
#[derive(Debug)]
pub struct ProgressStats {
    precision_bits: u32,
    resolution: Duration,
    started: Instant,
    batches: u64,
    last_batch: Duration,
    last_report: Option<Instant>,
}

impl ProgressStats {
    pub fn new(precision_bits: u32, resolution: Duration) -> Self {
        Self::starting_at(precision_bits, resolution, Instant::now())
    }

    pub fn starting_at(precision_bits: u32, resolution: Duration, started: Instant) -> Self {
        Self {
            precision_bits,
            resolution,
            started,
            batches: 0,
            last_batch: Duration::ZERO,
            last_report: None,
        }
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn last_batch(&self) -> Duration {
        self.last_batch
    }

    /// Records a finished batch. Returns a report if at least `resolution`
    /// has passed since the previous one (or since the start, for the first).
    pub fn record_batch(
        &mut self,
        batch_size: u64,
        completed: u64,
        batch_duration: Duration,
        now: Instant,
    ) -> Option<ProgressReport> {
        self.batches += 1;
        self.last_batch = batch_duration;

        let since = self.last_report.unwrap_or(self.started);
        if now.saturating_duration_since(since) < self.resolution {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.started);
        let last_rate = match batch_duration.as_secs_f64() {
            seconds if seconds > 0.0 => Some(batch_size as f64 / seconds),
            _ => None,
        };
        let average_rate = match elapsed.as_secs_f64() {
            seconds if seconds > 0.0 => completed as f64 / seconds,
            _ => 0.0,
        };

        self.last_report = Some(now);

        Some(ProgressReport {
            iteration: self.batches,
            elapsed,
            last_rate,
            average_rate,
            space_exhausted: space_exhausted(completed, self.precision_bits),
            probability: success_probability(completed, self.precision_bits),
        })
    }
}
