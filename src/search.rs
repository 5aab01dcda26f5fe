//! The batched nonce search loop.

use crate::apply::splice_nonce;
use crate::backend::{ComputeBackend, SearchJob};
use crate::commit::sha1_digest;
use crate::error::{Error, Result};
use crate::nonce::Nonce;
use crate::progress::ProgressStats;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default number of nonces per batch (the OpenCL global work size).
pub const GLOBAL_SIZE: u32 = 4 * 1024 * 1024;

/// Default OpenCL work-group size.
pub const WORK_SIZE: u32 = 64;

/// Minimum time between two progress reports.
pub const MIN_PROGRESS_RESOLUTION: Duration = Duration::from_secs(1);

/// Tunables of a search. These never change the result, only how fast it
/// arrives and how much gets logged on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Nonces per batch
    pub global_size: u32,
    /// Work-group size; `global_size` has to be a multiple of it
    pub work_size: u32,
    /// Suppresses progress reports
    pub quiet: bool,
    pub min_progress_resolution: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            global_size: GLOBAL_SIZE,
            work_size: WORK_SIZE,
            quiet: false,
            min_progress_resolution: MIN_PROGRESS_RESOLUTION,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.global_size == 0 {
            return Err(Error::invalid_config("global size must be positive"));
        }
        if self.work_size == 0 {
            return Err(Error::invalid_config("work size must be positive"));
        }
        if self.global_size % self.work_size != 0 {
            return Err(Error::invalid_config(format!(
                "global size {} must be a multiple of work size {}",
                self.global_size, self.work_size
            )));
        }
        Ok(())
    }
}

/// The half-open range of nonces to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchSpace {
    pub start: u64,
    /// Exclusive upper bound; `None` searches up to and including `u64::MAX`.
    pub stop: Option<u64>,
}

impl SearchSpace {
    /// Every nonce from `start` to the end of the 64-bit range.
    pub fn starting_at(start: u64) -> Self {
        Self { start, stop: None }
    }

    pub fn new(start: u64, stop: u64) -> Self {
        Self {
            start,
            stop: Some(stop),
        }
    }

    fn end(&self) -> u128 {
        self.stop.map_or(1u128 << 64, u128::from)
    }

    /// Number of nonces in the range.
    pub fn len(&self) -> u128 {
        self.end().saturating_sub(self.start as u128)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The size of the batch starting at `current`, clamped to the range.
    fn batch_size_at(&self, current: u64, global_size: u32) -> Option<u32> {
        let remaining = self.end().saturating_sub(current as u128);
        if remaining == 0 {
            None
        } else {
            Some(remaining.min(global_size as u128) as u32)
        }
    }

    fn describe_stop(&self) -> String {
        match self.stop {
            Some(stop) => format!("{:016X}", stop),
            None => "2^64".to_owned(),
        }
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Nonce),
    /// Every nonce in the range was tried without a match.
    Exhausted { completed: u64 },
}

impl SearchOutcome {
    /// Turns exhaustion into `Error::NotFound`.
    pub fn into_result(self, space: &SearchSpace) -> Result<Nonce> {
        match self {
            SearchOutcome::Found(nonce) => Ok(nonce),
            SearchOutcome::Exhausted { .. } => Err(Error::NotFound {
                start: space.start,
                stop: space.describe_stop(),
            }),
        }
    }
}

/// Walks a search space batch by batch on a compute backend.
///
/// Batches run one after the other: a batch is only dispatched once the
/// previous one has completed without a match.
pub struct SearchDriver<'a> {
    backend: &'a dyn ComputeBackend,
    config: SearchConfig,
}

impl<'a> SearchDriver<'a> {
    pub fn new(backend: &'a dyn ComputeBackend, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { backend, config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Searches `space` for a nonce that gives `job` its target prefix.
    ///
    /// Every nonce reported by the backend is checked again on the host before
    /// it is returned.
    pub fn search(&self, job: &SearchJob, space: SearchSpace) -> Result<SearchOutcome> {
        info!("Using device: {}", self.backend.describe());

        let mut evaluator = self.backend.prepare(job)?;
        let mut stats = ProgressStats::new(
            job.target().precision_bits(),
            self.config.min_progress_resolution,
        );

        let mut current = space.start;
        let mut completed: u64 = 0;
        let mut found: Option<Nonce> = None;

        while let Some(batch_size) = space.batch_size_at(current, self.config.global_size) {
            let batch_started = Instant::now();
            let result = evaluator.evaluate_batch(current, batch_size)?;
            let batch_duration = batch_started.elapsed();
            completed = completed.saturating_add(batch_size as u64);

            debug!(
                batch_start = %Nonce(current),
                batch_size,
                ?batch_duration,
                "batch finished"
            );

            if let Some(nonce) = result {
                check_reported_nonce(job, nonce, current, batch_size)?;
                found = Some(nonce);
                break;
            }

            let report = stats.record_batch(batch_size as u64, completed, batch_duration, Instant::now());
            if let Some(report) = report.filter(|_| !self.config.quiet) {
                info!("{}", report);
            }

            match current.checked_add(batch_size as u64) {
                Some(next) => current = next,
                None => break,
            }
        }

        Ok(match found {
            Some(nonce) => SearchOutcome::Found(nonce),
            None => SearchOutcome::Exhausted { completed },
        })
    }
}

fn check_reported_nonce(job: &SearchJob, nonce: Nonce, batch_start: u64, batch_size: u32) -> Result<()> {
    if nonce.0 < batch_start || nonce.0 - batch_start >= batch_size as u64 {
        return Err(Error::backend(format!(
            "reported nonce {} lies outside the batch starting at {}",
            nonce,
            Nonce(batch_start)
        )));
    }

    let data = splice_nonce(job.message().message(), job.placeholder_offset(), nonce);
    if !job.target().matches_bytes(&sha1_digest(&data)) {
        return Err(Error::backend(format!(
            "reported nonce {} does not produce the prefix '{}'. The backend's SHA1 or nonce \
            encoding has diverged from the reference implementation",
            nonce,
            job.target()
        )));
    }

    Ok(())
}
