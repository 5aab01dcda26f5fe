use super::{BatchEvaluator, Block, ComputeBackend, SearchJob};
use crate::error::{Error, Result};
use crate::nonce::Nonce;
use crate::padding::BLOCK_LENGTH;
use crate::target::Target;
use sha1::compress;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::{spawn, JoinHandle},
};

// How many candidates a thread tests between looks at the other threads' results.
const CANCEL_CHECK_INTERVAL: u64 = 1 << 12;

/// Searches on all physical CPU cores.
///
/// Unlike a GPU, this backend always reports the lowest matching nonce of a
/// batch, so its results are reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuBackend {
    threads: usize,
}

/// A view of a `PreprocessedMessage`, with cached SHA1 state.
///
/// SHA1 processes its input in 64-byte blocks, and the state after a block only
/// depends on the state before it and the block's contents. Every block before
/// the one containing the placeholder is the same for all nonces, so the state
/// after those "static blocks" is computed once, and each candidate only
/// recompresses the "dynamic blocks" from the placeholder onwards. For a commit
/// of average size this skips most of the hashing work.
#[derive(Debug, Clone)]
struct PartiallyHashedMessage {
    intermediate_sha1_state: [u32; 5],
    dynamic_blocks: Vec<Block>,
    /// Placeholder position relative to the first dynamic block
    placeholder_offset: usize,
}

struct CpuEvaluator {
    threads: usize,
    partially_hashed_message: PartiallyHashedMessage,
    target: Target,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::with_threads(num_cpus::get_physical())
    }

    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn describe(&self) -> String {
        format!("CPU ({} threads)", self.threads)
    }

    fn prepare<'a>(&'a self, job: &'a SearchJob) -> Result<Box<dyn BatchEvaluator + 'a>> {
        Ok(Box::new(CpuEvaluator {
            threads: self.threads,
            partially_hashed_message: PartiallyHashedMessage::new(job),
            target: *job.target(),
        }))
    }
}

impl BatchEvaluator for CpuEvaluator {
    fn evaluate_batch(&mut self, batch_start: u64, batch_size: u32) -> Result<Option<Nonce>> {
        let lowest_match = Arc::new(AtomicU64::new(u64::MAX));

        let handles = split_batch(batch_start, batch_size as u64, self.threads as u64)
            .map(|(start, count)| {
                let message = self.partially_hashed_message.clone();
                let target = self.target;
                let lowest_match = Arc::clone(&lowest_match);

                spawn(move || search_single_threaded(message, target, start, count, &lowest_match))
            })
            .collect::<Vec<JoinHandle<Option<Nonce>>>>();

        let mut found = Vec::with_capacity(handles.len());
        for handle in handles {
            found.push(
                handle
                    .join()
                    .map_err(|_| Error::backend("a CPU search thread panicked"))?,
            );
        }

        Ok(found.into_iter().flatten().min())
    }
}

/// Splits `count` nonces starting at `start` into `divisor` contiguous ranges,
/// given as `(start, count)`. Ranges are never empty; if the work can't be
/// divided evenly, the last range gets the slack.
pub(crate) fn split_batch(start: u64, count: u64, divisor: u64) -> impl Iterator<Item = (u64, u64)> {
    let divisor = divisor.clamp(1, count.max(1));
    let amount_per_worker = count / divisor;
    (0..divisor)
        .map(move |index| {
            let range_start = start + index * amount_per_worker;
            let range_count = if index < divisor - 1 {
                amount_per_worker
            } else {
                count - index * amount_per_worker
            };
            (range_start, range_count)
        })
        .filter(|&(_, range_count)| range_count > 0)
}

// Tests candidates in increasing order and stops at the first match, or once
// another thread has found a lower one.
#[inline(never)]
fn search_single_threaded(
    mut message: PartiallyHashedMessage,
    target: Target,
    start: u64,
    count: u64,
    lowest_match: &AtomicU64,
) -> Option<Nonce> {
    for index in 0..count {
        let candidate = start + index;

        if index % CANCEL_CHECK_INTERVAL == 0 && candidate > lowest_match.load(Ordering::Relaxed) {
            break;
        }

        message.insert_nonce(Nonce(candidate));
        if target.matches(&message.current_hash()) {
            lowest_match.fetch_min(candidate, Ordering::Relaxed);
            return Some(Nonce(candidate));
        }
    }

    None
}

impl PartiallyHashedMessage {
    fn new(job: &SearchJob) -> Self {
        Self {
            intermediate_sha1_state: job.intermediate_sha1_state(),
            dynamic_blocks: job
                .dynamic_blocks()
                .chunks_exact(BLOCK_LENGTH)
                .map(Block::clone_from_slice)
                .collect(),
            placeholder_offset: job.dynamic_placeholder_offset(),
        }
    }

    // This should be kept in sync with the nonce encoding in `sha1_prefix_search.cl`.
    #[inline(always)]
    fn insert_nonce(&mut self, nonce: Nonce) {
        for (index, &digit) in (self.placeholder_offset..).zip(nonce.to_hex_bytes().iter()) {
            self.dynamic_blocks[index / BLOCK_LENGTH][index % BLOCK_LENGTH] = digit;
        }
    }

    #[inline(always)]
    fn current_hash(&self) -> [u32; 5] {
        let mut sha1_hash = self.intermediate_sha1_state;
        compress(&mut sha1_hash, &self.dynamic_blocks);
        sha1_hash
    }
}
