//! Compute backends that evaluate batches of candidate nonces.
//!
//! The search loop only ever talks to a [`ComputeBackend`], so the hashing can
//! run on CPU threads ([`cpu::CpuBackend`]) or, with the `opencl` feature, on a
//! GPU ([`opencl::OpenClBackend`]).

use crate::error::{Error, Result};
use crate::nonce::{Nonce, NONCE_HEX_LENGTH};
use crate::padding::{PreprocessedMessage, BLOCK_LENGTH};
use crate::target::Target;
use sha1::{
    compress,
    digest::{generic_array::GenericArray, BlockInput},
    Sha1,
};

pub mod cpu;
#[cfg(feature = "opencl")]
pub mod opencl;

pub use cpu::CpuBackend;
#[cfg(feature = "opencl")]
pub use opencl::OpenClBackend;

pub(crate) type Block = GenericArray<u8, <Sha1 as BlockInput>::BlockSize>;

pub(crate) const SHA1_INITIAL_STATE: [u32; 5] = [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476, 0xc3d2e1f0];

/// Everything a backend needs to know to test nonces, fixed for a whole search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchJob {
    message: PreprocessedMessage,
    placeholder_offset: usize,
    target: Target,
}

impl SearchJob {
    /// Fails if the placeholder does not lie entirely inside the unpadded message.
    pub fn new(message: PreprocessedMessage, placeholder_offset: usize, target: Target) -> Result<Self> {
        let fits = placeholder_offset
            .checked_add(NONCE_HEX_LENGTH)
            .map_or(false, |end| end <= message.message_len());
        if !fits {
            return Err(Error::invalid_config(format!(
                "placeholder at offset {} does not fit in a message of {} bytes",
                placeholder_offset,
                message.message_len()
            )));
        }

        Ok(Self {
            message,
            placeholder_offset,
            target,
        })
    }

    pub fn message(&self) -> &PreprocessedMessage {
        &self.message
    }

    pub fn placeholder_offset(&self) -> usize {
        self.placeholder_offset
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The number of leading blocks that end before the placeholder's block.
    /// They hash the same way for every nonce.
    pub fn num_static_blocks(&self) -> usize {
        self.placeholder_offset / BLOCK_LENGTH
    }

    /// SHA1 state after compressing the static blocks.
    pub fn intermediate_sha1_state(&self) -> [u32; 5] {
        let message: &[u8] = &self.message;
        let static_blocks = message[..self.num_static_blocks() * BLOCK_LENGTH]
            .chunks_exact(BLOCK_LENGTH)
            .map(Block::clone_from_slice)
            .collect::<Vec<_>>();

        let mut state = SHA1_INITIAL_STATE;
        compress(&mut state, &static_blocks);
        state
    }

    /// The padded message from the placeholder's block onwards.
    pub fn dynamic_blocks(&self) -> &[u8] {
        let message: &[u8] = &self.message;
        &message[self.num_static_blocks() * BLOCK_LENGTH..]
    }

    /// The placeholder's position within [`SearchJob::dynamic_blocks`].
    pub fn dynamic_placeholder_offset(&self) -> usize {
        self.placeholder_offset % BLOCK_LENGTH
    }
}

/// The number of work items to launch for a batch: `batch_size` rounded up to
/// a whole number of work groups.
pub fn work_items_for_batch(batch_size: u32, work_size: u32) -> usize {
    let work_size = work_size.max(1) as usize;
    (batch_size as usize).div_ceil(work_size) * work_size
}

/// A device that can search for nonces.
pub trait ComputeBackend {
    /// Human-readable name of the device, for logging.
    fn describe(&self) -> String;

    /// Uploads or precomputes whatever stays constant across the batches of `job`.
    fn prepare<'a>(&'a self, job: &'a SearchJob) -> Result<Box<dyn BatchEvaluator + 'a>>;
}

/// A backend bound to one [`SearchJob`].
pub trait BatchEvaluator {
    /// Tests the nonces `batch_start..batch_start + batch_size`, each written
    /// as 16 uppercase hex digits at the job's placeholder offset, and returns
    /// one whose hash matches the target, if any does.
    ///
    /// Which match is returned when several nonces in the batch match is up to
    /// the backend.
    fn evaluate_batch(&mut self, batch_start: u64, batch_size: u32) -> Result<Option<Nonce>>;
}
