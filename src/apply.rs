//! Writing a found nonce back into the commit.

use crate::commit::{sha1_digest, strip_commit_header, to_hex, PreparedCommit};
use crate::error::{Error, Result};
use crate::nonce::{Nonce, NONCE_HEX_LENGTH};
use crate::target::Target;

/// The result of a successful search
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VanityCommit {
    /// The nonce that was written into the commit
    pub nonce: Nonce,
    /// The git commit that has the desired hash, without git's object header
    pub object: Vec<u8>,
    /// The hash of the commit, as a hex string
    pub hash: String,
}

/// Returns a copy of `data` with the 16 bytes at `offset` replaced by `nonce`.
pub fn splice_nonce(data: &[u8], offset: usize, nonce: Nonce) -> Vec<u8> {
    let mut spliced = data.to_vec();
    spliced[offset..offset + NONCE_HEX_LENGTH].copy_from_slice(&nonce.to_hex_bytes());
    spliced
}

impl VanityCommit {
    /// Writes `nonce` into the placeholder and drops the object header.
    pub fn new(prepared: &PreparedCommit, nonce: Nonce) -> Self {
        let framed = splice_nonce(prepared.data(), prepared.placeholder_offset(), nonce);
        let hash = to_hex(&sha1_digest(&framed));

        Self {
            nonce,
            object: strip_commit_header(&framed).to_vec(),
            hash,
        }
    }

    /// Like `new`, but fails unless the commit hash actually starts with `target`.
    pub fn verified(prepared: &PreparedCommit, nonce: Nonce, target: &Target) -> Result<Self> {
        let commit = Self::new(prepared, nonce);
        if commit.hash.starts_with(&target.to_string()) {
            Ok(commit)
        } else {
            Err(Error::VerificationFailed {
                expected: target.to_string(),
                actual: commit.hash,
            })
        }
    }
}
