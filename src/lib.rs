//! Make vanity git commits.
//!
//! A vanity commit is a commit whose hash starts with a chosen hex prefix. It is
//! found by brute force: a 16-digit hex nonce is written into the commit (into
//! the committer's name, or into an extra `vanity` header line) and candidates
//! are hashed until one of them produces the prefix.
//!
//! The pieces, in the order a run uses them:
//!
//! - [`commit`]: rewrites a commit so that it contains a nonce placeholder
//! - [`target`]: turns the hex prefix into the words and mask to compare against
//! - [`padding`]: applies SHA1 finalization padding once, up front
//! - [`search`]: dispatches batches of nonces to a [`backend`] and reports progress
//! - [`apply`]: writes the found nonce back into the commit
//! - [`vcs`]: reads and rewrites HEAD
//!
//! [`vanity::run`] ties them together.

pub mod apply;
pub mod backend;
pub mod commit;
pub mod error;
pub mod nonce;
pub mod padding;
pub mod progress;
pub mod search;
pub mod target;
pub mod vanity;
pub mod vcs;

pub use apply::VanityCommit;
pub use backend::{BatchEvaluator, ComputeBackend, CpuBackend, SearchJob};
#[cfg(feature = "opencl")]
pub use backend::OpenClBackend;
pub use commit::{hash_git_commit, CommitterIdentity, PreparedCommit, Strategy};
pub use error::{Error, Result};
pub use nonce::Nonce;
pub use padding::PreprocessedMessage;
pub use search::{SearchConfig, SearchDriver, SearchOutcome, SearchSpace};
pub use target::Target;
pub use vanity::{run, VanityOptions, VanityRun};
pub use vcs::{GitCli, Repository};
