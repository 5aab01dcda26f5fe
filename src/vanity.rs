use crate::apply::VanityCommit;
use crate::backend::{ComputeBackend, SearchJob};
use crate::commit::{hash_git_commit, rewrite_committer, rewrite_raw, CommitterIdentity, PreparedCommit, Strategy};
use crate::error::Result;
use crate::search::{SearchConfig, SearchDriver, SearchSpace};
use crate::target::Target;
use crate::vcs::Repository;
use tracing::{info, warn};

/// Everything that decides what a run does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanityOptions {
    pub target: Target,
    pub strategy: Strategy,
    pub space: SearchSpace,
    pub search: SearchConfig,
    /// Whether to rewrite HEAD once a match is found
    pub write: bool,
}

impl VanityOptions {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            strategy: Strategy::default(),
            space: SearchSpace::default(),
            search: SearchConfig::default(),
            write: false,
        }
    }
}

/// The outcome of a successful run.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VanityRun {
    pub commit: VanityCommit,
    /// The new HEAD, if the commit was written to the repository
    pub written: Option<String>,
}

/// Finds a nonce that gives HEAD the target prefix and, if asked to, rewrites HEAD.
pub fn run(
    options: &VanityOptions,
    repository: &dyn Repository,
    backend: &dyn ComputeBackend,
) -> Result<VanityRun> {
    let driver = SearchDriver::new(backend, options.search)?;
    let current_commit = repository.read_head()?;

    info!(
        "Attempting to find sha1 prefix `{}'\nfor commit `{}'\n================\n{}================",
        options.target,
        hash_git_commit(&current_commit),
        String::from_utf8_lossy(&current_commit)
    );

    let (prepared, identity): (PreparedCommit, Option<CommitterIdentity>) = match options.strategy {
        Strategy::Committer => {
            let rewrite = rewrite_committer(&current_commit)?;
            (rewrite.prepared, Some(rewrite.identity))
        }
        Strategy::Raw => (rewrite_raw(&current_commit)?, None),
    };

    let job = SearchJob::new(prepared.preprocess(), prepared.placeholder_offset(), options.target)?;
    let nonce = driver.search(&job, options.space)?.into_result(&options.space)?;

    let commit = VanityCommit::verified(&prepared, nonce, &options.target)?;

    info!(
        "Found sha1 prefix `{}'\nwith sha1 `{}'\nUsing {}\n================\n{}================",
        options.target,
        commit.hash,
        commit.nonce,
        String::from_utf8_lossy(&commit.object)
    );

    if !options.write {
        info!("Changes not written to the repository.");
        return Ok(VanityRun {
            commit,
            written: None,
        });
    }

    info!("Writing changes to the repository...");
    match identity {
        Some(identity) => repository.amend_with_committer(&identity, commit.nonce)?,
        None => {
            let id = repository.write_raw_object(&commit.object)?;
            repository.update_ref("HEAD", &id)?;
        }
    }

    let head = repository.head_id()?;
    info!("Current HEAD: {}", head);
    if head != commit.hash {
        warn!(
            expected = %commit.hash,
            actual = %head,
            "git produced a different commit than the one that was searched for"
        );
    }

    Ok(VanityRun {
        commit,
        written: Some(head),
    })
}
