//! Access to the git repository whose HEAD gets rewritten.

use crate::commit::CommitterIdentity;
use crate::error::{Error, Result};
use crate::nonce::Nonce;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// The repository operations a vanity run needs.
///
/// Failures are passed through as they are; nothing here retries.
pub trait Repository {
    /// The raw HEAD commit object, without git's object header.
    fn read_head(&self) -> Result<Vec<u8>>;

    /// Amends HEAD with the committer name `<name> <nonce>`, keeping the
    /// committer's email and date and the commit's message.
    fn amend_with_committer(&self, identity: &CommitterIdentity, nonce: Nonce) -> Result<()>;

    /// Stores a raw commit object and returns its id.
    fn write_raw_object(&self, object: &[u8]) -> Result<String>;

    fn update_ref(&self, name: &str, id: &str) -> Result<()>;

    /// The id HEAD currently resolves to.
    fn head_id(&self) -> Result<String>;
}

/// A repository accessed by running the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    /// Directory to run git in; the current directory if `None`
    work_dir: Option<PathBuf>,
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: Some(work_dir.into()),
        }
    }

    fn spawn_git(&self, args: &[&str], stdin: Option<&[u8]>, env: &[(&str, String)]) -> Result<Vec<u8>> {
        let command = format!("git {}", args.join(" "));
        debug!(%command, "running git");

        let mut git = Command::new("git");
        git.args(args)
            .envs(env.iter().map(|(key, value)| (*key, value)))
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(work_dir) = &self.work_dir {
            git.current_dir(work_dir);
        }

        let io_error = |source: std::io::Error| Error::Git {
            command: command.clone(),
            source,
        };

        let mut child = git.spawn().map_err(io_error)?;
        if let (Some(input), Some(mut child_stdin)) = (stdin, child.stdin.take()) {
            child_stdin.write_all(input).map_err(io_error)?;
        }

        let output = child.wait_with_output().map_err(io_error)?;

        if !output.status.success() {
            return Err(Error::GitStatus {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(output.stdout)
    }
}

impl Repository for GitCli {
    fn read_head(&self) -> Result<Vec<u8>> {
        self.spawn_git(&["cat-file", "-p", "HEAD"], None, &[])
    }

    fn amend_with_committer(&self, identity: &CommitterIdentity, nonce: Nonce) -> Result<()> {
        if [&identity.name, &identity.email, &identity.date]
            .iter()
            .any(|field| std::str::from_utf8(field).is_err())
        {
            warn!("committer identity is not valid UTF-8; the amended commit may hash differently");
        }

        let env = [
            (
                "GIT_COMMITTER_NAME",
                format!("{} {}", String::from_utf8_lossy(&identity.name), nonce),
            ),
            (
                "GIT_COMMITTER_EMAIL",
                String::from_utf8_lossy(&identity.email).into_owned(),
            ),
            (
                "GIT_COMMITTER_DATE",
                String::from_utf8_lossy(&identity.date).into_owned(),
            ),
        ];

        self.spawn_git(&["commit", "--amend", "--no-edit", "-c", "HEAD"], None, &env)
            .map(|_| ())
    }

    fn write_raw_object(&self, object: &[u8]) -> Result<String> {
        let id = self.spawn_git(&["hash-object", "-w", "-t", "commit", "--stdin"], Some(object), &[])?;
        Ok(String::from_utf8_lossy(&id).trim().to_owned())
    }

    fn update_ref(&self, name: &str, id: &str) -> Result<()> {
        self.spawn_git(&["update-ref", name, id], None, &[]).map(|_| ())
    }

    fn head_id(&self) -> Result<String> {
        let id = self.spawn_git(&["rev-parse", "HEAD"], None, &[])?;
        Ok(String::from_utf8_lossy(&id).trim().to_owned())
    }
}
