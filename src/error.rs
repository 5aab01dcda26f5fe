//! Error types for vanity commit searches.

use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias for git-vanity operations
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between reading HEAD and writing the new commit.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The committer line is missing from the headers, or does not follow
    /// `committer <name> <<email>> <date>`
    #[error("{}", describe_committer_problem(.line))]
    MalformedCommitter {
        /// The offending line, lossily decoded; `None` if there is no committer line
        line: Option<String>,
    },

    /// The commit object is structurally unusable
    #[error("malformed commit object: {reason}")]
    MalformedCommit {
        /// What was missing or out of place
        reason: String,
    },

    /// The requested hash prefix is not a hex string of at most 40 digits
    #[error("invalid hash prefix '{prefix}': {reason}")]
    InvalidPrefix {
        /// The prefix as supplied
        prefix: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// The search configuration cannot be dispatched
    #[error("invalid search configuration: {reason}")]
    InvalidConfig {
        /// Which constraint was violated
        reason: String,
    },

    /// The whole `[start, stop)` range was searched without a match
    #[error("unable to find matching prefix in nonce range [{start:016X}, {stop})")]
    NotFound {
        /// First nonce of the exhausted range
        start: u64,
        /// End of the exhausted range, already formatted
        stop: String,
    },

    /// The compute backend failed to initialize or to run a batch
    #[error("compute backend failure: {0}")]
    Backend(String),

    /// The final object does not hash to the requested prefix
    #[error("self-check failed: expected a hash starting with '{expected}', got '{actual}'")]
    VerificationFailed {
        /// The requested prefix
        expected: String,
        /// The hash that was actually computed
        actual: String,
    },

    /// A git command could not be spawned or fed
    #[error("failed to run `{command}`: {source}")]
    Git {
        /// The command line that failed
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A git command ran but exited unsuccessfully
    #[error("`{command}` exited with {status}: {stderr}")]
    GitStatus {
        /// The command line that failed
        command: String,
        /// Exit status reported by the process
        status: ExitStatus,
        /// Whatever git printed on stderr
        stderr: String,
    },
}

#[cfg(feature = "opencl")]
impl From<ocl::Error> for Error {
    fn from(error: ocl::Error) -> Self {
        Self::Backend(error.to_string())
    }
}

impl Error {
    /// Creates a new malformed committer error
    pub fn malformed_committer(line: &[u8]) -> Self {
        Self::MalformedCommitter {
            line: Some(String::from_utf8_lossy(line).into_owned()),
        }
    }

    /// Creates a malformed committer error for headers without a committer line
    pub fn missing_committer() -> Self {
        Self::MalformedCommitter { line: None }
    }

    /// Creates a new malformed commit error
    pub fn malformed_commit(reason: impl Into<String>) -> Self {
        Self::MalformedCommit {
            reason: reason.into(),
        }
    }

    /// Creates a new invalid prefix error
    pub fn invalid_prefix(prefix: &str, reason: &'static str) -> Self {
        Self::InvalidPrefix {
            prefix: prefix.to_owned(),
            reason,
        }
    }

    /// Creates a new invalid config error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Creates a new backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Returns true if the search can be resumed from a later `start`
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn describe_committer_problem(line: &Option<String>) -> String {
    match line {
        Some(line) => format!("unable to parse committer line `{}'", line),
        None => "commit headers contain no committer line".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::malformed_committer(b"committer nobody");
        assert_eq!(
            err.to_string(),
            "unable to parse committer line `committer nobody'"
        );
        assert_eq!(
            Error::missing_committer().to_string(),
            "commit headers contain no committer line"
        );

        let err = Error::NotFound {
            start: 0xabc,
            stop: "2^64".to_owned(),
        };
        assert!(err.to_string().contains("0000000000000ABC"));
        assert!(err.to_string().contains("2^64"));
    }

    #[test]
    fn test_is_resumable() {
        assert!(Error::NotFound {
            start: 0,
            stop: "100".to_owned()
        }
        .is_resumable());
        assert!(!Error::backend("device lost").is_resumable());
        assert!(!Error::malformed_commit("no body").is_resumable());
    }
}
