//! Rewriting commit objects so that they contain a nonce placeholder.
//!
//! Both strategies produce a [`PreparedCommit`]: the commit object preceded by
//! git's object header (`"commit <length>\0"`), with a 16-byte region filled
//! with [`SENTINEL_BYTE`]s that the search later overwrites with a nonce.
//!
//! * [`rewrite_committer`] appends the nonce to the committer's name, so the
//!   result can be reproduced with a plain `git commit --amend`.
//! * [`rewrite_raw`] adds a `vanity` header line to the raw object, which has
//!   to be written to the object store directly.

use crate::error::{Error, Result};
use crate::nonce::{NONCE_HEX_LENGTH, SENTINEL_BYTE};
use crate::padding::PreprocessedMessage;
use sha1::{Digest, Sha1};
use std::ops::Range;

const COMMITTER_TOKEN: &[u8] = b"committer ";
const SIGNATURE_FOOTER: &[u8] = b" -----END PGP SIGNATURE-----";
const VANITY_HEADER_TOKEN: &[u8] = b"vanity ";
const VANITY_SIGNATURE_TOKEN: &[u8] = b" vanity";

/// How a commit gets modified to change its hash.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Strategy {
    /// Append the nonce to the committer's name.
    #[default]
    Committer,
    /// Insert a `vanity` line into the raw commit object.
    Raw,
}

/// A commit with git's object header and a sentinel-filled nonce placeholder.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PreparedCommit {
    /// The header followed by the commit. Hashing this gives the commit hash.
    data: Vec<u8>,
    /// Where the 16-byte placeholder begins, as an index into `data`.
    placeholder_offset: usize,
}

/// The committer of a commit, as parsed from its `committer` line.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommitterIdentity {
    pub name: Vec<u8>,
    pub email: Vec<u8>,
    /// Timestamp and timezone, e.g. `1700000000 +0000`
    pub date: Vec<u8>,
}

/// The output of the committer strategy.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommitterRewrite {
    pub prepared: PreparedCommit,
    /// The committer with any nonce from an earlier run removed from the name.
    pub identity: CommitterIdentity,
}

impl PreparedCommit {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn placeholder_offset(&self) -> usize {
        self.placeholder_offset
    }

    pub fn placeholder_range(&self) -> Range<usize> {
        self.placeholder_offset..self.placeholder_offset + NONCE_HEX_LENGTH
    }

    /// The commit object without git's header.
    pub fn commit(&self) -> &[u8] {
        strip_commit_header(&self.data)
    }

    /// The data with SHA1 finalization padding, ready to be searched.
    pub fn preprocess(&self) -> PreprocessedMessage {
        PreprocessedMessage::new(&self.data)
    }
}

/// Accumulates the lines of a rewritten commit and remembers where the
/// placeholder was put.
#[derive(Default)]
struct CommitBuilder {
    body: Vec<u8>,
    placeholder: Option<usize>,
}

impl CommitBuilder {
    fn push_line(&mut self, line: &[u8]) {
        self.body.extend_from_slice(line);
        self.body.push(b'\n');
    }

    fn push(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    fn push_placeholder(&mut self) {
        self.placeholder = Some(self.body.len());
        self.body.extend_from_slice(&[SENTINEL_BYTE; NONCE_HEX_LENGTH]);
    }

    fn finish(self) -> PreparedCommit {
        let mut data = commit_header(self.body.len());
        let header_len = data.len();
        data.extend(self.body);

        PreparedCommit {
            data,
            // Both strategies always push a placeholder
            placeholder_offset: header_len + self.placeholder.unwrap_or_default(),
        }
    }
}

/// Rebuilds the commit with a placeholder between the committer's name and email.
///
/// A 16-digit hex token that already precedes the email (left by an earlier
/// run) is dropped, so rewriting the output of a previous run produces the same
/// layout again instead of a growing name.
pub fn rewrite_committer(commit: &[u8]) -> Result<CommitterRewrite> {
    let lines = split_lines(commit);

    let committer_index = header_lines(&lines)
        .iter()
        .position(|line| line.starts_with(COMMITTER_TOKEN))
        .ok_or_else(Error::missing_committer)?;

    let identity = parse_committer_line(lines[committer_index])?;

    let mut builder = CommitBuilder::default();
    for line in &lines[..committer_index] {
        builder.push_line(line);
    }

    builder.push(COMMITTER_TOKEN);
    builder.push(&identity.name);
    builder.push(b" ");
    builder.push_placeholder();
    builder.push(b" <");
    builder.push(&identity.email);
    builder.push(b"> ");
    builder.push_line(&identity.date);

    for line in &lines[committer_index + 1..] {
        builder.push_line(line);
    }

    Ok(CommitterRewrite {
        prepared: builder.finish(),
        identity,
    })
}

/// Rebuilds the commit with a `vanity` line at the end of its headers.
///
/// For GPG-signed commits the line goes just before the end of the signature
/// block, as a continuation line (` vanity...`), since a signature has to stay
/// the last header. If the line right before the insertion point is a vanity
/// line from an earlier run, it is replaced rather than kept.
pub fn rewrite_raw(commit: &[u8]) -> Result<PreparedCommit> {
    let mut lines = split_lines(commit);

    let header_end = lines
        .iter()
        .position(|line| line.is_empty())
        .ok_or_else(|| Error::malformed_commit("no blank line between headers and message"))?;
    if header_end == 0 {
        return Err(Error::malformed_commit("commit has no headers"));
    }

    let (mut insert_index, vanity_token) = if lines[header_end - 1] == SIGNATURE_FOOTER {
        (header_end - 1, VANITY_SIGNATURE_TOKEN)
    } else {
        (header_end, VANITY_HEADER_TOKEN)
    };

    // TODO: vanity lines further up than the line right before the insertion
    // point (e.g. after a manual edit) are not detected and will pile up.
    if insert_index > 0 && lines[insert_index - 1].starts_with(vanity_token) {
        insert_index -= 1;
        lines.remove(insert_index);
    }

    let mut builder = CommitBuilder::default();
    for line in &lines[..insert_index] {
        builder.push_line(line);
    }

    builder.push(vanity_token);
    builder.push_placeholder();
    builder.push(b"\n");

    for line in &lines[insert_index..] {
        builder.push_line(line);
    }

    Ok(builder.finish())
}

/// Parses `committer <name> [<16 hex digits>] <<email>> <date>`.
///
/// The name is the shortest prefix after which the optional hex token and
/// ` <` follow; the email extends to the last `> ` on the line.
pub fn parse_committer_line(line: &[u8]) -> Result<CommitterIdentity> {
    let rest = line
        .strip_prefix(COMMITTER_TOKEN)
        .ok_or_else(|| Error::malformed_committer(line))?;

    for name_end in 0..rest.len() {
        let tail = &rest[name_end..];

        let after_open_bracket = if starts_with_nonce_token(tail) {
            match tail[NONCE_HEX_LENGTH + 1..].strip_prefix(b" <") {
                Some(after) => after,
                None => continue,
            }
        } else {
            match tail.strip_prefix(b" <") {
                Some(after) => after,
                None => continue,
            }
        };

        if let Some(split) = rfind(after_open_bracket, b"> ") {
            return Ok(CommitterIdentity {
                name: rest[..name_end].to_vec(),
                email: after_open_bracket[..split].to_vec(),
                date: after_open_bracket[split + 2..].to_vec(),
            });
        }
    }

    Err(Error::malformed_committer(line))
}

/// Returns git's object header for a commit of the given length.
pub fn commit_header(commit_len: usize) -> Vec<u8> {
    format!("commit {}\0", commit_len).into_bytes()
}

/// Prepends git's object header to a commit.
pub fn frame_commit(commit: &[u8]) -> Vec<u8> {
    let mut data = commit_header(commit.len());
    data.extend_from_slice(commit);
    data
}

/// Removes everything up to and including the first null byte.
/// Data without a null byte is returned unchanged.
pub fn strip_commit_header(data: &[u8]) -> &[u8] {
    match data.iter().position(|&byte| byte == 0) {
        Some(null_index) => &data[null_index + 1..],
        None => data,
    }
}

/// SHA1 of data that already carries git's object header.
pub fn sha1_digest(framed: &[u8]) -> [u8; 20] {
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&Sha1::digest(framed));
    digest
}

/// Hashes a commit object using git's object encoding, without adding padding or anything else
pub fn hash_git_commit(commit: &[u8]) -> String {
    to_hex(&sha1_digest(&frame_commit(commit)))
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&byte| format!("{:02x}", byte))
        .collect::<String>()
}

// Lines without their terminators. A final newline does not start another line.
fn split_lines(commit: &[u8]) -> Vec<&[u8]> {
    if commit.is_empty() {
        return Vec::new();
    }

    commit
        .strip_suffix(b"\n")
        .unwrap_or(commit)
        .split(|&byte| byte == b'\n')
        .collect()
}

fn header_lines<'a, 'b>(lines: &'b [&'a [u8]]) -> &'b [&'a [u8]] {
    match lines.iter().position(|line| line.is_empty()) {
        Some(header_end) => &lines[..header_end],
        None => lines,
    }
}

fn starts_with_nonce_token(data: &[u8]) -> bool {
    data.len() > NONCE_HEX_LENGTH
        && data[0] == b' '
        && data[1..=NONCE_HEX_LENGTH]
            .iter()
            .all(|&byte| byte.is_ascii_digit() || (b'A'..=b'F').contains(&byte))
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
