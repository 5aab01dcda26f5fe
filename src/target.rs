use crate::error::{Error, Result};
use std::fmt;

/// Number of hex digits in a SHA1 hash.
pub const MAX_PREFIX_LENGTH: usize = 40;

/// Defines a desired target prefix for a commit hash.
///
/// For example, the hash prefix "deadbeef123" corresponds to the
/// following structure:
///   Target { data: [0xdeadbeef, 0x12300000, 0, 0, 0], mask: [0xffffffff, 0xfff00000, 0, 0, 0], precision_bits: 44 }
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Target {
    /// The prefix, right-padded with zero digits to 40 hex digits and split
    /// into big-endian four-byte chunks.
    data: [u32; 5],
    /// Mask containing bits set to 1 if the bit at that position is specified
    /// in the prefix, and 0 otherwise.
    mask: [u32; 5],
    /// The number of leading hash bits that have to match `data`.
    precision_bits: u32,
}

impl Target {
    /// Creates a new target from a hex string of at most 40 characters.
    pub fn new(prefix: &str) -> Result<Self> {
        if prefix.len() > MAX_PREFIX_LENGTH {
            return Err(Error::invalid_prefix(
                prefix,
                "longer than the 40 hex digits of a SHA1 hash",
            ));
        }

        if !prefix.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(Error::invalid_prefix(
                prefix,
                "contains characters other than 0-9, a-f and A-F",
            ));
        }

        let mut data = [0u32; 5];
        let mut mask = [0u32; 5];

        for (i, chunk) in prefix.as_bytes().chunks(8).enumerate() {
            let value = chunk
                .iter()
                .fold(0u32, |word, &digit| (word << 4) | hex_digit_value(digit));
            let num_unspecified_bits = 32 - 4 * chunk.len() as u32;
            data[i] = value << num_unspecified_bits;
            mask[i] = u32::MAX >> num_unspecified_bits << num_unspecified_bits;
        }

        Ok(Self {
            data,
            mask,
            precision_bits: 4 * prefix.len() as u32,
        })
    }

    /// The five big-endian words of the zero-padded prefix.
    pub fn words(&self) -> &[u32; 5] {
        &self.data
    }

    /// The number of leading bits that a hash has to share with the target.
    pub fn precision_bits(&self) -> u32 {
        self.precision_bits
    }

    /// Whether the leading `precision_bits` of `hash` equal the target.
    #[inline(always)]
    pub fn matches(&self, hash: &[u32; 5]) -> bool {
        hash.iter()
            .zip(&self.mask)
            .map(|(&hash_word, &mask_word)| hash_word & mask_word)
            .zip(&self.data)
            .all(|(masked_hash_word, &desired_word)| masked_hash_word == desired_word)
    }

    /// Like `matches`, for a hash given as 20 raw bytes.
    pub fn matches_bytes(&self, hash: &[u8; 20]) -> bool {
        let mut words = [0u32; 5];
        for (word, chunk) in words.iter_mut().zip(hash.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        self.matches(&words)
    }
}

/// Shows the prefix in lowercase, the way git prints hashes.
impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = (self.precision_bits / 4) as usize;
        let full: String = self.data.iter().map(|word| format!("{:08x}", word)).collect();
        f.write_str(&full[..digits])
    }
}

fn hex_digit_value(digit: u8) -> u32 {
    match digit {
        b'0'..=b'9' => (digit - b'0') as u32,
        b'a'..=b'f' => (digit - b'a' + 10) as u32,
        b'A'..=b'F' => (digit - b'A' + 10) as u32,
        _ => 0,
    }
}
