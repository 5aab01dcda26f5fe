use std::fmt;
use std::str::FromStr;

/// Number of ASCII characters a nonce occupies inside a commit.
pub const NONCE_HEX_LENGTH: usize = 16;

/// Byte used to fill the nonce placeholder before a nonce is chosen.
pub const SENTINEL_BYTE: u8 = b'F';

/// The value that gets written into a commit to change its hash.
///
/// Inside a commit, a nonce is always spelled as exactly 16 uppercase hex
/// digits, most significant digit first, without a `0x` prefix.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Default)]
pub struct Nonce(pub u64);

impl Nonce {
    /// The ASCII spelling of the nonce, as inserted into the commit.
    #[inline(always)]
    pub fn to_hex_bytes(self) -> [u8; NONCE_HEX_LENGTH] {
        let mut hex = [0u8; NONCE_HEX_LENGTH];
        for (pair, &byte) in hex.chunks_exact_mut(2).zip(self.0.to_be_bytes().iter()) {
            pair.copy_from_slice(&HEX_PAIRS[byte as usize]);
        }
        hex
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl FromStr for Nonce {
    type Err = std::num::ParseIntError;

    /// Parses a hex number, with or without a leading `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u64::from_str_radix(digits, 16).map(Nonce)
    }
}

impl From<u64> for Nonce {
    fn from(value: u64) -> Self {
        Nonce(value)
    }
}

// The uppercase two-digit hex spelling of every byte value.
// These are computed statically in advance so the search loop only copies them.
static HEX_PAIRS: [[u8; 2]; 256] = {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut pairs = [[0; 2]; 256];
    let mut i = 0;
    while i < 256 {
        pairs[i][0] = DIGITS[i >> 4];
        pairs[i][1] = DIGITS[i & 0xf];
        i += 1;
    }
    pairs
};
