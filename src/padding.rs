use std::ops::Deref;

/// Size of a SHA1 message block, in bytes.
pub const BLOCK_LENGTH: usize = 64;

// The last 9 bytes of the final block are taken by the 0x80 terminator and the
// 64-bit length, so a message whose tail is longer than this spills into an
// extra block.
const MAX_TAIL_WITHOUT_EXTRA_BLOCK: usize = BLOCK_LENGTH - 9;

/// A message with SHA1 finalization padding applied.
///
/// The data is laid out as:
/// * the original message (for vanity searches, the framed commit with its
///   placeholder filled with sentinel bytes)
/// * the byte 0x80
/// * null bytes up to an offset of 56 (mod 64)
/// * the bit-length of the original message, as a big-endian 64-bit integer
///
/// The length is always a multiple of 64 bytes, so the buffer can be handed to
/// the SHA1 compression function block by block without any further copying.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PreprocessedMessage {
    data: Box<[u8]>,
    message_len: usize,
}

/// Returns the length of a message of `size` bytes after SHA1 padding.
pub fn padded_len(size: usize) -> usize {
    if size % BLOCK_LENGTH > MAX_TAIL_WITHOUT_EXTRA_BLOCK {
        (size / BLOCK_LENGTH + 2) * BLOCK_LENGTH
    } else {
        (size / BLOCK_LENGTH + 1) * BLOCK_LENGTH
    }
}

impl PreprocessedMessage {
    /// Applies SHA1 finalization padding to `message`.
    pub fn new(message: &[u8]) -> Self {
        let mut data = vec![0u8; padded_len(message.len())];
        data[..message.len()].copy_from_slice(message);
        data[message.len()] = 0x80;

        let length_offset = data.len() - 8;
        data[length_offset..].copy_from_slice(&(message.len() as u64 * 8).to_be_bytes());

        Self {
            data: data.into_boxed_slice(),
            message_len: message.len(),
        }
    }

    /// The length of the message before padding was added.
    pub fn message_len(&self) -> usize {
        self.message_len
    }

    /// The number of 64-byte blocks in the padded data.
    pub fn num_blocks(&self) -> usize {
        self.data.len() / BLOCK_LENGTH
    }

    /// The message without its finalization padding.
    pub fn message(&self) -> &[u8] {
        &self.data[..self.message_len]
    }
}

impl Deref for PreprocessedMessage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}
