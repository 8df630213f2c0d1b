use strum::EnumIs;
use thiserror::Error;

/// Framing and primitive decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum Error {
    /// The varint tag (or a varint length inside a type value) ran past
    /// the end of the buffer or exceeded 64 bits.
    #[error("malformed varint tag at offset {offset}")]
    MalformedTag { offset: usize },

    /// The tag announced more body bytes than remain in the buffer.
    #[error("truncated body: tag announces {expected} bytes but only {remaining} remain")]
    TruncatedBody { expected: usize, remaining: usize },

    /// The tag length cannot be represented as an in-memory length.
    #[error("length overflow: tag {tag} encodes a length that does not fit in memory")]
    LengthOverflow { tag: u64 },

    /// A primitive body has a byte width its type does not allow.
    #[error("bad {kind} encoding: {width} bytes")]
    BadWidth { kind: &'static str, width: usize },

    /// A `string` body is not valid UTF-8.
    #[error("invalid UTF-8 in string body")]
    InvalidUtf8,

    /// A map body holds a key without a matching value.
    #[error("map body has a key without a value")]
    OddMapEntries,
}

pub type Result<T> = std::result::Result<T, Error>;
