//! Error kinds surfaced across the session boundary (spec §7).

use thiserror::Error;

/// Everything that can go wrong inside the archive core.
///
/// Variants match the error kinds named in the format specification
/// one-to-one so a CLI layer can map each to an exit code without
/// re-deriving the mapping from prose.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bad magic number in {context}")]
    BadMagic { context: &'static str },

    #[error("truncated {context}: expected {expected} bytes, got {got}")]
    Truncated {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("oversized field {field}: {value} exceeds limit {limit}")]
    OversizedField {
        field: &'static str,
        value: u64,
        limit: u64,
    },

    #[error("invalid Huffman code-length table: {reason}")]
    InvalidCodes { reason: &'static str },

    #[error("CRC-32C mismatch for entry {entry:?}: expected {expected:#010x}, got {got:#010x}")]
    CrcMismatch {
        entry: Option<String>,
        expected: u32,
        got: u32,
    },

    #[error("unsafe path {path:?}: {reason}")]
    PathUnsafe { path: String, reason: &'static str },

    #[error("name too long: {len} bytes (max 255)")]
    NameTooLong { len: usize },

    #[error("too many entries: {count} exceeds u32::MAX")]
    TooManyEntries { count: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported entry type: {what}")]
    Unsupported { what: &'static str },

    #[error("aborted by user")]
    UserAbort,
}

pub type Result<T> = std::result::Result<T, Error>;
