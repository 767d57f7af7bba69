//! Error types for codec operations.
//!
//! `Partial` and end-of-stream are not errors; they are reported through
//! [`Status`](crate::stream::Status) in a successful [`Progress`](crate::stream::Progress).

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Codec error kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Memory allocation failed.
    #[error("allocation failed: could not reserve {requested_bytes} bytes")]
    Memory { requested_bytes: usize },

    /// Caller supplied an invalid argument.
    #[error("invalid parameter: {0}")]
    Param(String),

    /// Malformed or inconsistent bitstream content.
    #[error("malformed stream: {0}")]
    Sanitize(String),

    /// Checksum verification failed.
    #[error("checksum mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Prefix code lengths cannot satisfy the requested limit or histogram.
    #[error("prefix code length out of range: {0}")]
    FixLenRange(String),

    /// Prefix code space is over-subscribed (or incomplete where that is not allowed).
    #[error("prefix code allocation failed: {0}")]
    FixCodeAlloc(String),

    /// Distance cache arithmetic produced a distance above the representable range.
    #[error("distance cache overflow")]
    RingDistOverflow,

    /// Distance cache arithmetic produced a distance of zero or less.
    #[error("distance cache underflow")]
    RingDistUnderflow,

    /// Write exceeds the configured block capacity.
    #[error("block overflow: {requested} bytes requested, {available} available")]
    BlockOverflow { requested: usize, available: usize },

    /// Stream declares a preset dictionary the caller must supply.
    #[error("preset dictionary required (adler32 0x{checksum:08x})")]
    ZDictionary { checksum: u32 },

    /// Index or container access out of range.
    #[error("index {index} out of range for length {len}")]
    OutOfRange { index: usize, len: usize },

    /// No insert/copy symbol covers the requested length pair.
    #[error("no insert/copy symbol for insert {insert} copy {copy}")]
    InsCopyMissing { insert: u32, copy: u32 },

    /// Input ended before the logical end of stream.
    #[error("unexpected EOF after {bytes_read} bytes")]
    UnexpectedEof { bytes_read: usize },

    /// Output buffer too small for a one-shot operation.
    #[error("buffer too small: need {required} bytes, got {provided}")]
    BufferTooSmall { required: usize, provided: usize },
}

impl Error {
    /// Create an invalid parameter error.
    pub fn param(message: impl Into<String>) -> Self {
        Error::Param(message.into())
    }

    /// Create a malformed stream error.
    pub fn sanitize(message: impl Into<String>) -> Self {
        Error::Sanitize(message.into())
    }

    /// Create a malformed stream error with bit offset context.
    pub fn sanitize_at(message: impl Into<String>, offset: usize) -> Self {
        Error::Sanitize(format!("{} at byte {}", message.into(), offset))
    }

    /// Create an allocation failure error.
    pub fn memory(requested_bytes: usize) -> Self {
        Error::Memory { requested_bytes }
    }

    /// Create a code length range error.
    pub fn fix_len_range(message: impl Into<String>) -> Self {
        Error::FixLenRange(message.into())
    }

    /// Create a code allocation error.
    pub fn fix_code_alloc(message: impl Into<String>) -> Self {
        Error::FixCodeAlloc(message.into())
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, actual: u32) -> Self {
        Error::ChecksumMismatch { expected, actual }
    }

    /// Create an out of range error.
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Error::OutOfRange { index, len }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(bytes_read: usize) -> Self {
        Error::UnexpectedEof { bytes_read }
    }

    /// Create a buffer too small error.
    pub fn buffer_too_small(required: usize, provided: usize) -> Self {
        Error::BufferTooSmall { required, provided }
    }

    /// Check if the caller can recover by supplying more input, more output
    /// space, or a preset dictionary.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedEof { .. } | Error::BufferTooSmall { .. } | Error::ZDictionary { .. }
        )
    }

    /// Check if the error describes bad stream content rather than bad usage.
    pub fn is_stream_fault(&self) -> bool {
        matches!(
            self,
            Error::Sanitize(_)
                | Error::ChecksumMismatch { .. }
                | Error::RingDistOverflow
                | Error::RingDistUnderflow
                | Error::FixCodeAlloc(_)
        )
    }

    /// Get error category for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Memory { .. } => "memory",
            Error::Param(_) => "param",
            Error::Sanitize(_) => "sanitize",
            Error::ChecksumMismatch { .. } => "checksum_mismatch",
            Error::FixLenRange(_) => "fix_len_range",
            Error::FixCodeAlloc(_) => "fix_code_alloc",
            Error::RingDistOverflow => "ring_dist_overflow",
            Error::RingDistUnderflow => "ring_dist_underflow",
            Error::BlockOverflow { .. } => "block_overflow",
            Error::ZDictionary { .. } => "zdictionary",
            Error::OutOfRange { .. } => "out_of_range",
            Error::InsCopyMissing { .. } => "ins_copy_missing",
            Error::UnexpectedEof { .. } => "unexpected_eof",
            Error::BufferTooSmall { .. } => "buffer_too_small",
        }
    }
}
