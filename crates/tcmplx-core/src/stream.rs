//! Streaming conversion status types.
//!
//! Every state machine call takes an input slice and an output slice and
//! reports how far it got. The caller loops, resupplying buffers, until
//! [`Status::Eof`] is returned.

/// Flush modes for streaming encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    /// Buffer input until a full block is available.
    #[default]
    None,

    /// Close the current block and byte-align the output.
    /// The stream stays open.
    Block,

    /// Write the final block and any trailer.
    Finish,
}

/// Outcome of one conversion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// All supplied input was consumed; more input may follow.
    Success,
    /// The output buffer is full; call again with more space.
    Partial,
    /// The logical end of the stream was reached.
    Eof,
}

/// Progress report for one conversion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Input bytes consumed.
    pub consumed: usize,
    /// Output bytes written.
    pub written: usize,
    /// Why the call returned.
    pub status: Status,
}

impl Progress {
    /// Create a progress report.
    pub fn new(consumed: usize, written: usize, status: Status) -> Self {
        Progress {
            consumed,
            written,
            status,
        }
    }

    /// Check for end of stream.
    pub fn is_eof(&self) -> bool {
        self.status == Status::Eof
    }

    /// Check whether the output buffer filled up.
    pub fn is_partial(&self) -> bool {
        self.status == Status::Partial
    }
}
