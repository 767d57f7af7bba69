//! # tcmplx core
//!
//! Error, configuration, stream-status and codec trait definitions shared by
//! the tcmplx DEFLATE (RFC 1951 / RFC 1950) and Brotli (RFC 7932) crates.
//!
//! ## Streaming model
//!
//! All conversions are synchronous and caller-driven. A state machine call
//! receives an input slice and an output slice and returns a [`Progress`]:
//!
//! - [`Status::Success`] - all input consumed, call again with more
//! - [`Status::Partial`] - output full, call again with more space
//! - [`Status::Eof`] - end of stream, returned on every later call too
//!
//! Failures are [`Error`] values and abort the current call.
//!
//! ## Core Traits
//!
//! - [`Compressor`] / [`Decompressor`] - one-shot operations
//! - [`StreamingCompressor`] / [`StreamingDecompressor`] - buffer-driven
//! - [`Codec`] - combined compress/decompress capability

pub mod checksum;
pub mod config;
pub mod error;
pub mod stream;
pub mod traits;
pub mod types;

pub use checksum::{adler32, Adler32};
pub use config::{EncoderOptions, MAX_BLOCK_SIZE};
pub use error::{Error, Result};
pub use stream::{Flush, Progress, Status};
pub use traits::{Codec, Compressor, Decompressor, StreamingCompressor, StreamingDecompressor};
pub use types::{Algorithm, CompressionLevel, CompressionRatio};
