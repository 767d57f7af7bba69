//! Codec traits.
//!
//! ```text
//! Compressor / Decompressor  (one-shot operations)
//!       ↓
//! StreamingCompressor / StreamingDecompressor  (caller-driven buffers)
//!       ↓
//! Codec  (combined compress + decompress)
//! ```

use crate::error::Result;
use crate::stream::{Flush, Progress};
use crate::types::{Algorithm, CompressionLevel, CompressionRatio};

/// One-shot compression.
pub trait Compressor {
    /// Get the stream format.
    fn algorithm(&self) -> Algorithm;

    /// Get the configured compression level.
    fn level(&self) -> CompressionLevel;

    /// Compress data in one shot.
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Compress data into an existing buffer.
    ///
    /// Returns the number of bytes written, or `BufferTooSmall`.
    fn compress_to(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let compressed = self.compress(input)?;
        if compressed.len() > output.len() {
            return Err(crate::Error::buffer_too_small(
                compressed.len(),
                output.len(),
            ));
        }
        output[..compressed.len()].copy_from_slice(&compressed);
        Ok(compressed.len())
    }

    /// Upper bound on compressed size for an input length.
    fn max_compressed_size(&self, input_len: usize) -> usize;
}

/// One-shot decompression.
pub trait Decompressor {
    /// Get the stream format.
    fn algorithm(&self) -> Algorithm;

    /// Decompress data in one shot.
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Decompress data into an existing buffer.
    ///
    /// Returns the number of bytes written, or `BufferTooSmall` when the
    /// stream does not end within `output`.
    fn decompress_to(&self, input: &[u8], output: &mut [u8]) -> Result<usize>;

    /// Decompress with a known output size.
    fn decompress_with_size(&self, input: &[u8], output_size: usize) -> Result<Vec<u8>> {
        let mut output = vec![0u8; output_size];
        let written = self.decompress_to(input, &mut output)?;
        output.truncate(written);
        Ok(output)
    }
}

/// Incremental compression over caller-supplied buffers.
pub trait StreamingCompressor {
    /// Get the stream format.
    fn algorithm(&self) -> Algorithm;

    /// Compress a chunk.
    ///
    /// With [`Flush::Finish`] the call keeps returning `Partial` until the
    /// trailer has been written, then `Eof`.
    fn compress_chunk(&mut self, input: &[u8], output: &mut [u8], flush: Flush)
        -> Result<Progress>;

    /// Reset state for a new stream.
    fn reset(&mut self);
}

/// Incremental decompression over caller-supplied buffers.
pub trait StreamingDecompressor {
    /// Get the stream format.
    fn algorithm(&self) -> Algorithm;

    /// Decompress a chunk.
    fn decompress_chunk(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress>;

    /// Check if the end of stream was reached.
    fn is_finished(&self) -> bool;

    /// Reset state for a new stream.
    fn reset(&mut self);
}

/// Combined codec.
pub trait Codec: Compressor + Decompressor {
    /// Create a codec with default settings.
    fn new() -> Self
    where
        Self: Sized;

    /// Create a codec with a compression level.
    fn with_level(level: CompressionLevel) -> Self
    where
        Self: Sized;

    /// Compress then decompress, returning whether the data survived.
    fn verify_roundtrip(&self, data: &[u8]) -> Result<bool> {
        let compressed = self.compress(data)?;
        let decompressed = self.decompress(&compressed)?;
        Ok(data == decompressed.as_slice())
    }

    /// Compression ratio for the given data.
    fn measure_ratio(&self, data: &[u8]) -> Result<CompressionRatio> {
        let compressed = self.compress(data)?;
        Ok(CompressionRatio::new(data.len(), compressed.len()))
    }
}
