//! Encoder configuration.

use crate::error::{Error, Result};
use crate::types::{Algorithm, CompressionLevel};

/// Largest block a single `BlockBuf` batch may hold.
pub const MAX_BLOCK_SIZE: usize = 1 << 24;

/// Match finder and block sizing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Raw bytes gathered before a block is emitted.
    pub block_size: usize,
    /// Sliding window size in bytes.
    pub window_size: usize,
    /// Positions remembered per hash bucket.
    pub chain_length: usize,
}

impl EncoderOptions {
    /// Create validated options.
    pub fn new(block_size: usize, window_size: usize, chain_length: usize) -> Result<Self> {
        let options = EncoderOptions {
            block_size,
            window_size,
            chain_length,
        };
        options.validate()?;
        Ok(options)
    }

    /// Defaults for a format at the default level.
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        Self::with_level(algorithm, CompressionLevel::Default)
    }

    /// Options for a format at a given level.
    pub fn with_level(algorithm: Algorithm, level: CompressionLevel) -> Self {
        let window_size = match algorithm {
            Algorithm::Zlib => 32768,
            Algorithm::Brotli => (1 << 22) - 16,
        };
        let block_size = match level.to_level() {
            0..=3 => 1 << 14,
            _ => 1 << 16,
        };
        EncoderOptions {
            block_size,
            window_size,
            chain_length: level.chain_length(),
        }
    }

    /// Check ranges that are independent of the stream format.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(Error::param(format!(
                "block size {} not in 1..={}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        if self.window_size == 0 {
            return Err(Error::param("window size must be nonzero"));
        }
        if self.chain_length == 0 {
            return Err(Error::param("chain length must be nonzero"));
        }
        Ok(())
    }

    /// Check the options against a format's window limit.
    pub fn validate_for(&self, algorithm: Algorithm) -> Result<()> {
        self.validate()?;
        if self.window_size > algorithm.max_window() {
            return Err(Error::param(format!(
                "window size {} exceeds {} limit of {}",
                self.window_size,
                algorithm.name(),
                algorithm.max_window()
            )));
        }
        Ok(())
    }
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            block_size: 4096,
            window_size: 32768,
            chain_length: 16,
        }
    }
}
