//! Codec implementations for zlib.

use tcmplx_core::{
    Algorithm, Codec, CompressionLevel, Compressor, Decompressor, EncoderOptions, Result,
};

use crate::zcvt::{zlib_compress, zlib_decompress, zlib_decompress_to};

/// Worst-case size: every block stored, plus header, trailer and the
/// closing block.
fn stored_bound(input_len: usize, block_size: usize) -> usize {
    let block = block_size.min(65535);
    input_len + (input_len / block + 1) * 5 + 2 + 4 + 5
}

/// zlib compressor.
#[derive(Debug, Clone)]
pub struct ZlibCompressor {
    level: CompressionLevel,
    options: EncoderOptions,
}

impl ZlibCompressor {
    /// Create a compressor at the default level.
    pub fn new() -> Self {
        Self::with_level(CompressionLevel::Default)
    }

    /// Create with compression level.
    pub fn with_level(level: CompressionLevel) -> Self {
        Self {
            level,
            options: EncoderOptions::with_level(Algorithm::Zlib, level),
        }
    }

    /// Create with explicit match finder options.
    pub fn with_options(options: EncoderOptions) -> Self {
        Self {
            level: CompressionLevel::Default,
            options,
        }
    }
}

impl Default for ZlibCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for ZlibCompressor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zlib
    }

    fn level(&self) -> CompressionLevel {
        self.level
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        zlib_compress(input, self.options)
    }

    fn max_compressed_size(&self, input_len: usize) -> usize {
        stored_bound(input_len, self.options.block_size)
    }
}

/// zlib decompressor.
#[derive(Debug, Clone, Default)]
pub struct ZlibDecompressor;

impl ZlibDecompressor {
    /// Create a new zlib decompressor.
    pub fn new() -> Self {
        Self
    }
}

impl Decompressor for ZlibDecompressor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zlib
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        zlib_decompress(input)
    }

    fn decompress_to(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        zlib_decompress_to(input, output)
    }
}

/// zlib codec.
#[derive(Debug, Clone)]
pub struct ZlibCodec {
    compressor: ZlibCompressor,
}

impl ZlibCodec {
    /// Create with explicit match finder options.
    pub fn with_options(options: EncoderOptions) -> Self {
        Self {
            compressor: ZlibCompressor::with_options(options),
        }
    }
}

impl Default for ZlibCodec {
    fn default() -> Self {
        <Self as Codec>::new()
    }
}

impl Compressor for ZlibCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zlib
    }

    fn level(&self) -> CompressionLevel {
        self.compressor.level()
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        self.compressor.compress(input)
    }

    fn max_compressed_size(&self, input_len: usize) -> usize {
        self.compressor.max_compressed_size(input_len)
    }
}

impl Decompressor for ZlibCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zlib
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        zlib_decompress(input)
    }

    fn decompress_to(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        zlib_decompress_to(input, output)
    }
}

impl Codec for ZlibCodec {
    fn new() -> Self {
        Self::with_level(CompressionLevel::Default)
    }

    fn with_level(level: CompressionLevel) -> Self {
        Self {
            compressor: ZlibCompressor::with_level(level),
        }
    }
}
