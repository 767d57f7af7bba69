//! Codec implementations for Brotli.

use tcmplx_core::{
    Algorithm, Codec, CompressionLevel, Compressor, Decompressor, EncoderOptions, Result,
};

use crate::brcvt::{brotli_compress, brotli_decompress, brotli_decompress_to};

/// Worst-case size: every metablock uncompressed, plus the window bits
/// and the closing metablock.
fn uncompressed_bound(input_len: usize, block_size: usize) -> usize {
    input_len + (input_len / block_size + 1) * 5 + 2
}

/// Brotli compressor.
#[derive(Debug, Clone)]
pub struct BrotliCompressor {
    level: CompressionLevel,
    options: EncoderOptions,
}

impl BrotliCompressor {
    /// Create a compressor at the default level.
    pub fn new() -> Self {
        Self::with_level(CompressionLevel::Default)
    }

    /// Create with compression level.
    pub fn with_level(level: CompressionLevel) -> Self {
        Self {
            level,
            options: EncoderOptions::with_level(Algorithm::Brotli, level),
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

impl Default for BrotliCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for BrotliCompressor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Brotli
    }

    fn level(&self) -> CompressionLevel {
        self.level
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        brotli_compress(input, self.options)
    }

    fn max_compressed_size(&self, input_len: usize) -> usize {
        uncompressed_bound(input_len, self.options.block_size)
    }
}

/// Brotli decompressor.
#[derive(Debug, Clone, Default)]
pub struct BrotliDecompressor;

impl BrotliDecompressor {
    /// Create a new Brotli decompressor.
    pub fn new() -> Self {
        Self
    }
}

impl Decompressor for BrotliDecompressor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Brotli
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        brotli_decompress(input)
    }

    fn decompress_to(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        brotli_decompress_to(input, output)
    }
}

/// Brotli codec.
#[derive(Debug, Clone)]
pub struct BrotliCodec {
    compressor: BrotliCompressor,
}

impl BrotliCodec {
    /// Create with explicit match finder options.
    pub fn with_options(options: EncoderOptions) -> Self {
        Self {
            compressor: BrotliCompressor::with_options(options),
        }
    }
}

impl Default for BrotliCodec {
    fn default() -> Self {
        <Self as Codec>::new()
    }
}

impl Compressor for BrotliCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Brotli
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

impl Decompressor for BrotliCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Brotli
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        brotli_decompress(input)
    }

    fn decompress_to(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        brotli_decompress_to(input, output)
    }
}

impl Codec for BrotliCodec {
    fn new() -> Self {
        Self::with_level(CompressionLevel::Default)
    }

    fn with_level(level: CompressionLevel) -> Self {
        Self {
            compressor: BrotliCompressor::with_level(level),
        }
    }
}
