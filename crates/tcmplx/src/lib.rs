//! # tcmplx
//!
//! DEFLATE/zlib (RFC 1950/1951) and Brotli (RFC 7932) codecs built from
//! shared parts: canonical prefix codes, an insert-and-copy length table, a
//! distance cache and a hash-chain match finder. Every decoder and encoder
//! is a resumable state machine that can stop at any input or output
//! boundary and pick up on the next call.
//!
//! ## Quick Start
//!
//! ```rust
//! use tcmplx::{compress, decompress, Algorithm};
//!
//! let data = b"Hello, tcmplx! Hello, tcmplx!";
//! for algorithm in [Algorithm::Zlib, Algorithm::Brotli] {
//!     let compressed = compress(data, algorithm).unwrap();
//!     assert_eq!(decompress(&compressed, algorithm).unwrap(), data);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `deflate` - zlib/DEFLATE (default)
//! - `brotli` - Brotli (default)

pub use tcmplx_core::{
    adler32, Adler32, Algorithm, Codec, CompressionLevel, CompressionRatio, Compressor,
    Decompressor, EncoderOptions, Error, Flush, Progress, Result, Status, StreamingCompressor,
    StreamingDecompressor, MAX_BLOCK_SIZE,
};

pub mod lz {
    //! Sliding window, hash-chain match finder and block command buffer.
    pub use tcmplx_lz::*;
}

pub mod prefix {
    //! Bit I/O, prefix code lists, insert-and-copy tables and distance rings.
    pub use tcmplx_prefix::*;
}

#[cfg(feature = "deflate")]
pub mod zlib {
    //! zlib/DEFLATE state machines.
    pub use tcmplx_deflate::*;
}

#[cfg(feature = "deflate")]
pub use tcmplx_deflate::{Deflater, Inflater, ZCvt, ZlibCodec, ZlibCompressor, ZlibDecompressor};

#[cfg(feature = "brotli")]
pub mod brotli {
    //! Brotli state machines, context modeling and the built-in dictionary.
    pub use tcmplx_brotli::*;
}

#[cfg(feature = "brotli")]
pub use tcmplx_brotli::{
    BrCvt, BrotliCodec, BrotliCompressor, BrotliDecoder, BrotliDecompressor, BrotliEncoder,
};

/// Compress data using the specified algorithm.
pub fn compress(data: &[u8], algorithm: Algorithm) -> Result<Vec<u8>> {
    compress_with_level(data, algorithm, CompressionLevel::Default)
}

/// Compress data using the specified algorithm and level.
pub fn compress_with_level(
    data: &[u8],
    algorithm: Algorithm,
    level: CompressionLevel,
) -> Result<Vec<u8>> {
    match algorithm {
        #[cfg(feature = "deflate")]
        Algorithm::Zlib => ZlibCodec::with_level(level).compress(data),

        #[cfg(feature = "brotli")]
        Algorithm::Brotli => BrotliCodec::with_level(level).compress(data),

        #[allow(unreachable_patterns)]
        _ => Err(not_enabled(algorithm)),
    }
}

/// Decompress data using the specified algorithm.
pub fn decompress(data: &[u8], algorithm: Algorithm) -> Result<Vec<u8>> {
    match algorithm {
        #[cfg(feature = "deflate")]
        Algorithm::Zlib => ZlibCodec::new().decompress(data),

        #[cfg(feature = "brotli")]
        Algorithm::Brotli => BrotliCodec::new().decompress(data),

        #[allow(unreachable_patterns)]
        _ => Err(not_enabled(algorithm)),
    }
}

/// Streaming encoder for an algorithm.
pub fn stream_encoder(
    algorithm: Algorithm,
    options: EncoderOptions,
) -> Result<Box<dyn StreamingCompressor>> {
    match algorithm {
        #[cfg(feature = "deflate")]
        Algorithm::Zlib => Ok(Box::new(Deflater::new(options)?)),

        #[cfg(feature = "brotli")]
        Algorithm::Brotli => Ok(Box::new(BrotliEncoder::new(options)?)),

        #[allow(unreachable_patterns)]
        _ => Err(not_enabled(algorithm)),
    }
}

/// Streaming decoder for an algorithm.
pub fn stream_decoder(algorithm: Algorithm) -> Result<Box<dyn StreamingDecompressor>> {
    match algorithm {
        #[cfg(feature = "deflate")]
        Algorithm::Zlib => Ok(Box::new(Inflater::new()?)),

        #[cfg(feature = "brotli")]
        Algorithm::Brotli => Ok(Box::new(BrotliDecoder::new()?)),

        #[allow(unreachable_patterns)]
        _ => Err(not_enabled(algorithm)),
    }
}

#[allow(dead_code)]
fn not_enabled(algorithm: Algorithm) -> Error {
    Error::param(format!("{} support not enabled", algorithm.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_dispatch() {
        let data = b"dispatch by algorithm ".repeat(30);
        for algorithm in [Algorithm::Zlib, Algorithm::Brotli] {
            for level in [CompressionLevel::Fast, CompressionLevel::Best] {
                let c = compress_with_level(&data, algorithm, level).unwrap();
                assert_eq!(decompress(&c, algorithm).unwrap(), data);
            }
        }
    }

    #[test]
    fn test_formats_are_not_interchangeable() {
        let zlib = compress(b"zlib only", Algorithm::Zlib).unwrap();
        assert!(decompress(&zlib, Algorithm::Brotli).is_err());
    }

    #[test]
    fn test_stream_objects() {
        let data = b"boxed streaming codecs ".repeat(10);
        for algorithm in [Algorithm::Zlib, Algorithm::Brotli] {
            let mut enc = stream_encoder(algorithm, EncoderOptions::default()).unwrap();
            assert_eq!(enc.algorithm(), algorithm);
            let mut stream = vec![0u8; 1024];
            let p = enc.compress_chunk(&data, &mut stream, Flush::Finish).unwrap();
            assert!(p.is_eof());
            stream.truncate(p.written);

            let mut dec = stream_decoder(algorithm).unwrap();
            let mut out = vec![0u8; data.len()];
            let q = dec.decompress_chunk(&stream, &mut out).unwrap();
            assert!(q.is_eof());
            assert!(dec.is_finished());
            assert_eq!(out, data);
        }
    }
}
