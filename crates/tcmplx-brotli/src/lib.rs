//! # tcmplx-brotli
//!
//! Brotli (RFC 7932) as resumable state machines.
//!
//! - [`BrotliDecoder`] reads the whole format: block switching, context
//!   maps, simple and complex prefix codes, the distance cache, built-in
//!   dictionary references and metadata blocks
//! - [`BrotliEncoder`] turns a hash-chain match finder's commands into
//!   metablocks, falling back to uncompressed ones when they are smaller
//! - [`BrCvt`] wraps either direction behind one type
//!
//! ## Example
//!
//! ```rust
//! use tcmplx_brotli::{brotli_compress_with_metadata, brotli_decompress_with_metadata};
//! use tcmplx_core::EncoderOptions;
//!
//! let data = b"to be or not to be, to be or not to be";
//! let stream =
//!     brotli_compress_with_metadata(data, &[&b"note"[..]], EncoderOptions::default()).unwrap();
//! let (plain, metadata) = brotli_decompress_with_metadata(&stream).unwrap();
//! assert_eq!(plain, data);
//! assert_eq!(metadata, vec![b"note".to_vec()]);
//! ```

pub mod bdict;
pub mod brcvt;
pub mod codec;
pub mod ctxtmap;
pub mod ctxtspan;
pub mod decode;
pub mod encode;
pub mod huffman;

pub use brcvt::{
    brotli_compress, brotli_compress_with_metadata, brotli_decompress,
    brotli_decompress_with_metadata, brotli_decompress_to, BrCvt,
};
pub use codec::{BrotliCodec, BrotliCompressor, BrotliDecompressor};
pub use ctxtmap::{ContextMap, ContextMode};
pub use ctxtspan::{subdivide, ContextGuess, ContextSpan};
pub use decode::BrotliDecoder;
pub use encode::{BrotliEncoder, MAX_METADATA};
