//! # tcmplx-deflate
//!
//! zlib (RFC 1950) around DEFLATE (RFC 1951), as resumable state machines.
//!
//! - [`Inflater`] decodes stored, fixed and dynamic blocks, verifies the
//!   Adler-32 trailer and reports preset dictionary requests
//! - [`Deflater`] feeds a hash-chain match finder and writes each block in
//!   whichever form is smallest
//! - [`ZCvt`] wraps either direction behind one type
//!
//! ## Example
//!
//! ```rust
//! use tcmplx_core::{Codec, Compressor, Decompressor};
//! use tcmplx_deflate::ZlibCodec;
//!
//! let codec = ZlibCodec::new();
//! let data = b"to be or not to be, to be or not to be";
//! let compressed = codec.compress(data).unwrap();
//! assert_eq!(codec.decompress(&compressed).unwrap(), data);
//! ```

pub mod codec;
pub mod deflate;
pub mod huffman;
pub mod inflate;
pub mod zcvt;

pub use codec::{ZlibCodec, ZlibCompressor, ZlibDecompressor};
pub use deflate::Deflater;
pub use inflate::{Inflater, WINDOW_SIZE};
pub use zcvt::{zlib_compress, zlib_decompress, zlib_decompress_to, ZCvt};
