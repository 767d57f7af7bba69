//! # tcmplx-prefix
//!
//! Entropy-coding building blocks shared by the DEFLATE and Brotli codecs:
//!
//! - [`PrefixList`]: canonical prefix codes, length-limited length assignment
//!   and symbol search in either direction
//! - [`InsCopyTable`]: the length alphabets (DEFLATE literal/length, Brotli
//!   insert-and-copy and block count)
//! - [`RingDist`]: distance code arithmetic with the recent-distance ring
//! - [`BitReader`] / [`BitWriter`]: LSB-first bit I/O that can stop and resume
//!   at any bit
//!
//! ## Example
//!
//! ```rust
//! use tcmplx_prefix::{BitReader, BitWriter, PrefixList, Source};
//!
//! let freqs = [10, 1, 1, 5];
//! let mut list = PrefixList::new(freqs.len()).unwrap();
//! list.gen_lengths(&freqs, 15).unwrap();
//! list.gen_codes().unwrap();
//!
//! let mut writer = BitWriter::new();
//! list.encode(&mut writer, 3).unwrap();
//! writer.align();
//! let bytes = writer.take_bytes();
//!
//! list.codesort();
//! let mut reader = BitReader::new();
//! let mut src = Source::new(&bytes);
//! assert_eq!(list.decode(&mut reader, &mut src).unwrap(), Some(3));
//! ```

pub mod bits;
pub mod fixlist;
pub mod inscopy;
pub mod ringdist;

pub use bits::{reverse_bits, BitReader, BitWriter, Source};
pub use fixlist::{PrefixLine, PrefixList, Preset, MAX_CODE_BITS, MAX_SYMBOLS};
pub use inscopy::{InsCopyRow, InsCopyTable, RowKind, TablePreset};
pub use ringdist::{RingDist, MAX_DIRECT, MAX_POSTFIX, SPECIAL_CODES};
