//! # tcmplx LZ
//!
//! LZ77 building blocks shared by the DEFLATE and Brotli state machines.
//!
//! - [`RingSlide`] - fixed-capacity circular byte window
//! - [`HashChain`] - window plus per-hash position chains for match search
//! - [`BlockBuf`] - greedy/lazy match selection into a byte-oriented
//!   insert/copy [`command`] stream
//!
//! Decoders use the same [`BlockBuf`] as their history: every produced byte
//! is fed back through [`BlockBuf::bypass`] and copies read it with
//! [`BlockBuf::peek`].

pub mod blockbuf;
pub mod command;
pub mod hashchain;
pub mod ringslide;

pub use blockbuf::{BlockBuf, MIN_MATCH};
pub use command::{Command, Commands, MAX_COMMAND_LEN, MAX_DISTANCE};
pub use hashchain::{HashChain, HASH_BUCKETS};
pub use ringslide::RingSlide;
