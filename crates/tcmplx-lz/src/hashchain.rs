//! Hash chains over a sliding window.
//!
//! Every added byte completes a 3-byte window whose hash selects one of
//! [`HASH_BUCKETS`] buckets. Each bucket is a fixed-length ring of stream
//! positions, newest overwriting oldest once `chain_length` is reached.
//! Positions are a monotonic byte counter, never a buffer offset, so the
//! chains survive window wraparound.

use tcmplx_core::{Error, Result};

use crate::ringslide::RingSlide;

/// Number of hash buckets.
pub const HASH_BUCKETS: usize = 251;

/// Bytes hashed per chain entry.
pub const HASH_WIDTH: usize = 3;

#[inline]
fn hash3(b0: u8, b1: u8, b2: u8) -> usize {
    (((b0 as usize) << 6) + ((b1 as usize) << 3) + b2 as usize) % HASH_BUCKETS
}

/// Sliding window with per-hash position chains.
#[derive(Debug, Clone)]
pub struct HashChain {
    slide: RingSlide,
    /// `HASH_BUCKETS * chain_length` recorded positions.
    chains: Vec<u64>,
    /// Next write slot per bucket.
    heads: Vec<usize>,
    /// Filled slots per bucket.
    counts: Vec<usize>,
    chain_length: usize,
    /// Total bytes ever added.
    pos: u64,
    recent: [u8; HASH_WIDTH],
}

impl HashChain {
    /// Create a chain over an `n`-byte window, remembering up to
    /// `chain_length` positions per bucket.
    pub fn new(n: usize, chain_length: usize) -> Result<Self> {
        if chain_length == 0 {
            return Err(Error::param("chain length must be nonzero"));
        }
        let slots = HASH_BUCKETS
            .checked_mul(chain_length)
            .ok_or_else(|| Error::param("chain length too large"))?;
        let mut chains = Vec::new();
        chains
            .try_reserve_exact(slots)
            .map_err(|_| Error::memory(slots * std::mem::size_of::<u64>()))?;
        chains.resize(slots, 0);
        Ok(HashChain {
            slide: RingSlide::new(n),
            chains,
            heads: vec![0; HASH_BUCKETS],
            counts: vec![0; HASH_BUCKETS],
            chain_length,
            pos: 0,
            recent: [0; HASH_WIDTH],
        })
    }

    /// Append a byte to the window and record the 3-byte window it completes.
    pub fn add(&mut self, byte: u8) -> Result<()> {
        self.slide.add(byte)?;
        self.recent = [self.recent[1], self.recent[2], byte];
        self.pos += 1;
        if self.pos >= HASH_WIDTH as u64 {
            let bucket = hash3(self.recent[0], self.recent[1], self.recent[2]);
            let slot = bucket * self.chain_length + self.heads[bucket];
            self.chains[slot] = self.pos;
            self.heads[bucket] = (self.heads[bucket] + 1) % self.chain_length;
            if self.counts[bucket] < self.chain_length {
                self.counts[bucket] += 1;
            }
        }
        Ok(())
    }

    /// Nearest backward distance `>= min_distance` at which `needle` occurs
    /// entirely inside the window, or `None`.
    ///
    /// The distance counts back to the first needle byte: a hit at distance
    /// `d` satisfies `peek(d - 1) == needle[0]`. Since the window must hold all
    /// three bytes, hits are always at least 3.
    pub fn find(&self, needle: &[u8; HASH_WIDTH], min_distance: usize) -> Option<usize> {
        self.candidates(needle).find(|&d| d >= min_distance)
    }

    /// Verified match distances for `needle`, nearest first.
    pub fn candidates<'a>(&'a self, needle: &'a [u8; HASH_WIDTH]) -> Candidates<'a> {
        let bucket = hash3(needle[0], needle[1], needle[2]);
        Candidates {
            chain: self,
            needle,
            bucket,
            walked: 0,
        }
    }

    /// Byte `i + 1` steps back from the newest.
    pub fn peek(&self, i: usize) -> Result<u8> {
        self.slide.peek(i)
    }

    /// Bytes currently in the window.
    pub fn size(&self) -> usize {
        self.slide.size()
    }

    /// Maximum window size.
    pub fn extent(&self) -> usize {
        self.slide.extent()
    }

    /// Total bytes added since creation.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Positions remembered per bucket.
    pub fn chain_length(&self) -> usize {
        self.chain_length
    }

    /// Underlying window.
    pub fn window(&self) -> &RingSlide {
        &self.slide
    }

    /// Forget all history.
    pub fn clear(&mut self) {
        self.slide.clear();
        self.heads.fill(0);
        self.counts.fill(0);
        self.pos = 0;
        self.recent = [0; HASH_WIDTH];
    }

    fn matches_at(&self, distance: usize, needle: &[u8; HASH_WIDTH]) -> bool {
        (0..HASH_WIDTH).all(|k| self.slide.peek(distance - 1 - k).ok() == Some(needle[k]))
    }
}

/// Iterator over verified match distances, see [`HashChain::candidates`].
#[derive(Debug)]
pub struct Candidates<'a> {
    chain: &'a HashChain,
    needle: &'a [u8; HASH_WIDTH],
    bucket: usize,
    walked: usize,
}

impl Iterator for Candidates<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let chain = self.chain;
        let len = chain.chain_length;
        while self.walked < chain.counts[self.bucket] {
            let slot = (chain.heads[self.bucket] + len - 1 - self.walked) % len;
            self.walked += 1;
            let recorded = chain.chains[self.bucket * len + slot];
            let distance = (chain.pos - recorded) as usize + HASH_WIDTH;
            if distance > chain.slide.size() {
                // Older entries are further still.
                self.walked = chain.counts[self.bucket];
                return None;
            }
            if chain.matches_at(distance, self.needle) {
                return Some(distance);
            }
        }
        None
    }
}
