//! Block buffer: LZ77 match selection into the command stream.
//!
//! Raw bytes are queued with [`BlockBuf::write`], then [`BlockBuf::gen_block`]
//! runs a greedy match finder with one step of lookahead over them and appends
//! commands (see [`crate::command`]) to the output buffer. Every byte that
//! passes through, literal or copied, is fed into the owned [`HashChain`] so it
//! becomes a match source for later blocks.

use tcmplx_core::{Error, Result};
use tracing::trace;

use crate::command::{push_copy, push_literals, MAX_COMMAND_LEN};
use crate::hashchain::{HashChain, HASH_WIDTH};
use crate::ringslide::RingSlide;

/// Shortest copy the match finder emits.
pub const MIN_MATCH: usize = 3;

/// Distances below this are checked directly instead of through the chain,
/// since the chain only knows 3-byte windows that lie entirely in history.
const SHORT_DISTANCES: usize = HASH_WIDTH;

/// Pending input plus generated commands over a shared window.
#[derive(Debug, Clone)]
pub struct BlockBuf {
    chain: HashChain,
    input: Vec<u8>,
    output: Vec<u8>,
    capacity: usize,
}

impl BlockBuf {
    /// Create a buffer accepting up to `capacity` pending bytes, matching over
    /// a `window`-byte history with `chain_length` positions per hash bucket.
    pub fn new(capacity: usize, window: usize, chain_length: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::param("block capacity must be nonzero"));
        }
        Ok(BlockBuf {
            chain: HashChain::new(window, chain_length)?,
            input: Vec::new(),
            output: Vec::new(),
            capacity,
        })
    }

    /// Queue raw bytes for the next block.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let available = self.available();
        if bytes.len() > available {
            return Err(Error::BlockOverflow {
                requested: bytes.len(),
                available,
            });
        }
        self.input
            .try_reserve(bytes.len())
            .map_err(|_| Error::memory(bytes.len()))?;
        self.input.extend_from_slice(bytes);
        Ok(())
    }

    /// Generate commands for the pending input, leaving it queued.
    ///
    /// The window advances past the input, so a block must not be generated
    /// twice; follow with [`BlockBuf::clear_input`].
    pub fn try_block(&mut self) -> Result<()> {
        let start = self.output.len();
        let n = self.input.len();
        let mut i = 0;
        let mut literal_start = 0;

        while i < n {
            let first = self.longest_match(i);
            let (len1, dist1) = match first {
                Some(m) => m,
                None => {
                    self.chain.add(self.input[i])?;
                    i += 1;
                    continue;
                }
            };
            self.chain.add(self.input[i])?;

            // One step of lookahead: a longer match at i + 1 wins.
            let (at, len, dist) = match self.longest_match(i + 1) {
                Some((len2, dist2)) if len2 > len1 => (i + 1, len2, dist2),
                _ => (i, len1, dist1),
            };

            push_literals(&mut self.output, &self.input[literal_start..at]);
            push_copy(&mut self.output, len, dist)?;
            let first_unadded = i + 1;
            for &b in &self.input[first_unadded..at + len] {
                self.chain.add(b)?;
            }
            i = at + len;
            literal_start = i;
        }
        push_literals(&mut self.output, &self.input[literal_start..n]);

        trace!(
            input = n,
            commands = self.output.len() - start,
            "generated block"
        );
        Ok(())
    }

    /// Generate commands for the pending input and clear it.
    pub fn gen_block(&mut self) -> Result<()> {
        self.try_block()?;
        self.input.clear();
        Ok(())
    }

    /// Feed bytes into the window without queuing them as input.
    ///
    /// Decoders use this to keep the window in step with produced output.
    pub fn bypass(&mut self, bytes: &[u8]) -> Result<usize> {
        for &b in bytes {
            self.chain.add(b)?;
        }
        Ok(bytes.len())
    }

    /// Feed a single byte into the window.
    #[inline]
    pub fn bypass_byte(&mut self, byte: u8) -> Result<()> {
        self.chain.add(byte)
    }

    /// Byte `i + 1` steps back from the newest window byte.
    #[inline]
    pub fn peek(&self, i: usize) -> Result<u8> {
        self.chain.peek(i)
    }

    /// Pending input bytes.
    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// Number of pending input bytes.
    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    /// Drop pending input.
    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Maximum pending input.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Room left for pending input.
    pub fn available(&self) -> usize {
        self.capacity - self.input.len()
    }

    /// Accumulated command stream.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Drop the accumulated command stream.
    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Window and hash chains.
    pub fn chain(&self) -> &HashChain {
        &self.chain
    }

    /// Window of recent bytes.
    pub fn window(&self) -> &RingSlide {
        self.chain.window()
    }

    /// Forget input, output and history.
    pub fn reset(&mut self) {
        self.chain.clear();
        self.input.clear();
        self.output.clear();
    }

    /// Longest match for the input at `i`, given that `input[..i]` is
    /// already in the window.
    fn longest_match(&self, i: usize) -> Option<(usize, usize)> {
        let n = self.input.len();
        if i + MIN_MATCH > n {
            return None;
        }
        let limit = (n - i).min(MAX_COMMAND_LEN);
        let needle = [self.input[i], self.input[i + 1], self.input[i + 2]];

        let history = self.chain.size();
        let short = (1..SHORT_DISTANCES).filter(move |&d| d <= history);
        let mut best: Option<(usize, usize)> = None;
        for distance in short.chain(self.chain.candidates(&needle)) {
            let len = self.match_len(i, distance, limit);
            if len >= MIN_MATCH && best.map_or(true, |(l, _)| len > l) {
                best = Some((len, distance));
                if len == limit {
                    break;
                }
            }
        }
        best
    }

    /// Length of agreement between the input at `i` and the history
    /// `distance` bytes back, with the copy allowed to overlap itself.
    fn match_len(&self, i: usize, distance: usize, limit: usize) -> usize {
        let mut len = 0;
        while len < limit {
            let source = if len < distance {
                match self.chain.peek(distance - 1 - len) {
                    Ok(b) => b,
                    Err(_) => break,
                }
            } else {
                self.input[i + len - distance]
            };
            if source != self.input[i + len] {
                break;
            }
            len += 1;
        }
        len
    }
}
