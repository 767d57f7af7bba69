//! Fixed-capacity circular byte window.
//!
//! Backing storage grows geometrically on demand until it reaches the
//! configured extent, so a 16 MiB Brotli window costs nothing for short
//! streams.

use tcmplx_core::{Error, Result};

/// Smallest backing allocation once the first byte arrives.
const MIN_ALLOC: usize = 64;

/// Circular window over the most recent `extent` bytes.
#[derive(Debug, Clone)]
pub struct RingSlide {
    buf: Vec<u8>,
    extent: usize,
    size: usize,
    pos: usize,
}

impl RingSlide {
    /// Create a window holding at most `n` bytes.
    pub fn new(n: usize) -> Self {
        RingSlide {
            buf: Vec::new(),
            extent: n,
            size: 0,
            pos: 0,
        }
    }

    /// Append a byte, evicting the oldest one once the window is full.
    pub fn add(&mut self, byte: u8) -> Result<()> {
        if self.extent == 0 {
            return Ok(());
        }
        if self.buf.len() < self.extent {
            if self.buf.len() == self.buf.capacity() {
                let target = (self.buf.capacity() * 2).max(MIN_ALLOC).min(self.extent);
                self.buf
                    .try_reserve_exact(target - self.buf.len())
                    .map_err(|_| Error::memory(target))?;
            }
            self.buf.push(byte);
            self.pos = self.buf.len() % self.extent;
        } else {
            self.buf[self.pos] = byte;
            self.pos += 1;
            if self.pos == self.extent {
                self.pos = 0;
            }
        }
        if self.size < self.extent {
            self.size += 1;
        }
        Ok(())
    }

    /// Append a run of bytes.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            self.add(b)?;
        }
        Ok(())
    }

    /// Byte written `i + 1` steps before the most recent `add`.
    ///
    /// `peek(0)` is the newest byte.
    pub fn peek(&self, i: usize) -> Result<u8> {
        if i >= self.size {
            return Err(Error::out_of_range(i, self.size));
        }
        let cap = self.buf.len();
        let newest = if self.pos == 0 { cap - 1 } else { self.pos - 1 };
        let idx = if i <= newest {
            newest - i
        } else {
            cap - (i - newest)
        };
        Ok(self.buf[idx])
    }

    /// Bytes currently held (saturates at the extent).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Maximum number of bytes the window holds.
    pub fn extent(&self) -> usize {
        self.extent
    }

    /// Check whether nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Forget all bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.size = 0;
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_order() {
        let mut ring = RingSlide::new(8);
        ring.extend(b"abc").unwrap();
        assert_eq!(ring.size(), 3);
        assert_eq!(ring.peek(0).unwrap(), b'c');
        assert_eq!(ring.peek(1).unwrap(), b'b');
        assert_eq!(ring.peek(2).unwrap(), b'a');
        assert!(matches!(ring.peek(3), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn test_wraparound_keeps_newest() {
        let mut ring = RingSlide::new(4);
        ring.extend(b"abcdefg").unwrap();
        assert_eq!(ring.size(), 4);
        assert_eq!(ring.extent(), 4);
        let recent: Vec<u8> = (0..4).map(|i| ring.peek(i).unwrap()).collect();
        assert_eq!(recent, b"gfed");
    }

    #[test]
    fn test_growth_matches_reference() {
        let mut ring = RingSlide::new(1000);
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 7 + i / 13) as u8).collect();
        for (n, &b) in data.iter().enumerate() {
            ring.add(b).unwrap();
            let seen = &data[..=n];
            let held = ring.size();
            assert_eq!(held, seen.len().min(1000));
            for i in [0, held / 2, held - 1] {
                assert_eq!(ring.peek(i).unwrap(), seen[seen.len() - 1 - i]);
            }
        }
    }

    #[test]
    fn test_zero_extent_is_inert() {
        let mut ring = RingSlide::new(0);
        ring.add(1).unwrap();
        assert!(ring.is_empty());
        assert!(ring.peek(0).is_err());
    }

    #[test]
    fn test_clear() {
        let mut ring = RingSlide::new(16);
        ring.extend(b"xyz").unwrap();
        ring.clear();
        assert!(ring.is_empty());
        ring.add(b'q').unwrap();
        assert_eq!(ring.peek(0).unwrap(), b'q');
    }
}
