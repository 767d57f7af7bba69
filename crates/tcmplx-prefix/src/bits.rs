//! LSB-first bit I/O shared by both bitstream formats.
//!
//! The reader keeps its bit buffer between calls so a decoder can stop in the
//! middle of a symbol and resume with the next input chunk. It only pulls a
//! byte when the bits already buffered do not satisfy a request, so at most
//! seven bits of a finished stream are ever held back.

/// Cursor over one caller-supplied input chunk.
#[derive(Debug)]
pub struct Source<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Source<'a> {
    /// Wrap an input chunk.
    pub fn new(data: &'a [u8]) -> Self {
        Source { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Bytes left.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take one byte.
    #[inline]
    pub fn next_byte(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    /// Take up to `n` bytes.
    pub fn take(&mut self, n: usize) -> &'a [u8] {
        let end = (self.pos + n).min(self.data.len());
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        bytes
    }
}

/// Resumable LSB-first bit reader.
#[derive(Debug, Clone, Default)]
pub struct BitReader {
    bit_buf: u64,
    bit_count: u32,
}

impl BitReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure at least `n` bits are buffered; `false` when input ran out.
    #[inline]
    pub fn fill(&mut self, src: &mut Source<'_>, n: u32) -> bool {
        debug_assert!(n <= 56);
        while self.bit_count < n {
            match src.next_byte() {
                Some(b) => {
                    self.bit_buf |= (b as u64) << self.bit_count;
                    self.bit_count += 8;
                }
                None => return false,
            }
        }
        true
    }

    /// Look at the next `n` buffered bits. Requires a successful `fill`.
    #[inline]
    pub fn peek(&self, n: u32) -> u32 {
        (self.bit_buf & ((1u64 << n) - 1)) as u32
    }

    /// Drop `n` buffered bits.
    #[inline]
    pub fn consume(&mut self, n: u32) {
        self.bit_buf >>= n;
        self.bit_count -= n;
    }

    /// Read `n <= 32` bits, or `None` (consuming nothing) when input ran out.
    #[inline]
    pub fn read(&mut self, src: &mut Source<'_>, n: u32) -> Option<u32> {
        if !self.fill(src, n) {
            return None;
        }
        let value = self.peek(n);
        self.consume(n);
        Some(value)
    }

    /// Bits currently buffered.
    pub fn available(&self) -> u32 {
        self.bit_count
    }

    /// Skip to the next byte boundary, returning the skipped padding bits.
    pub fn align(&mut self) -> u32 {
        let pad = self.bit_count % 8;
        let value = self.peek(pad);
        self.consume(pad);
        value
    }

    /// Move whole buffered bytes into `out` (after `align`), returning how
    /// many were moved.
    pub fn drain_bytes(&mut self, out: &mut [u8]) -> usize {
        let mut n = 0;
        while self.bit_count >= 8 && n < out.len() {
            out[n] = self.bit_buf as u8;
            self.consume(8);
            n += 1;
        }
        n
    }

    /// Drop all buffered bits.
    pub fn reset(&mut self) {
        self.bit_buf = 0;
        self.bit_count = 0;
    }
}

/// Reverse the low `len` bits of `code`.
#[inline]
pub fn reverse_bits(code: u32, len: u32) -> u32 {
    if len == 0 {
        return 0;
    }
    code.reverse_bits() >> (32 - len)
}

/// LSB-first bit writer with a drainable byte queue.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    start: usize,
    bit_buf: u64,
    bit_count: u32,
    total_bits: u64,
}

impl BitWriter {
    /// Create a new bit writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the low `n <= 32` bits of `value`.
    #[inline]
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32);
        if n == 0 {
            return;
        }
        self.bit_buf |= ((value as u64) & ((1u64 << n) - 1)) << self.bit_count;
        self.bit_count += n;
        self.total_bits += n as u64;
        while self.bit_count >= 8 {
            self.data.push(self.bit_buf as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
    }

    /// Write a prefix code, most significant code bit first.
    #[inline]
    pub fn write_code(&mut self, code: u16, len: u16) {
        self.write_bits(reverse_bits(code as u32, len as u32), len as u32);
    }

    /// Pad with zero bits to a byte boundary.
    pub fn align(&mut self) {
        if self.bit_count > 0 {
            let pad = 8 - self.bit_count;
            self.write_bits(0, pad);
        }
    }

    /// Write raw bytes after aligning.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.align();
        self.data.extend_from_slice(bytes);
        self.total_bits += 8 * bytes.len() as u64;
    }

    /// Append everything written to `other`, partial bits included.
    pub fn append(&mut self, other: &BitWriter) {
        for &b in &other.data[other.start..] {
            self.write_bits(b as u32, 8);
        }
        self.write_bits(other.bit_buf as u32, other.bit_count);
    }

    /// Total bits written since creation.
    pub fn bit_len(&self) -> u64 {
        self.total_bits
    }

    /// Bits not yet forming a complete byte.
    pub fn partial_bits(&self) -> u32 {
        self.bit_count
    }

    /// Complete bytes waiting to be drained.
    pub fn pending(&self) -> usize {
        self.data.len() - self.start
    }

    /// Move queued complete bytes into `out`, returning how many were moved.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let n = self.pending().min(out.len());
        out[..n].copy_from_slice(&self.data[self.start..self.start + n]);
        self.start += n;
        if self.start == self.data.len() {
            self.data.clear();
            self.start = 0;
        }
        n
    }

    /// Take all queued complete bytes.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        let bytes = self.data.split_off(self.start);
        self.data.clear();
        self.start = 0;
        bytes
    }

    /// Forget all queued output and partial bits.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
