//! Adler-32 checksum (RFC 1950).

const MOD_ADLER: u32 = 65521;

/// Largest run of bytes that can be summed before `b` may overflow a u32.
const NMAX: usize = 5552;

/// Running Adler-32 accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Adler32 {
    /// Start a new checksum.
    pub fn new() -> Self {
        Adler32 { a: 1, b: 0 }
    }

    /// Accumulate more bytes.
    pub fn update(&mut self, data: &[u8]) {
        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                self.a += byte as u32;
                self.b += self.a;
            }
            self.a %= MOD_ADLER;
            self.b %= MOD_ADLER;
        }
    }

    /// Accumulate a single byte.
    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        self.a = (self.a + byte as u32) % MOD_ADLER;
        self.b = (self.b + self.a) % MOD_ADLER;
    }

    /// Current checksum value.
    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

/// One-shot Adler-32.
pub fn adler32(data: &[u8]) -> u32 {
    let mut adler = Adler32::new();
    adler.update(data);
    adler.finish()
}
