//! Distance codes and the recent-distance ring.
//!
//! DEFLATE numbers distances with four direct codes and no postfix bits.
//! Brotli prepends sixteen codes that reuse or adjust the four most recent
//! distances, then `NDIRECT` direct codes, then the general codes whose
//! low `NPOSTFIX` bits ride in the code itself.

use tcmplx_core::{Error, Result};

/// Codes that refer to the ring.
pub const SPECIAL_CODES: u32 = 16;

/// Largest `NDIRECT`.
pub const MAX_DIRECT: u32 = 120;

/// Largest `NPOSTFIX`.
pub const MAX_POSTFIX: u32 = 3;

/// Brotli's ring before any distance is used, most recent first.
const INITIAL_RING: [u32; 4] = [4, 11, 15, 16];

/// Which recent distance a special code draws from, and the adjustment.
const SPECIAL_TABLE: [(usize, i64); 16] = [
    (0, 0),
    (1, 0),
    (2, 0),
    (3, 0),
    (0, -1),
    (0, 1),
    (0, -2),
    (0, 2),
    (0, -3),
    (0, 3),
    (1, -1),
    (1, 1),
    (1, -2),
    (1, 2),
    (1, -3),
    (1, 3),
];

/// Distance codec with a four-slot history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingDist {
    ring: [u32; 4],
    /// Slot holding the most recent distance.
    index: usize,
    special_size: u32,
    direct_count: u32,
    postfix: u32,
    sum_direct: u32,
    direct_one: u32,
    postmask: u32,
}

impl RingDist {
    /// Create a codec. `special` enables the sixteen ring codes.
    pub fn new(special: bool, direct_count: u32, postfix: u32) -> Result<Self> {
        let mut ring = RingDist {
            ring: [0; 4],
            index: 0,
            special_size: 0,
            direct_count: 0,
            postfix: 0,
            sum_direct: 0,
            direct_one: 1,
            postmask: 0,
        };
        ring.reconfigure(special, direct_count, postfix)?;
        ring.reset();
        Ok(ring)
    }

    /// DEFLATE numbering: four direct codes, no ring codes.
    pub fn deflate() -> Self {
        RingDist {
            ring: [0; 4],
            index: 0,
            special_size: 0,
            direct_count: 4,
            postfix: 0,
            sum_direct: 4,
            direct_one: 5,
            postmask: 0,
        }
        .with_initial_ring()
    }

    fn with_initial_ring(mut self) -> Self {
        self.reset();
        self
    }

    /// Change the code layout. The distance history is kept.
    pub fn reconfigure(&mut self, special: bool, direct_count: u32, postfix: u32) -> Result<()> {
        if direct_count > MAX_DIRECT {
            return Err(Error::param(format!(
                "direct distance count {} exceeds {}",
                direct_count, MAX_DIRECT
            )));
        }
        if postfix > MAX_POSTFIX {
            return Err(Error::param(format!(
                "postfix bits {} exceeds {}",
                postfix, MAX_POSTFIX
            )));
        }
        self.special_size = if special { SPECIAL_CODES } else { 0 };
        self.direct_count = direct_count;
        self.postfix = postfix;
        self.sum_direct = self.special_size + direct_count;
        self.direct_one = direct_count + 1;
        self.postmask = (1 << postfix) - 1;
        Ok(())
    }

    /// Restore the initial history.
    pub fn reset(&mut self) {
        for (k, &d) in INITIAL_RING.iter().enumerate() {
            self.ring[(4 - k) % 4] = d;
        }
        self.index = 0;
    }

    /// Distance used `k` commands ago (0 is the most recent).
    #[inline]
    pub fn nth_last(&self, k: usize) -> u32 {
        self.ring[(self.index + 4 - (k & 3)) % 4]
    }

    /// Most recent distance.
    #[inline]
    pub fn last(&self) -> u32 {
        self.nth_last(0)
    }

    fn push(&mut self, distance: u32) {
        self.index = (self.index + 1) % 4;
        self.ring[self.index] = distance;
    }

    /// Whether ring codes are enabled.
    pub fn is_special(&self) -> bool {
        self.special_size != 0
    }

    /// `NDIRECT`.
    pub fn direct_count(&self) -> u32 {
        self.direct_count
    }

    /// `NPOSTFIX`.
    pub fn postfix(&self) -> u32 {
        self.postfix
    }

    /// Number of distance codes in the alphabet, given the largest extra-bit
    /// count the format allows (13 for DEFLATE, 24 for Brotli).
    pub fn alphabet_size(&self, max_extra_bits: u32) -> u32 {
        self.sum_direct + ((max_extra_bits * 2) << self.postfix)
    }

    /// Extra bits that follow `dcode`.
    #[inline]
    pub fn bit_count(&self, dcode: u32) -> u32 {
        if dcode < self.sum_direct {
            0
        } else {
            1 + ((dcode - self.sum_direct) >> (self.postfix + 1))
        }
    }

    /// Resolve a distance code and its extra bits to a backward distance.
    ///
    /// Every code except 0 records the result in the ring.
    pub fn decode(&mut self, dcode: u32, extra: u32) -> Result<u32> {
        let distance = if dcode < self.special_size {
            let (k, adjust) = SPECIAL_TABLE[dcode as usize];
            let value = self.nth_last(k) as i64 + adjust;
            if value <= 0 {
                return Err(Error::RingDistUnderflow);
            }
            if value > u32::MAX as i64 {
                return Err(Error::RingDistOverflow);
            }
            value as u32
        } else if dcode < self.sum_direct {
            dcode - self.special_size + 1
        } else {
            let rel = (dcode - self.sum_direct) as u64;
            let ndistbits = 1 + (rel >> (self.postfix + 1));
            let hcode = rel >> self.postfix;
            let low = rel & self.postmask as u64;
            if ndistbits > 31 {
                return Err(Error::RingDistOverflow);
            }
            let offset = ((2 | (hcode & 1)) << ndistbits) - 4;
            let value = ((offset + extra as u64) << self.postfix) + low + self.direct_one as u64;
            if value > u32::MAX as u64 {
                return Err(Error::RingDistOverflow);
            }
            value as u32
        };
        if dcode != 0 {
            self.push(distance);
        }
        Ok(distance)
    }

    /// Choose the code and extra bits for a backward distance.
    ///
    /// Updates the ring the same way [`RingDist::decode`] would for the
    /// returned code.
    pub fn encode(&mut self, back: u32) -> Result<(u32, u32)> {
        if back == 0 || back >= 0xFFFF_FFFC {
            return Err(Error::param(format!("distance {} cannot be coded", back)));
        }
        if self.special_size != 0 {
            if let Some(dcode) = self.special_code(back) {
                if dcode != 0 {
                    self.push(back);
                }
                return Ok((dcode, 0));
            }
        }
        if back <= self.direct_count {
            self.push(back);
            return Ok((self.special_size + back - 1, 0));
        }
        let d = (back - self.direct_one) as u64;
        let low = d & self.postmask as u64;
        let ox = (d >> self.postfix) + 4;
        let ndistbits = (64 - ox.leading_zeros() as u64) - 2;
        let hbit = (ox >> ndistbits) & 1;
        let offset = ((2 | hbit) << ndistbits) - 4;
        let extra = (d >> self.postfix) - offset;
        let dcode =
            self.sum_direct as u64 + (((((ndistbits - 1) << 1) | hbit) << self.postfix) | low);
        self.push(back);
        Ok((dcode as u32, extra as u32))
    }

    fn special_code(&self, back: u32) -> Option<u32> {
        if let Some(k) = (0..4).find(|&k| self.nth_last(k) == back) {
            return Some(k as u32);
        }
        (4..SPECIAL_CODES).find(|&code| {
            let (k, adjust) = SPECIAL_TABLE[code as usize];
            self.nth_last(k) as i64 + adjust == back as i64
        })
    }
}
