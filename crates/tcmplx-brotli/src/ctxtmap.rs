//! Context modes and context maps (RFC 7932 sections 7.1 to 7.3).

use tcmplx_core::{Error, Result};

/// Contexts per literal block type.
pub const LITERAL_CONTEXTS: usize = 64;

/// Contexts per distance block type.
pub const DISTANCE_CONTEXTS: usize = 4;

/// How a literal's context id is derived from the two previous bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextMode {
    Lsb6,
    Msb6,
    Utf8,
    Signed,
}

impl ContextMode {
    /// All modes in wire order.
    pub const ALL: [ContextMode; 4] = [
        ContextMode::Lsb6,
        ContextMode::Msb6,
        ContextMode::Utf8,
        ContextMode::Signed,
    ];

    /// Mode for a two-bit wire value.
    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 3) as usize]
    }

    /// Two-bit wire value.
    pub fn bits(self) -> u32 {
        match self {
            ContextMode::Lsb6 => 0,
            ContextMode::Msb6 => 1,
            ContextMode::Utf8 => 2,
            ContextMode::Signed => 3,
        }
    }
}

#[rustfmt::skip]
static LUT0: [u8; 256] = [
     0,  0,  0,  0,  0,  0,  0,  0,  0,  4,  4,  0,  0,  4,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,
     8, 12, 16, 12, 12, 20, 12, 16, 24, 28, 12, 12, 32, 12, 36, 12,
    44, 44, 44, 44, 44, 44, 44, 44, 44, 44, 32, 32, 24, 40, 28, 12,
    12, 48, 52, 52, 52, 48, 52, 52, 52, 48, 52, 52, 52, 52, 52, 48,
    52, 52, 52, 52, 52, 48, 52, 52, 52, 52, 52, 24, 12, 28, 12, 12,
    12, 56, 60, 60, 60, 56, 60, 60, 60, 56, 60, 60, 60, 60, 60, 56,
    60, 60, 60, 60, 60, 56, 60, 60, 60, 60, 60, 24, 12, 28, 12,  0,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
];

#[rustfmt::skip]
static LUT1: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1,
    1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1,
    1, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 1, 1, 1, 1, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
];

/// Signed-mode bucket of a byte: 0 for 0, 7 for 255, widening toward the
/// middle of the range.
#[inline]
pub fn signed_bucket(byte: u8) -> u8 {
    match byte {
        0 => 0,
        1..=15 => 1,
        16..=63 => 2,
        64..=127 => 3,
        128..=191 => 4,
        192..=239 => 5,
        240..=254 => 6,
        255 => 7,
    }
}

/// Context id (0..64) of a literal given the previous two bytes.
#[inline]
pub fn literal_context(mode: ContextMode, p1: u8, p2: u8) -> u8 {
    match mode {
        ContextMode::Lsb6 => p1 & 0x3F,
        ContextMode::Msb6 => p1 >> 2,
        ContextMode::Utf8 => LUT0[p1 as usize] | LUT1[p2 as usize],
        ContextMode::Signed => (signed_bucket(p1) << 3) | signed_bucket(p2),
    }
}

/// Context id (0..4) of a distance given its copy length.
#[inline]
pub fn distance_context(copy_len: u32) -> Result<u8> {
    match copy_len {
        0 | 1 => Err(Error::param(format!(
            "copy length {} has no distance context",
            copy_len
        ))),
        2 => Ok(0),
        3 => Ok(1),
        4 => Ok(2),
        _ => Ok(3),
    }
}

/// Block type by context matrix of prefix tree ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMap {
    btypes: usize,
    ctxts: usize,
    data: Vec<u8>,
}

impl ContextMap {
    /// Create an all-zero map.
    pub fn new(btypes: usize, ctxts: usize) -> Result<Self> {
        let size = btypes
            .checked_mul(ctxts)
            .ok_or_else(|| Error::param("context map too large"))?;
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| Error::memory(size))?;
        data.resize(size, 0);
        Ok(ContextMap {
            btypes,
            ctxts,
            data,
        })
    }

    /// Number of block types (rows).
    pub fn btypes(&self) -> usize {
        self.btypes
    }

    /// Contexts per block type (columns).
    pub fn ctxts(&self) -> usize {
        self.ctxts
    }

    /// Tree id for a block type and context.
    #[inline]
    pub fn get(&self, btype: usize, ctxt: usize) -> u8 {
        self.data[btype * self.ctxts + ctxt]
    }

    /// Set a cell.
    pub fn set(&mut self, btype: usize, ctxt: usize, tree: u8) -> Result<()> {
        if btype >= self.btypes || ctxt >= self.ctxts {
            return Err(Error::out_of_range(btype * self.ctxts + ctxt, self.data.len()));
        }
        self.data[btype * self.ctxts + ctxt] = tree;
        Ok(())
    }

    /// Row for one block type.
    pub fn row(&self, btype: usize) -> &[u8] {
        &self.data[btype * self.ctxts..(btype + 1) * self.ctxts]
    }

    /// Cells in row-major order.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable cells in row-major order.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Number of distinct trees referenced (largest id plus one).
    pub fn tree_count(&self) -> usize {
        self.data.iter().max().map_or(0, |&m| m as usize + 1)
    }

    /// Replace each cell by its move-to-front rank.
    pub fn apply_movetofront(&mut self) {
        let mut list = identity();
        for cell in &mut self.data {
            let value = *cell;
            let rank = list.iter().position(|&v| v == value).unwrap_or(0);
            list.copy_within(0..rank, 1);
            list[0] = value;
            *cell = rank as u8;
        }
    }

    /// Undo [`ContextMap::apply_movetofront`].
    pub fn revert_movetofront(&mut self) {
        let mut list = identity();
        for cell in &mut self.data {
            let rank = *cell as usize;
            let value = list[rank];
            list.copy_within(0..rank, 1);
            list[0] = value;
            *cell = value;
        }
    }
}

fn identity() -> [u8; 256] {
    let mut list = [0u8; 256];
    for (i, v) in list.iter_mut().enumerate() {
        *v = i as u8;
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_modes() {
        assert_eq!(literal_context(ContextMode::Lsb6, 0xFF, 0), 63);
        assert_eq!(literal_context(ContextMode::Msb6, 0xFF, 0), 63);
        assert_eq!(literal_context(ContextMode::Msb6, 0x04, 0xFF), 1);
    }

    #[test]
    fn test_utf8_mode() {
        // Space after a letter, lowercase vowel after an uppercase letter.
        assert_eq!(literal_context(ContextMode::Utf8, b' ', b'a'), 8 | 3);
        assert_eq!(literal_context(ContextMode::Utf8, b'e', b'T'), 56 | 2);
        assert_eq!(literal_context(ContextMode::Utf8, b'7', b'0'), 44 | 2);
        // Continuation bytes; a 0xC0..=0xCF lead two back adds nothing.
        assert_eq!(literal_context(ContextMode::Utf8, 0x81, 0xC3), 1);
        assert_eq!(literal_context(ContextMode::Utf8, 0xA9, 0xC3), 1);
        assert_eq!(literal_context(ContextMode::Utf8, 0x81, 0xD0), 1 | 2);
        assert_eq!(literal_context(ContextMode::Utf8, 0xC2, 0x80), 2);
        assert!((0..=255u8).all(|b| literal_context(ContextMode::Utf8, b, b) < 64));
    }

    #[test]
    fn test_utf8_tables() {
        // RFC 7932 section 7.1: LUT1 classes the byte two back.
        let lut1 = |b: u8| match b {
            0x21..=0x2F | 0x3A..=0x40 | 0x5B..=0x60 | 0x7B..=0x7E => 1,
            b'0'..=b'9' | b'A'..=b'Z' | 0xD0..=0xFF => 2,
            b'a'..=b'z' => 3,
            _ => 0,
        };
        for b in 0..=255u8 {
            assert_eq!(LUT1[b as usize], lut1(b), "LUT1[{:#04x}]", b);
        }
        // LUT0 upper half: continuation and lead bytes keep their low bit.
        for b in 0x80..=0xFFu8 {
            let class = if b < 0xC0 { 0 } else { 2 };
            assert_eq!(LUT0[b as usize], class | (b & 1), "LUT0[{:#04x}]", b);
        }
        let ascii = [
            (b'\t', 4), (b'\n', 4), (b'\r', 4), (b' ', 8), (b'!', 12), (b'"', 16),
            (b'%', 20), (b'(', 24), (b')', 28), (b',', 32), (b'.', 36), (b'=', 40),
            (b'0', 44), (b'9', 44), (b'A', 48), (b'B', 52), (b'a', 56), (b'b', 60),
            (b'{', 24), (b'}', 28), (0x7F, 0), (0x00, 0),
        ];
        for (b, class) in ascii {
            assert_eq!(LUT0[b as usize], class, "LUT0[{:#04x}]", b);
        }
    }

    #[test]
    fn test_signed_mode() {
        assert_eq!(literal_context(ContextMode::Signed, 0, 0), 0);
        assert_eq!(literal_context(ContextMode::Signed, 255, 255), 63);
        assert_eq!(literal_context(ContextMode::Signed, 128, 1), (4 << 3) | 1);
        let counts = (0..=255u8).fold([0usize; 8], |mut c, b| {
            c[signed_bucket(b) as usize] += 1;
            c
        });
        assert_eq!(counts, [1, 15, 48, 64, 64, 48, 15, 1]);
    }

    #[test]
    fn test_distance_context() {
        assert_eq!(distance_context(2).unwrap(), 0);
        assert_eq!(distance_context(3).unwrap(), 1);
        assert_eq!(distance_context(4).unwrap(), 2);
        assert_eq!(distance_context(500).unwrap(), 3);
        assert!(distance_context(1).is_err());
    }

    #[test]
    fn test_mode_bits() {
        for mode in ContextMode::ALL {
            assert_eq!(ContextMode::from_bits(mode.bits()), mode);
        }
    }

    #[test]
    fn test_movetofront_example() {
        let mut map = ContextMap::new(1, 6).unwrap();
        map.as_mut_slice().copy_from_slice(&[1, 1, 0, 2, 2, 1]);
        map.apply_movetofront();
        assert_eq!(map.as_slice(), &[1, 0, 1, 2, 0, 2]);
        map.revert_movetofront();
        assert_eq!(map.as_slice(), &[1, 1, 0, 2, 2, 1]);
    }

    #[test]
    fn test_map_cells() {
        let mut map = ContextMap::new(2, LITERAL_CONTEXTS).unwrap();
        map.set(1, 5, 3).unwrap();
        assert_eq!(map.get(1, 5), 3);
        assert_eq!(map.row(1)[5], 3);
        assert_eq!(map.tree_count(), 4);
        assert!(map.set(2, 0, 1).is_err());
    }
}
