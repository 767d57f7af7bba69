//! Insert/copy length alphabets.
//!
//! Each alphabet symbol maps to a row describing the literal, stop marker or
//! length range it stands for. Rows are generated from the RFC formulas: a
//! per-code extra-bit count, with each range starting where the previous one
//! ended.

use std::cmp::Ordering;

use tcmplx_core::{Error, Result};

/// What an alphabet symbol means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// DEFLATE literal byte (the code is the byte).
    Literal,
    /// DEFLATE end of block.
    Stop,
    /// DEFLATE match length.
    Copy,
    /// DEFLATE match length whose range drops its last value (code 284).
    CopyMinus1,
    /// Brotli insert-and-copy length pair.
    InsertCopy,
    /// Brotli block count.
    BlockCount,
}

/// One alphabet symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsCopyRow {
    pub kind: RowKind,
    /// Brotli: the command reuses the last distance and sends no distance code.
    pub zero_distance: bool,
    pub insert_bits: u8,
    pub copy_bits: u8,
    pub insert_first: u32,
    pub copy_first: u32,
    pub code: u16,
}

impl InsCopyRow {
    /// One past the largest insert length (or block count) this row covers.
    pub fn insert_end(&self) -> u64 {
        self.insert_first as u64 + (1u64 << self.insert_bits)
    }

    /// One past the largest copy length this row covers.
    pub fn copy_end(&self) -> u64 {
        let end = self.copy_first as u64 + (1u64 << self.copy_bits);
        match self.kind {
            RowKind::CopyMinus1 => end - 1,
            _ => end,
        }
    }

    /// Insert length for a decoded extra-bits value.
    #[inline]
    pub fn insert_len(&self, extra: u32) -> u32 {
        self.insert_first + extra
    }

    /// Copy length for a decoded extra-bits value.
    #[inline]
    pub fn copy_len(&self, extra: u32) -> u32 {
        self.copy_first + extra
    }

    fn cmp_lengths(&self, zero_distance: bool, insert: u32, copy: u32) -> Ordering {
        let key = |v: u32, first: u32, end: u64| {
            if (v as u64) < first as u64 {
                Ordering::Greater
            } else if v as u64 >= end {
                Ordering::Less
            } else {
                Ordering::Equal
            }
        };
        self.zero_distance
            .cmp(&zero_distance)
            .then_with(|| key(insert, self.insert_first, self.insert_end()))
            .then_with(|| key(copy, self.copy_first, self.copy_end()))
    }
}

/// Alphabet presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePreset {
    /// DEFLATE literal/length alphabet, 286 symbols.
    Deflate,
    /// Brotli insert-and-copy alphabet, 704 symbols.
    BrotliInsertCopy,
    /// Brotli block count alphabet, 26 symbols.
    BrotliBlockCount,
}

const DEFLATE_COPY_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

const BROTLI_INSERT_BITS: [u8; 24] = [
    0, 0, 0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 7, 8, 9, 10, 12, 14, 24,
];

const BROTLI_COPY_BITS: [u8; 24] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 7, 8, 9, 10, 24,
];

const BROTLI_BLOCK_COUNT_BITS: [u8; 26] = [
    2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 6, 6, 7, 8, 9, 10, 11, 12, 13, 24,
];

/// Insert code base, copy code base and zero-distance flag per 64-symbol cell.
const BROTLI_CELLS: [(usize, usize, bool); 11] = [
    (0, 0, true),
    (0, 8, true),
    (0, 0, false),
    (0, 8, false),
    (8, 0, false),
    (8, 8, false),
    (0, 16, false),
    (16, 0, false),
    (8, 16, false),
    (16, 8, false),
    (16, 16, false),
];

/// Cumulative range starts for a run of extra-bit counts.
fn bases(bits: &[u8], first: u32) -> Vec<u32> {
    let mut next = first;
    bits.iter()
        .map(|&b| {
            let base = next;
            next += 1 << b;
            base
        })
        .collect()
}

/// A generated alphabet.
///
/// Rows are indexed by code for decoding; a second index ordered by length
/// range serves [`InsCopyTable::encode`].
#[derive(Debug, Clone)]
pub struct InsCopyTable {
    preset: TablePreset,
    rows: Vec<InsCopyRow>,
    by_range: Vec<u16>,
}

impl InsCopyTable {
    /// Generate an alphabet.
    pub fn new(preset: TablePreset) -> Self {
        let rows = match preset {
            TablePreset::Deflate => Self::deflate_rows(),
            TablePreset::BrotliInsertCopy => Self::insert_copy_rows(),
            TablePreset::BrotliBlockCount => Self::block_count_rows(),
        };
        let mut by_range: Vec<u16> = rows
            .iter()
            .filter(|row| !matches!(row.kind, RowKind::Literal | RowKind::Stop))
            .map(|row| row.code)
            .collect();
        by_range.sort_by_key(|&code| {
            let row = &rows[code as usize];
            (row.zero_distance, row.insert_first, row.copy_first)
        });
        InsCopyTable {
            preset,
            rows,
            by_range,
        }
    }

    fn deflate_rows() -> Vec<InsCopyRow> {
        let mut rows = Vec::with_capacity(286);
        for code in 0..=256u16 {
            rows.push(InsCopyRow {
                kind: if code < 256 {
                    RowKind::Literal
                } else {
                    RowKind::Stop
                },
                zero_distance: false,
                insert_bits: 0,
                copy_bits: 0,
                insert_first: 0,
                copy_first: 0,
                code,
            });
        }
        let copy_bases = bases(&DEFLATE_COPY_BITS[..28], 3);
        for (i, (&bits, &first)) in DEFLATE_COPY_BITS[..28].iter().zip(&copy_bases).enumerate() {
            rows.push(InsCopyRow {
                kind: if i == 27 {
                    RowKind::CopyMinus1
                } else {
                    RowKind::Copy
                },
                zero_distance: false,
                insert_bits: 0,
                copy_bits: bits,
                insert_first: 0,
                copy_first: first,
                code: 257 + i as u16,
            });
        }
        rows.push(InsCopyRow {
            kind: RowKind::Copy,
            zero_distance: false,
            insert_bits: 0,
            copy_bits: 0,
            insert_first: 0,
            copy_first: 258,
            code: 285,
        });
        rows
    }

    fn insert_copy_rows() -> Vec<InsCopyRow> {
        let insert_bases = bases(&BROTLI_INSERT_BITS, 0);
        let copy_bases = bases(&BROTLI_COPY_BITS, 2);
        let mut rows = Vec::with_capacity(704);
        for code in 0..704usize {
            let (insert_base, copy_base, zero_distance) = BROTLI_CELLS[code >> 6];
            let insert_code = insert_base + ((code >> 3) & 7);
            let copy_code = copy_base + (code & 7);
            rows.push(InsCopyRow {
                kind: RowKind::InsertCopy,
                zero_distance,
                insert_bits: BROTLI_INSERT_BITS[insert_code],
                copy_bits: BROTLI_COPY_BITS[copy_code],
                insert_first: insert_bases[insert_code],
                copy_first: copy_bases[copy_code],
                code: code as u16,
            });
        }
        rows
    }

    fn block_count_rows() -> Vec<InsCopyRow> {
        let count_bases = bases(&BROTLI_BLOCK_COUNT_BITS, 1);
        BROTLI_BLOCK_COUNT_BITS
            .iter()
            .zip(&count_bases)
            .enumerate()
            .map(|(code, (&bits, &first))| InsCopyRow {
                kind: RowKind::BlockCount,
                zero_distance: false,
                insert_bits: bits,
                copy_bits: 0,
                insert_first: first,
                copy_first: 0,
                code: code as u16,
            })
            .collect()
    }

    /// Which alphabet this is.
    pub fn preset(&self) -> TablePreset {
        self.preset
    }

    /// Alphabet size.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false for a generated alphabet.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for a decoded symbol.
    #[inline]
    pub fn get(&self, code: usize) -> Result<&InsCopyRow> {
        self.rows
            .get(code)
            .ok_or_else(|| Error::out_of_range(code, self.rows.len()))
    }

    /// All rows in code order.
    pub fn rows(&self) -> &[InsCopyRow] {
        &self.rows
    }

    /// Find the symbol whose ranges cover an insert/copy length pair.
    ///
    /// For DEFLATE pass `insert = 0`; for block counts pass the count as
    /// `insert` and `copy = 0`. The zero-distance flag must match exactly.
    pub fn encode(&self, insert: u32, copy: u32, zero_distance: bool) -> Result<&InsCopyRow> {
        self.by_range
            .binary_search_by(|&code| {
                self.rows[code as usize].cmp_lengths(zero_distance, insert, copy)
            })
            .map(|i| &self.rows[self.by_range[i] as usize])
            .map_err(|_| Error::InsCopyMissing { insert, copy })
    }
}
