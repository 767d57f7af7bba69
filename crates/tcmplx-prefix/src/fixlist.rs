//! Prefix code lists.
//!
//! A [`PrefixList`] is a fixed-size array of `(code, len, value)` lines. Codes
//! are canonical: shorter codes first, ties broken by ascending value. A list
//! is searched by code bits while decoding (after [`PrefixList::codesort`]) and
//! by value while encoding (after [`PrefixList::valuesort`]).

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tcmplx_core::{Error, Result};
use tracing::trace;

use crate::bits::{BitReader, BitWriter, Source};

/// Longest code length either format allows.
pub const MAX_CODE_BITS: u16 = 15;

/// Largest alphabet a list may hold.
pub const MAX_SYMBOLS: usize = 32768;

/// Code space in `2^-15` units.
const KRAFT_TOTAL: u32 = 1 << MAX_CODE_BITS;

/// One symbol of a prefix code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefixLine {
    /// Code bits, most significant bit sent first.
    pub code: u16,
    /// Code length in bits; zero means the symbol is unused.
    pub len: u16,
    /// Symbol value.
    pub value: u64,
}

/// Fixed prefix code shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Brotli code for code-length code lengths (values 0..=5).
    BrotliComplex,
    /// Brotli simple code, two symbols.
    BrotliSimple2,
    /// Brotli simple code, three symbols.
    BrotliSimple3,
    /// Brotli simple code, four symbols, tree-select 0.
    BrotliSimple4,
    /// Brotli simple code, four symbols, tree-select 1.
    BrotliSimple4Select,
    /// Brotli WBITS header code (values are window bits).
    WindowBits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    Unsorted,
    ByCode,
    ByValue,
}

/// Array of prefix code lines.
#[derive(Debug, Clone)]
pub struct PrefixList {
    lines: Vec<PrefixLine>,
    order: SortOrder,
    /// `starts[l]..starts[l + 1]` holds the length-`l` lines when sorted by code.
    starts: [u32; MAX_CODE_BITS as usize + 2],
    max_len: u16,
    single: bool,
}

impl PrefixList {
    /// Create `n` unused lines with values `0..n`.
    pub fn new(n: usize) -> Result<Self> {
        let mut lines = Vec::new();
        lines
            .try_reserve_exact(n)
            .map_err(|_| Error::memory(n * std::mem::size_of::<PrefixLine>()))?;
        lines.extend((0..n).map(|i| PrefixLine {
            code: 0,
            len: 0,
            value: i as u64,
        }));
        Ok(PrefixList {
            lines,
            order: SortOrder::ByValue,
            starts: [0; MAX_CODE_BITS as usize + 2],
            max_len: 0,
            single: false,
        })
    }

    /// Build a canonical code from per-value lengths and sort it by code.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        let mut list = Self::new(lengths.len())?;
        for (line, &len) in list.lines.iter_mut().zip(lengths) {
            line.len = len as u16;
        }
        list.gen_codes()?;
        list.codesort();
        Ok(list)
    }

    /// A one-symbol code that decodes without reading any bits.
    pub fn single(value: u64) -> Self {
        let mut list = PrefixList {
            lines: vec![PrefixLine {
                code: 0,
                len: 0,
                value,
            }],
            order: SortOrder::ByValue,
            starts: [0; MAX_CODE_BITS as usize + 2],
            max_len: 0,
            single: true,
        };
        list.codesort();
        list
    }

    /// Load a fixed code shape.
    pub fn preset(preset: Preset) -> Result<Self> {
        let lengths: &[u8] = match preset {
            Preset::BrotliComplex => &[2, 4, 3, 2, 2, 4],
            Preset::BrotliSimple2 => &[1, 1],
            Preset::BrotliSimple3 => &[1, 2, 2],
            Preset::BrotliSimple4 => &[2, 2, 2, 2],
            Preset::BrotliSimple4Select => &[1, 2, 3, 3],
            Preset::WindowBits => return Ok(Self::window_bits()),
        };
        let mut list = Self::new(lengths.len())?;
        for (line, &len) in list.lines.iter_mut().zip(lengths) {
            line.len = len as u16;
        }
        if preset == Preset::BrotliComplex {
            list.gen_codes()?;
            list.codesort();
        } else {
            // Simple codes take their values from the stream; callers assign
            // values and then call gen_codes.
            list.order = SortOrder::Unsorted;
        }
        Ok(list)
    }

    /// WBITS is not canonical, so its lines are written out. Codes are the
    /// header bits in stream order.
    fn window_bits() -> Self {
        let mut lines = vec![PrefixLine {
            code: 0,
            len: 1,
            value: 16,
        }];
        for n in 1..=7u32 {
            lines.push(PrefixLine {
                code: (0b1000 | crate::bits::reverse_bits(n, 3)) as u16,
                len: 4,
                value: 17 + n as u64,
            });
        }
        lines.push(PrefixLine {
            code: 0b100_0000,
            len: 7,
            value: 17,
        });
        for m in 2..=7u32 {
            lines.push(PrefixLine {
                code: (0b100_0000 | crate::bits::reverse_bits(m, 3)) as u16,
                len: 7,
                value: 8 + m as u64,
            });
        }
        let mut list = PrefixList {
            lines,
            order: SortOrder::Unsorted,
            starts: [0; MAX_CODE_BITS as usize + 2],
            max_len: 0,
            single: false,
        };
        list.codesort();
        list
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check for an empty list.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All lines in current order.
    pub fn lines(&self) -> &[PrefixLine] {
        &self.lines
    }

    /// Mutable lines; invalidates the sort order.
    pub fn lines_mut(&mut self) -> &mut [PrefixLine] {
        self.order = SortOrder::Unsorted;
        &mut self.lines
    }

    /// Line at `index`.
    pub fn get(&self, index: usize) -> Result<&PrefixLine> {
        self.lines
            .get(index)
            .ok_or_else(|| Error::out_of_range(index, self.lines.len()))
    }

    /// Longest code length in use.
    pub fn max_len(&self) -> u16 {
        self.max_len
    }

    /// Check for a zero-bit single-symbol code.
    pub fn is_single(&self) -> bool {
        self.single
    }

    /// Assign canonical codes from the current lengths.
    ///
    /// Leaves the list sorted by value. An empty code, a single symbol of
    /// length 1, or an exactly complete code are accepted; anything else is
    /// [`Error::FixCodeAlloc`].
    pub fn gen_codes(&mut self) -> Result<()> {
        self.valuesort();
        let mut bl_count = [0u32; MAX_CODE_BITS as usize + 1];
        let mut kraft = 0u32;
        let mut used = 0usize;
        for line in &self.lines {
            if line.len > MAX_CODE_BITS {
                return Err(Error::fix_len_range(format!(
                    "code length {} exceeds {}",
                    line.len, MAX_CODE_BITS
                )));
            }
            if line.len > 0 {
                bl_count[line.len as usize] += 1;
                kraft += KRAFT_TOTAL >> line.len;
                used += 1;
            }
        }
        if kraft > KRAFT_TOTAL {
            return Err(Error::fix_code_alloc("over-subscribed code"));
        }
        let lone_bit = used == 1 && bl_count[1] == 1;
        if kraft < KRAFT_TOTAL && used > 0 && !lone_bit {
            return Err(Error::fix_code_alloc("incomplete code"));
        }

        let mut next_code = [0u32; MAX_CODE_BITS as usize + 1];
        let mut code = 0u32;
        for bits in 1..=MAX_CODE_BITS as usize {
            next_code[bits] = code;
            code = (code + bl_count[bits]) << 1;
        }
        let mut max_len = 0;
        for line in &mut self.lines {
            if line.len > 0 {
                line.code = next_code[line.len as usize] as u16;
                next_code[line.len as usize] += 1;
                max_len = max_len.max(line.len);
            } else {
                line.code = 0;
            }
        }
        self.max_len = max_len;
        self.single = false;
        Ok(())
    }

    /// Sort by `(len, code)` with unused lines last, enabling code search.
    pub fn codesort(&mut self) {
        self.lines
            .sort_by_key(|line| (line.len == 0, line.len, line.code));
        self.starts = [0; MAX_CODE_BITS as usize + 2];
        let mut max_len = 0;
        for line in &self.lines {
            if line.len > 0 {
                self.starts[line.len as usize + 1] += 1;
                max_len = max_len.max(line.len);
            }
        }
        for l in 1..self.starts.len() {
            self.starts[l] += self.starts[l - 1];
        }
        self.max_len = max_len;
        self.order = SortOrder::ByCode;
    }

    /// Sort by value, enabling value search.
    pub fn valuesort(&mut self) {
        if self.order != SortOrder::ByValue {
            self.lines.sort_by_key(|line| line.value);
            self.order = SortOrder::ByValue;
        }
    }

    /// Index of the line with this length and code. Requires code order.
    pub fn codebsearch(&self, len: u16, code: u16) -> Option<usize> {
        if self.order != SortOrder::ByCode || len == 0 || len > MAX_CODE_BITS {
            return None;
        }
        let lo = self.starts[len as usize] as usize;
        let hi = self.starts[len as usize + 1] as usize;
        self.lines[lo..hi]
            .binary_search_by_key(&code, |line| line.code)
            .ok()
            .map(|i| lo + i)
    }

    /// Index of the line with this value. Requires value order.
    pub fn valuebsearch(&self, value: u64) -> Option<usize> {
        if self.order != SortOrder::ByValue {
            return None;
        }
        self.lines
            .binary_search_by_key(&value, |line| line.value)
            .ok()
    }

    /// Decode one symbol, walking code lengths upward.
    ///
    /// Returns `Ok(None)` without consuming bits when the input runs out
    /// mid-symbol; buffered bits stay in `reader` for the next call.
    pub fn decode(&self, reader: &mut BitReader, src: &mut Source<'_>) -> Result<Option<u64>> {
        if self.order != SortOrder::ByCode {
            return Err(Error::param("prefix list not sorted by code"));
        }
        if self.single {
            return Ok(Some(self.lines[0].value));
        }
        let mut code = 0u16;
        for len in 1..=self.max_len {
            if !reader.fill(src, len as u32) {
                return Ok(None);
            }
            let bit = (reader.peek(len as u32) >> (len - 1)) & 1;
            code = (code << 1) | bit as u16;
            if let Some(index) = self.codebsearch(len, code) {
                reader.consume(len as u32);
                return Ok(Some(self.lines[index].value));
            }
        }
        Err(Error::sanitize("invalid prefix code"))
    }

    /// Write the code for `value`. Requires value order, except for a
    /// [`single`](PrefixList::single) list, which writes no bits.
    pub fn encode(&self, writer: &mut BitWriter, value: u64) -> Result<()> {
        if self.single {
            return if self.lines[0].value == value {
                Ok(())
            } else {
                Err(Error::param(format!("symbol {} not in prefix list", value)))
            };
        }
        let index = self
            .valuebsearch(value)
            .ok_or_else(|| Error::param(format!("symbol {} not in prefix list", value)))?;
        let line = &self.lines[index];
        if line.len == 0 {
            return Err(Error::param(format!("symbol {} has no code", value)));
        }
        writer.write_code(line.code, line.len);
        Ok(())
    }

    /// Code length for `value` (zero when unused or absent). Requires value order.
    pub fn len_of(&self, value: u64) -> u16 {
        self.valuebsearch(value)
            .map_or(0, |index| self.lines[index].len)
    }

    /// Assign length-limited code lengths from a histogram.
    ///
    /// `freqs[i]` is the weight of `lines[i]`. With two or more nonzero weights
    /// the result is a complete code with no length above `max_bits`; one
    /// nonzero weight gets length 1, none leaves every length at zero. Codes
    /// are not assigned; follow with [`PrefixList::gen_codes`].
    pub fn gen_lengths(&mut self, freqs: &[u32], max_bits: u16) -> Result<()> {
        let n = self.lines.len();
        if n > MAX_SYMBOLS || max_bits == 0 || max_bits > MAX_CODE_BITS {
            return Err(Error::fix_len_range(format!(
                "{} symbols with limit {} bits",
                n, max_bits
            )));
        }
        if freqs.len() != n {
            return Err(Error::param(format!(
                "histogram has {} entries for {} lines",
                freqs.len(),
                n
            )));
        }
        for line in &mut self.lines {
            line.len = 0;
        }
        let mut symbols: Vec<(u32, usize)> = freqs
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f > 0)
            .map(|(i, &f)| (f, i))
            .collect();
        match symbols.len() {
            0 => return Ok(()),
            1 => {
                self.lines[symbols[0].1].len = 1;
                return Ok(());
            }
            k if k > 1usize << max_bits => {
                return Err(Error::fix_len_range(format!(
                    "{} symbols cannot fit in {} bits",
                    k, max_bits
                )));
            }
            _ => {}
        }
        symbols.sort_unstable();

        let mut lengths = huffman_lengths(&symbols);
        if lengths.iter().any(|&l| l > max_bits) {
            trace!(symbols = symbols.len(), max_bits, "limiting code lengths");
            lengths = package_merge(&symbols, max_bits)?;
        }
        for (&(_, index), &len) in symbols.iter().zip(&lengths) {
            self.lines[index].len = len;
        }
        Ok(())
    }
}

/// Unrestricted Huffman lengths for `symbols` sorted by weight.
fn huffman_lengths(symbols: &[(u32, usize)]) -> Vec<u16> {
    let k = symbols.len();
    let mut parent = vec![0usize; 2 * k - 1];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = symbols
        .iter()
        .enumerate()
        .map(|(node, &(freq, _))| Reverse((freq as u64, node)))
        .collect();
    let mut next = k;
    while heap.len() > 1 {
        let (Some(Reverse((w1, a))), Some(Reverse((w2, b)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        parent[a] = next;
        parent[b] = next;
        heap.push(Reverse((w1 + w2, next)));
        next += 1;
    }
    let root = next - 1;
    let mut depth = vec![0u16; 2 * k - 1];
    for node in (0..root).rev() {
        depth[node] = depth[parent[node]] + 1;
    }
    depth.truncate(k);
    depth
}

#[derive(Debug, Clone, Copy)]
struct Package {
    weight: u64,
    /// Children as node ids; `None` for leaves.
    children: Option<(u32, u32)>,
}

/// Length-limited lengths by package-merge for `symbols` sorted by weight.
fn package_merge(symbols: &[(u32, usize)], max_bits: u16) -> Result<Vec<u16>> {
    let k = symbols.len();
    let mut nodes: Vec<Package> = Vec::new();
    nodes
        .try_reserve(k * max_bits as usize)
        .map_err(|_| Error::memory(k * max_bits as usize * std::mem::size_of::<Package>()))?;
    nodes.extend(symbols.iter().map(|&(freq, _)| Package {
        weight: freq as u64,
        children: None,
    }));
    let leaves: Vec<u32> = (0..k as u32).collect();

    let mut list = leaves.clone();
    for _ in 1..max_bits {
        let mut packages = Vec::with_capacity(list.len() / 2);
        for pair in list.chunks_exact(2) {
            let id = nodes.len() as u32;
            nodes.push(Package {
                weight: nodes[pair[0] as usize].weight + nodes[pair[1] as usize].weight,
                children: Some((pair[0], pair[1])),
            });
            packages.push(id);
        }
        // Merge by weight; leaves win ties.
        let mut merged = Vec::with_capacity(leaves.len() + packages.len());
        let (mut li, mut pi) = (0, 0);
        while li < leaves.len() || pi < packages.len() {
            let take_leaf = pi >= packages.len()
                || (li < leaves.len()
                    && nodes[leaves[li] as usize].weight <= nodes[packages[pi] as usize].weight);
            if take_leaf {
                merged.push(leaves[li]);
                li += 1;
            } else {
                merged.push(packages[pi]);
                pi += 1;
            }
        }
        list = merged;
    }

    let take = 2 * k - 2;
    if list.len() < take {
        return Err(Error::fix_len_range("package-merge ran out of items"));
    }
    let mut lengths = vec![0u16; k];
    let mut stack: Vec<u32> = list[..take].to_vec();
    while let Some(id) = stack.pop() {
        match nodes[id as usize].children {
            None => lengths[id as usize] += 1,
            Some((a, b)) => {
                stack.push(a);
                stack.push(b);
            }
        }
    }
    Ok(lengths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kraft(list: &PrefixList) -> u32 {
        list.lines()
            .iter()
            .filter(|l| l.len > 0)
            .map(|l| KRAFT_TOTAL >> l.len)
            .sum()
    }

    #[test]
    fn test_gen_codes_rfc1951_example() {
        // RFC 1951 section 3.2.2: lengths (3, 3, 3, 3, 3, 2, 4, 4).
        let list = {
            let mut l = PrefixList::new(8).unwrap();
            for (line, len) in l.lines_mut().iter_mut().zip([3, 3, 3, 3, 3, 2, 4, 4]) {
                line.len = len;
            }
            l.gen_codes().unwrap();
            l
        };
        let codes: Vec<u16> = list.lines().iter().map(|l| l.code).collect();
        assert_eq!(codes, vec![0b010, 0b011, 0b100, 0b101, 0b110, 0b00, 0b1110, 0b1111]);
    }

    #[test]
    fn test_gen_codes_rejects_bad_lengths() {
        let mut list = PrefixList::new(3).unwrap();
        for line in list.lines_mut() {
            line.len = 1;
        }
        assert!(matches!(list.gen_codes(), Err(Error::FixCodeAlloc(_))));

        let mut list = PrefixList::new(2).unwrap();
        list.lines_mut()[0].len = 16;
        assert!(matches!(list.gen_codes(), Err(Error::FixLenRange(_))));

        // Incomplete: two symbols of length 2.
        assert!(PrefixList::from_lengths(&[2, 2, 0]).is_err());
        // A lone length-1 code is tolerated.
        assert!(PrefixList::from_lengths(&[0, 1, 0]).is_ok());
        assert!(PrefixList::from_lengths(&[0, 0]).is_ok());
    }

    #[test]
    fn test_search_by_code_and_value() {
        let mut list = PrefixList::from_lengths(&[2, 1, 3, 3]).unwrap();
        // Canonical: 1 -> 0, 0 -> 10, 2 -> 110, 3 -> 111.
        let idx = list.codebsearch(2, 0b10).unwrap();
        assert_eq!(list.lines()[idx].value, 0);
        assert_eq!(list.codebsearch(2, 0b11), None);
        assert_eq!(list.valuebsearch(0), None);

        list.valuesort();
        let idx = list.valuebsearch(3).unwrap();
        assert_eq!(list.lines()[idx].code, 0b111);
        assert_eq!(list.len_of(1), 1);
    }

    #[test]
    fn test_encode_decode_symbols() {
        let mut enc = PrefixList::from_lengths(&[2, 1, 3, 3]).unwrap();
        enc.valuesort();
        let mut w = BitWriter::new();
        for v in [3u64, 1, 0, 2, 1] {
            enc.encode(&mut w, v).unwrap();
        }
        w.align();
        let bytes = w.take_bytes();

        let dec = PrefixList::from_lengths(&[2, 1, 3, 3]).unwrap();
        let mut r = BitReader::new();
        let mut src = Source::new(&bytes);
        let mut out = Vec::new();
        for _ in 0..5 {
            out.push(dec.decode(&mut r, &mut src).unwrap().unwrap());
        }
        assert_eq!(out, vec![3, 1, 0, 2, 1]);
    }

    #[test]
    fn test_decode_suspends_without_consuming() {
        let dec = PrefixList::from_lengths(&[2, 1, 3, 3]).unwrap();
        let mut r = BitReader::new();
        let mut src = Source::new(&[]);
        assert_eq!(dec.decode(&mut r, &mut src).unwrap(), None);
        let mut src = Source::new(&[0b0000_0111]);
        // 111 -> symbol 3.
        assert_eq!(dec.decode(&mut r, &mut src).unwrap(), Some(3));
        assert_eq!(r.available(), 5);
    }

    #[test]
    fn test_single_reads_nothing() {
        let list = PrefixList::single(42);
        let mut r = BitReader::new();
        let mut src = Source::new(&[]);
        assert_eq!(list.decode(&mut r, &mut src).unwrap(), Some(42));
        assert!(list.is_single());
    }

    #[test]
    fn test_single_writes_nothing() {
        let list = PrefixList::single(203);
        let mut w = BitWriter::new();
        for _ in 0..20 {
            list.encode(&mut w, 203).unwrap();
        }
        assert_eq!(w.bit_len(), 0);
        assert_eq!(list.len_of(203), 0);
        assert!(matches!(list.encode(&mut w, 7), Err(Error::Param(_))));
    }

    #[test]
    fn test_gen_lengths_complete_and_limited() {
        let freqs: Vec<u32> = (0..40).map(|i| 1u32 << (i % 20)).collect();
        let mut list = PrefixList::new(freqs.len()).unwrap();
        list.gen_lengths(&freqs, 7).unwrap();
        assert!(list.lines().iter().all(|l| l.len <= 7 && l.len > 0));
        assert_eq!(kraft(&list), KRAFT_TOTAL);
        list.gen_codes().unwrap();
    }

    #[test]
    fn test_gen_lengths_fibonacci_needs_limit() {
        // Fibonacci weights make an unrestricted Huffman tree as deep as possible.
        let mut freqs = vec![1u32, 1];
        while freqs.len() < 30 {
            let n = freqs.len();
            freqs.push(freqs[n - 1] + freqs[n - 2]);
        }
        let mut list = PrefixList::new(freqs.len()).unwrap();
        list.gen_lengths(&freqs, 15).unwrap();
        assert!(list.lines().iter().all(|l| (1..=15).contains(&l.len)));
        assert_eq!(kraft(&list), KRAFT_TOTAL);
        // Heavier symbols never get longer codes.
        for w in list.lines().windows(2) {
            assert!(w[1].len <= w[0].len);
        }
    }

    #[test]
    fn test_gen_lengths_degenerate() {
        let mut list = PrefixList::new(4).unwrap();
        list.gen_lengths(&[0, 0, 0, 0], 15).unwrap();
        assert!(list.lines().iter().all(|l| l.len == 0));
        list.gen_lengths(&[0, 9, 0, 0], 15).unwrap();
        assert_eq!(list.lines()[1].len, 1);
        assert_eq!(kraft(&list), KRAFT_TOTAL / 2);
    }

    #[test]
    fn test_gen_lengths_errors() {
        let mut list = PrefixList::new(5).unwrap();
        assert!(matches!(
            list.gen_lengths(&[1; 5], 2),
            Err(Error::FixLenRange(_))
        ));
        assert!(matches!(
            list.gen_lengths(&[1; 5], 16),
            Err(Error::FixLenRange(_))
        ));
        assert!(matches!(list.gen_lengths(&[1; 4], 8), Err(Error::Param(_))));
        let mut big = PrefixList::new(MAX_SYMBOLS + 1).unwrap();
        let freqs = vec![1u32; MAX_SYMBOLS + 1];
        assert!(matches!(
            big.gen_lengths(&freqs, 15),
            Err(Error::FixLenRange(_))
        ));
    }

    #[test]
    fn test_brotli_complex_preset_matches_rfc_table() {
        // Peeking 4 bits LSB-first selects (length, symbol) per RFC 7932.
        let list = PrefixList::preset(Preset::BrotliComplex).unwrap();
        let expect = [
            (2, 0), (2, 4), (2, 3), (3, 2), (2, 0), (2, 4), (2, 3), (4, 1),
            (2, 0), (2, 4), (2, 3), (3, 2), (2, 0), (2, 4), (2, 3), (4, 5),
        ];
        for (bits, &(len, sym)) in expect.iter().enumerate() {
            let byte = [bits as u8];
            let mut r = BitReader::new();
            let mut src = Source::new(&byte);
            assert_eq!(list.decode(&mut r, &mut src).unwrap(), Some(sym));
            assert_eq!(8 - r.available(), len);
        }
    }

    #[test]
    fn test_window_bits_preset() {
        let mut list = PrefixList::preset(Preset::WindowBits).unwrap();
        assert_eq!(list.len(), 15);
        let decode = |bytes: &[u8]| {
            let mut r = BitReader::new();
            let mut src = Source::new(bytes);
            list.decode(&mut r, &mut src)
        };
        assert_eq!(decode(&[0b0]).unwrap(), Some(16));
        // 1 then n=5 (LSB first: 1,0,1) -> 22.
        assert_eq!(decode(&[0b1011]).unwrap(), Some(22));
        // 1, n=0, m=0 -> 17.
        assert_eq!(decode(&[0b000_0001]).unwrap(), Some(17));
        // 1, n=0, m=2 -> 10.
        assert_eq!(decode(&[0b010_0001]).unwrap(), Some(10));
        // m=1 is reserved.
        assert!(decode(&[0b001_0001]).is_err());

        list.valuesort();
        let mut w = BitWriter::new();
        list.encode(&mut w, 22).unwrap();
        w.align();
        assert_eq!(w.take_bytes(), vec![0b1011]);
    }

    #[test]
    fn test_simple_preset_orders_by_value() {
        let mut list = PrefixList::preset(Preset::BrotliSimple3).unwrap();
        // Symbols in stream order: 7 gets length 1, then 9 and 4 get length 2.
        for (line, value) in list.lines_mut().iter_mut().zip([7u64, 9, 4]) {
            line.value = value;
        }
        list.gen_codes().unwrap();
        list.codesort();
        let find = |len, code| list.codebsearch(len, code).map(|i| list.lines()[i].value);
        assert_eq!(find(1, 0), Some(7));
        assert_eq!(find(2, 0b10), Some(4));
        assert_eq!(find(2, 0b11), Some(9));
    }
}
