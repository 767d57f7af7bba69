//! Brotli prefix code transmission (RFC 7932 section 3.4 and 3.5).
//!
//! [`CodeReader`] parses a simple or complex prefix code description and can
//! suspend at any bit. [`build_code`] and [`write_code`] are the encoder side.

use tcmplx_core::{Error, Result};
use tcmplx_prefix::{BitReader, BitWriter, PrefixList, Preset, Source, MAX_CODE_BITS};
use tracing::trace;

/// Order in which code length code lengths are sent.
pub const CL_ORDER: [usize; CODE_LENGTH_CODES] =
    [1, 2, 3, 4, 0, 5, 17, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// Size of the code length alphabet.
pub const CODE_LENGTH_CODES: usize = 18;

/// Longest code length code.
pub const MAX_CL_BITS: u16 = 5;

/// Code length symbol repeating the previous nonzero length.
pub const REPEAT_PREVIOUS: u8 = 16;

/// Code length symbol repeating zero.
pub const REPEAT_ZERO: u8 = 17;

/// Length that [`REPEAT_PREVIOUS`] repeats before any nonzero length is seen.
pub const INITIAL_REPEAT: u8 = 8;

const KRAFT_CL: i32 = 32;
const KRAFT: i32 = 1 << MAX_CODE_BITS;

/// Bits per symbol in a simple prefix code over `alphabet` symbols.
pub fn alphabet_bits(alphabet: usize) -> u32 {
    if alphabet <= 1 {
        0
    } else {
        usize::BITS - (alphabet - 1).leading_zeros()
    }
}

/// Extra bits after a repeat symbol.
#[inline]
pub fn repeat_extra_bits(symbol: u8) -> u32 {
    if symbol == REPEAT_PREVIOUS {
        2
    } else {
        3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Kind,
    SimpleCount,
    SimpleSymbols { index: usize },
    SimpleSelect,
    ClLengths { index: usize },
    Lengths,
    Repeat { symbol: u8 },
    Finished,
}

/// Resumable reader for one prefix code description.
#[derive(Debug, Clone)]
pub struct CodeReader {
    alphabet: usize,
    step: Step,
    complex: PrefixList,
    symbols: [u16; 4],
    nsym: usize,
    cl_lengths: [u8; CODE_LENGTH_CODES],
    cl_space: i32,
    cl_used: usize,
    cl_code: PrefixList,
    lengths: Vec<u8>,
    symbol: usize,
    space: i32,
    prev_len: u8,
    repeat: u32,
    repeat_len: u8,
}

impl CodeReader {
    /// Create an idle reader.
    pub fn new() -> Result<Self> {
        Ok(CodeReader {
            alphabet: 0,
            step: Step::Finished,
            complex: PrefixList::preset(Preset::BrotliComplex)?,
            symbols: [0; 4],
            nsym: 0,
            cl_lengths: [0; CODE_LENGTH_CODES],
            cl_space: KRAFT_CL,
            cl_used: 0,
            cl_code: PrefixList::single(0),
            lengths: Vec::new(),
            symbol: 0,
            space: KRAFT,
            prev_len: INITIAL_REPEAT,
            repeat: 0,
            repeat_len: 0,
        })
    }

    /// Start reading a code over `alphabet` symbols.
    pub fn begin(&mut self, alphabet: usize) {
        self.alphabet = alphabet;
        self.step = Step::Kind;
    }

    /// Alphabet of the code being read.
    pub fn alphabet(&self) -> usize {
        self.alphabet
    }

    /// Continue reading. `Ok(None)` means input ran out; call again with
    /// more. The finished code is sorted by code, ready for decoding.
    pub fn step(&mut self, reader: &mut BitReader, src: &mut Source<'_>) -> Result<Option<PrefixList>> {
        loop {
            match self.step {
                Step::Kind => {
                    let Some(hskip) = reader.read(src, 2) else {
                        return Ok(None);
                    };
                    if hskip == 1 {
                        self.step = Step::SimpleCount;
                    } else {
                        self.cl_lengths = [0; CODE_LENGTH_CODES];
                        self.cl_space = KRAFT_CL;
                        self.cl_used = 0;
                        self.step = Step::ClLengths {
                            index: hskip as usize,
                        };
                    }
                }
                Step::SimpleCount => {
                    let Some(n) = reader.read(src, 2) else {
                        return Ok(None);
                    };
                    self.nsym = n as usize + 1;
                    self.step = Step::SimpleSymbols { index: 0 };
                }
                Step::SimpleSymbols { mut index } => {
                    let bits = alphabet_bits(self.alphabet);
                    while index < self.nsym {
                        let Some(symbol) = reader.read(src, bits) else {
                            return Ok(None);
                        };
                        if symbol as usize >= self.alphabet {
                            return Err(Error::sanitize(format!(
                                "simple code symbol {} outside alphabet of {}",
                                symbol, self.alphabet
                            )));
                        }
                        if self.symbols[..index].contains(&(symbol as u16)) {
                            return Err(Error::sanitize("duplicate simple code symbol"));
                        }
                        self.symbols[index] = symbol as u16;
                        index += 1;
                        self.step = Step::SimpleSymbols { index };
                    }
                    if self.nsym == 4 {
                        self.step = Step::SimpleSelect;
                    } else {
                        return self.finish_simple(false).map(Some);
                    }
                }
                Step::SimpleSelect => {
                    let Some(select) = reader.read(src, 1) else {
                        return Ok(None);
                    };
                    return self.finish_simple(select == 1).map(Some);
                }
                Step::ClLengths { mut index } => {
                    while index < CODE_LENGTH_CODES {
                        let Some(len) = self.complex.decode(reader, src)? else {
                            return Ok(None);
                        };
                        self.cl_lengths[CL_ORDER[index]] = len as u8;
                        index += 1;
                        self.step = Step::ClLengths { index };
                        if len != 0 {
                            self.cl_space -= KRAFT_CL >> len;
                            self.cl_used += 1;
                            if self.cl_space <= 0 {
                                break;
                            }
                        }
                    }
                    self.start_lengths()?;
                }
                Step::Lengths => {
                    while self.symbol < self.alphabet && self.space > 0 {
                        let Some(code_len) = self.cl_code.decode(reader, src)? else {
                            return Ok(None);
                        };
                        let code_len = code_len as u8;
                        if code_len >= REPEAT_PREVIOUS {
                            self.step = Step::Repeat { symbol: code_len };
                            break;
                        }
                        self.repeat = 0;
                        self.lengths[self.symbol] = code_len;
                        if code_len != 0 {
                            self.prev_len = code_len;
                            self.space -= KRAFT >> code_len;
                        }
                        self.symbol += 1;
                    }
                    if self.step == Step::Lengths {
                        return self.finish_complex().map(Some);
                    }
                }
                Step::Repeat { symbol } => {
                    let bits = repeat_extra_bits(symbol);
                    let Some(delta) = reader.read(src, bits) else {
                        return Ok(None);
                    };
                    self.apply_repeat(symbol, delta)?;
                    self.step = Step::Lengths;
                }
                Step::Finished => {
                    return Err(Error::param("prefix code reader is idle"));
                }
            }
        }
    }

    fn finish_simple(&mut self, select: bool) -> Result<PrefixList> {
        self.step = Step::Finished;
        if self.nsym == 1 {
            return Ok(PrefixList::single(self.symbols[0] as u64));
        }
        let preset = match (self.nsym, select) {
            (2, _) => Preset::BrotliSimple2,
            (3, _) => Preset::BrotliSimple3,
            (_, false) => Preset::BrotliSimple4,
            (_, true) => Preset::BrotliSimple4Select,
        };
        let mut list = PrefixList::preset(preset)?;
        for (line, &symbol) in list.lines_mut().iter_mut().zip(&self.symbols) {
            line.value = symbol as u64;
        }
        list.gen_codes()?;
        list.codesort();
        trace!(nsym = self.nsym, alphabet = self.alphabet, "simple prefix code");
        Ok(list)
    }

    fn start_lengths(&mut self) -> Result<()> {
        if !(self.cl_used == 1 || self.cl_space == 0) {
            return Err(Error::sanitize("code length code is not complete"));
        }
        self.cl_code = if self.cl_used == 1 {
            let only = self
                .cl_lengths
                .iter()
                .position(|&l| l != 0)
                .unwrap_or_default();
            PrefixList::single(only as u64)
        } else {
            PrefixList::from_lengths(&self.cl_lengths)
                .map_err(|e| Error::sanitize(format!("code length code: {}", e)))?
        };
        self.lengths.clear();
        self.lengths.resize(self.alphabet, 0);
        self.symbol = 0;
        self.space = KRAFT;
        self.prev_len = INITIAL_REPEAT;
        self.repeat = 0;
        self.repeat_len = 0;
        self.step = Step::Lengths;
        Ok(())
    }

    fn apply_repeat(&mut self, symbol: u8, delta: u32) -> Result<()> {
        let new_len = if symbol == REPEAT_PREVIOUS {
            self.prev_len
        } else {
            0
        };
        if self.repeat_len != new_len {
            self.repeat = 0;
            self.repeat_len = new_len;
        }
        let old = self.repeat;
        if self.repeat > 0 {
            self.repeat = (self.repeat - 2) << repeat_extra_bits(symbol);
        }
        self.repeat += delta + 3;
        let count = (self.repeat - old) as usize;
        if self.symbol + count > self.alphabet {
            return Err(Error::sanitize("code length repeat overruns alphabet"));
        }
        if new_len != 0 {
            self.lengths[self.symbol..self.symbol + count].fill(new_len);
            self.space -= (count as i32) << (MAX_CODE_BITS as i32 - new_len as i32);
        }
        self.symbol += count;
        Ok(())
    }

    fn finish_complex(&mut self) -> Result<PrefixList> {
        self.step = Step::Finished;
        if self.space != 0 {
            return Err(Error::sanitize("prefix code is not complete"));
        }
        let list = PrefixList::from_lengths(&self.lengths)
            .map_err(|e| Error::sanitize(format!("prefix code: {}", e)))?;
        trace!(
            alphabet = self.alphabet,
            max_len = list.max_len(),
            "complex prefix code"
        );
        Ok(list)
    }
}

/// One code length token: a length, or a repeat symbol with its extra bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClToken {
    pub symbol: u8,
    pub extra: u8,
}

impl ClToken {
    fn plain(symbol: u8) -> Self {
        ClToken { symbol, extra: 0 }
    }
}

/// Run-length code `lengths` with repeat symbols 16 and 17.
///
/// Consecutive repeat symbols of the same kind combine multiplicatively, so
/// long runs are split into digits written most significant first.
pub fn rle_lengths(lengths: &[u8]) -> Vec<ClToken> {
    let mut tokens = Vec::new();
    let mut prev = INITIAL_REPEAT;
    let mut i = 0;
    while i < lengths.len() {
        let value = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == value).count();
        if value == 0 {
            push_zeros(&mut tokens, run);
        } else {
            push_repeats(&mut tokens, prev, value, run);
            prev = value;
        }
        i += run;
    }
    tokens
}

fn push_zeros(tokens: &mut Vec<ClToken>, mut reps: usize) {
    if reps == 11 {
        tokens.push(ClToken::plain(0));
        reps -= 1;
    }
    if reps < 3 {
        tokens.extend(std::iter::repeat(ClToken::plain(0)).take(reps));
        return;
    }
    push_digits(tokens, REPEAT_ZERO, reps - 3, 3);
}

fn push_repeats(tokens: &mut Vec<ClToken>, prev: u8, value: u8, mut reps: usize) {
    if prev != value {
        tokens.push(ClToken::plain(value));
        reps -= 1;
    }
    if reps == 7 {
        tokens.push(ClToken::plain(value));
        reps -= 1;
    }
    if reps < 3 {
        tokens.extend(std::iter::repeat(ClToken::plain(value)).take(reps));
        return;
    }
    push_digits(tokens, REPEAT_PREVIOUS, reps - 3, 2);
}

fn push_digits(tokens: &mut Vec<ClToken>, symbol: u8, mut rest: usize, bits: u32) {
    let start = tokens.len();
    let mask = (1 << bits) - 1;
    loop {
        tokens.push(ClToken {
            symbol,
            extra: (rest & mask) as u8,
        });
        rest >>= bits;
        if rest == 0 {
            break;
        }
        rest -= 1;
    }
    tokens[start..].reverse();
}

/// Build an encoding code (sorted by value) for a histogram over its
/// alphabet. Unused alphabets get a one-symbol code for symbol 0.
pub fn build_code(freqs: &[u32]) -> Result<PrefixList> {
    let mut used = freqs.iter().enumerate().filter(|(_, &f)| f > 0);
    match (used.next(), used.next()) {
        (None, _) => return Ok(PrefixList::single(0)),
        (Some((only, _)), None) => return Ok(PrefixList::single(only as u64)),
        _ => {}
    }
    let mut list = PrefixList::new(freqs.len())?;
    list.gen_lengths(freqs, MAX_CODE_BITS)?;
    list.gen_codes()?;
    Ok(list)
}

/// Write the description of `code` (from [`build_code`]) for an alphabet of
/// `alphabet` symbols.
pub fn write_code(writer: &mut BitWriter, code: &PrefixList, alphabet: usize) -> Result<()> {
    let bits = alphabet_bits(alphabet);
    if code.is_single() {
        writer.write_bits(1, 2);
        writer.write_bits(0, 2);
        writer.write_bits(code.lines()[0].value as u32, bits);
        return Ok(());
    }

    let mut used: Vec<(u16, u64)> = code
        .lines()
        .iter()
        .filter(|l| l.len > 0)
        .map(|l| (l.len, l.value))
        .collect();
    if used.len() <= 4 {
        used.sort_unstable();
        writer.write_bits(1, 2);
        writer.write_bits(used.len() as u32 - 1, 2);
        for &(_, symbol) in &used {
            writer.write_bits(symbol as u32, bits);
        }
        if used.len() == 4 {
            writer.write_bits(u32::from(used[0].0 == 1), 1);
        }
        return Ok(());
    }

    let mut lengths = vec![0u8; alphabet];
    for line in code.lines() {
        let slot = lengths
            .get_mut(line.value as usize)
            .ok_or_else(|| Error::out_of_range(line.value as usize, alphabet))?;
        *slot = line.len as u8;
    }
    let last = lengths.iter().rposition(|&l| l != 0).unwrap_or(0);
    let tokens = rle_lengths(&lengths[..=last]);

    let mut cl_freq = [0u32; CODE_LENGTH_CODES];
    for t in &tokens {
        cl_freq[t.symbol as usize] += 1;
    }
    if cl_freq.iter().filter(|&&f| f > 0).count() < 2 {
        // A lone code length symbol would need a zero-bit code; give it a
        // partner so the code length code stays complete.
        let spare = if cl_freq[0] == 0 { 0 } else { 1 };
        cl_freq[spare] = 1;
    }
    let mut cl_code = PrefixList::new(CODE_LENGTH_CODES)?;
    cl_code.gen_lengths(&cl_freq, MAX_CL_BITS)?;
    cl_code.gen_codes()?;
    let cl_len = |s: usize| cl_code.lines()[s].len;

    let mut hskip = 0;
    if cl_len(CL_ORDER[0]) == 0 && cl_len(CL_ORDER[1]) == 0 {
        hskip = 2;
        if cl_len(CL_ORDER[2]) == 0 {
            hskip = 3;
        }
    }
    let cl_last = (0..CODE_LENGTH_CODES)
        .rev()
        .find(|&i| cl_len(CL_ORDER[i]) != 0)
        .unwrap_or(0);

    let mut fixed = PrefixList::preset(Preset::BrotliComplex)?;
    fixed.valuesort();
    writer.write_bits(hskip as u32, 2);
    for &symbol in &CL_ORDER[hskip..=cl_last] {
        fixed.encode(writer, cl_len(symbol) as u64)?;
    }
    for t in &tokens {
        cl_code.encode(writer, t.symbol as u64)?;
        if t.symbol >= REPEAT_PREVIOUS {
            writer.write_bits(t.extra as u32, repeat_extra_bits(t.symbol));
        }
    }
    Ok(())
}

/// Write a Brotli variable-length 8-bit count (`NBLTYPES - 1`, `NTREES - 1`).
pub fn write_varlen8(writer: &mut BitWriter, value: u32) {
    if value == 0 {
        writer.write_bits(0, 1);
        return;
    }
    let n = 31 - value.leading_zeros();
    writer.write_bits(1, 1);
    writer.write_bits(n, 3);
    writer.write_bits(value - (1 << n), n);
}

/// Read a Brotli variable-length 8-bit count, or `None` (consuming nothing)
/// when input ran out.
pub fn read_varlen8(reader: &mut BitReader, src: &mut Source<'_>) -> Option<u32> {
    if !reader.fill(src, 1) {
        return None;
    }
    if reader.peek(1) == 0 {
        reader.consume(1);
        return Some(0);
    }
    if !reader.fill(src, 4) {
        return None;
    }
    let n = reader.peek(4) >> 1;
    if n == 0 {
        reader.consume(4);
        return Some(1);
    }
    if !reader.fill(src, 4 + n) {
        return None;
    }
    let value = (1 << n) + (reader.peek(4 + n) >> 4);
    reader.consume(4 + n);
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(tokens: &[ClToken]) -> Vec<u8> {
        // Mirror of the decoder's repeat rules.
        let mut out = Vec::new();
        let mut prev = INITIAL_REPEAT;
        let mut repeat = 0u32;
        let mut repeat_len = 0u8;
        for t in tokens {
            if t.symbol < REPEAT_PREVIOUS {
                repeat = 0;
                out.push(t.symbol);
                if t.symbol != 0 {
                    prev = t.symbol;
                }
                continue;
            }
            let new_len = if t.symbol == REPEAT_PREVIOUS { prev } else { 0 };
            if repeat_len != new_len {
                repeat = 0;
                repeat_len = new_len;
            }
            let old = repeat;
            if repeat > 0 {
                repeat = (repeat - 2) << repeat_extra_bits(t.symbol);
            }
            repeat += t.extra as u32 + 3;
            out.extend(std::iter::repeat(new_len).take((repeat - old) as usize));
        }
        out
    }

    fn read_code(bytes: &[u8], alphabet: usize) -> Result<PrefixList> {
        let mut code = CodeReader::new()?;
        code.begin(alphabet);
        let mut reader = BitReader::new();
        let mut src = Source::new(bytes);
        code.step(&mut reader, &mut src)?
            .ok_or_else(|| Error::unexpected_eof(bytes.len()))
    }

    #[test]
    fn test_rle_roundtrip_runs() {
        for run in 1..200usize {
            let mut lengths = vec![8u8; run];
            lengths.extend(vec![0u8; run]);
            lengths.extend(vec![5u8; run]);
            lengths.push(8);
            let tokens = rle_lengths(&lengths);
            assert_eq!(expand(&tokens), lengths, "run {}", run);
        }
    }

    #[test]
    fn test_rle_uses_initial_repeat() {
        let tokens = rle_lengths(&[8, 8, 8]);
        assert_eq!(
            tokens,
            vec![ClToken {
                symbol: REPEAT_PREVIOUS,
                extra: 0
            }]
        );
    }

    #[test]
    fn test_alphabet_bits() {
        assert_eq!(alphabet_bits(256), 8);
        assert_eq!(alphabet_bits(704), 10);
        assert_eq!(alphabet_bits(26), 5);
        assert_eq!(alphabet_bits(4), 2);
        assert_eq!(alphabet_bits(64), 6);
    }

    #[test]
    fn test_varlen8() {
        for value in [0u32, 1, 2, 3, 7, 8, 100, 255] {
            let mut w = BitWriter::new();
            write_varlen8(&mut w, value);
            w.align();
            let bytes = w.take_bytes();
            let mut r = BitReader::new();
            let mut src = Source::new(&bytes);
            assert_eq!(read_varlen8(&mut r, &mut src), Some(value));
        }
        let mut r = BitReader::new();
        let mut src = Source::new(&[0b0000_1111]);
        assert_eq!(read_varlen8(&mut r, &mut src), None);
        assert_eq!(r.available(), 8);
    }

    #[test]
    fn test_simple_codes_roundtrip() {
        for freqs in [
            vec![0, 5, 0, 0],
            vec![3, 0, 9, 0, 0, 0],
            vec![1, 1, 8, 0, 0],
            vec![4, 4, 4, 4, 0],
            vec![20, 6, 1, 1, 0],
        ] {
            let code = build_code(&freqs).unwrap();
            let mut w = BitWriter::new();
            write_code(&mut w, &code, freqs.len()).unwrap();
            w.align();
            let bytes = w.take_bytes();
            let read = read_code(&bytes, freqs.len()).unwrap();
            for (symbol, &f) in freqs.iter().enumerate() {
                if f > 0 {
                    let idx = read
                        .lines()
                        .iter()
                        .position(|l| l.value == symbol as u64)
                        .unwrap();
                    assert_eq!(read.lines()[idx].len, code.len_of(symbol as u64));
                }
            }
        }
    }

    #[test]
    fn test_complex_code_roundtrip() {
        let freqs: Vec<u32> = (0..256u32).map(|i| if i % 3 == 0 { 0 } else { 1 + i % 17 }).collect();
        let code = build_code(&freqs).unwrap();
        let mut w = BitWriter::new();
        write_code(&mut w, &code, 256).unwrap();
        for (symbol, &f) in freqs.iter().enumerate() {
            if f > 0 {
                code.encode(&mut w, symbol as u64).unwrap();
            }
        }
        w.align();
        let bytes = w.take_bytes();

        let mut code_reader = CodeReader::new().unwrap();
        code_reader.begin(256);
        let mut reader = BitReader::new();
        // Feed one byte at a time to exercise suspension.
        let mut read = None;
        let mut pos = 0;
        while read.is_none() {
            let mut src = Source::new(&bytes[pos..pos + 1]);
            read = code_reader.step(&mut reader, &mut src).unwrap();
            pos += src.consumed();
        }
        let read = read.unwrap();
        let mut src = Source::new(&bytes[pos..]);
        for (symbol, &f) in freqs.iter().enumerate() {
            if f > 0 {
                assert_eq!(read.decode(&mut reader, &mut src).unwrap(), Some(symbol as u64));
            }
        }
    }

    #[test]
    fn test_uniform_lengths_code() {
        // Every symbol length 8: a single code length symbol plus repeats.
        let freqs = vec![1u32; 256];
        let code = build_code(&freqs).unwrap();
        let mut w = BitWriter::new();
        write_code(&mut w, &code, 256).unwrap();
        w.align();
        let read = read_code(&w.take_bytes(), 256).unwrap();
        assert!(read.lines().iter().all(|l| l.len == 8));
    }

    #[test]
    fn test_rejects_bad_simple_codes() {
        // HSKIP=1, NSYM=2, symbols 3 and 3 over an alphabet of 4.
        let mut w = BitWriter::new();
        w.write_bits(1, 2);
        w.write_bits(1, 2);
        w.write_bits(3, 2);
        w.write_bits(3, 2);
        assert!(matches!(read_code(&w.take_bytes(), 4), Err(Error::Sanitize(_))));

        // Symbol 5 over an alphabet of 5 (three bits per symbol).
        let mut w = BitWriter::new();
        w.write_bits(1, 2);
        w.write_bits(0, 2);
        w.write_bits(5, 3);
        w.align();
        assert!(matches!(read_code(&w.take_bytes(), 5), Err(Error::Sanitize(_))));
    }

    #[test]
    fn test_single_symbol_code() {
        let code = build_code(&[0, 0, 7, 0]).unwrap();
        assert!(code.is_single());
        let mut w = BitWriter::new();
        write_code(&mut w, &code, 4).unwrap();
        w.align();
        let read = read_code(&w.take_bytes(), 4).unwrap();
        assert!(read.is_single());
        assert_eq!(read.lines()[0].value, 2);
    }
}
