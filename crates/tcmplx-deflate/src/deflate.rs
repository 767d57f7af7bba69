//! Streaming zlib/DEFLATE encoder.
//!
//! Raw input is gathered into a [`BlockBuf`]. When a block's worth has
//! arrived (or the caller flushes), the block's command stream is turned into
//! length/distance symbols and written as whichever of a stored, fixed or
//! dynamic block comes out smallest.

use tcmplx_core::{
    Adler32, Algorithm, CompressionLevel, EncoderOptions, Error, Flush, Progress, Result, Status,
    StreamingCompressor,
};
use tcmplx_lz::command::{parse, Command};
use tcmplx_lz::BlockBuf;
use tcmplx_prefix::{BitWriter, InsCopyTable, PrefixList, RingDist, TablePreset};
use tracing::{debug, trace};

use crate::huffman::{
    fixed_literal_lengths, rle_lengths, repeat_bits, ClToken, CL_ORDER, CODE_LENGTH_CODES,
    DISTANCE_CODES, END_OF_BLOCK, LITERAL_CODES, MAX_BITS, MAX_CL_BITS, MAX_MATCH,
};

/// Largest stored block payload.
const MAX_STORED: usize = 65535;

/// One literal/length symbol with its distance, ready to write.
#[derive(Debug, Clone, Copy)]
struct Token {
    lcode: u16,
    lbits: u8,
    lextra: u16,
    dcode: u8,
    dbits: u8,
    dextra: u16,
}

impl Token {
    fn literal(byte: u8) -> Self {
        Token {
            lcode: byte as u16,
            lbits: 0,
            lextra: 0,
            dcode: 0,
            dbits: 0,
            dextra: 0,
        }
    }

    fn is_match(&self) -> bool {
        self.lcode > END_OF_BLOCK as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Body,
    Finished,
}

/// Which block encoding to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Stored,
    Fixed,
    Dynamic,
}

/// Dynamic block trees and their header cost.
struct DynamicTrees {
    literals: PrefixList,
    distances: PrefixList,
    code_lengths: PrefixList,
    hlit: usize,
    hdist: usize,
    hclen: usize,
    tokens: Vec<ClToken>,
    header_bits: u64,
}

/// Streaming zlib encoder.
#[derive(Debug, Clone)]
pub struct Deflater {
    options: EncoderOptions,
    state: State,
    blocks: BlockBuf,
    writer: BitWriter,
    adler: Adler32,
    table: InsCopyTable,
    ring: RingDist,
    fixed_literals: PrefixList,
    fixed_distances: PrefixList,
    tokens: Vec<Token>,
    flushed: bool,
}

impl Deflater {
    /// Create an encoder.
    pub fn new(options: EncoderOptions) -> Result<Self> {
        options.validate_for(Algorithm::Zlib)?;
        let mut fixed_literals = PrefixList::from_lengths(&fixed_literal_lengths())?;
        fixed_literals.valuesort();
        let mut fixed_distances = PrefixList::from_lengths(&[5u8; 32])?;
        fixed_distances.valuesort();
        Ok(Deflater {
            options,
            state: State::Header,
            blocks: BlockBuf::new(
                options.block_size,
                options.window_size,
                options.chain_length,
            )?,
            writer: BitWriter::new(),
            adler: Adler32::new(),
            table: InsCopyTable::new(TablePreset::Deflate),
            ring: RingDist::deflate(),
            fixed_literals,
            fixed_distances,
            tokens: Vec::new(),
            flushed: false,
        })
    }

    /// Create an encoder for a compression level.
    pub fn with_level(level: CompressionLevel) -> Result<Self> {
        Self::new(EncoderOptions::with_level(Algorithm::Zlib, level))
    }

    /// Encoder options in use.
    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Check if the trailer has been written and drained.
    pub fn is_done(&self) -> bool {
        self.state == State::Finished && self.writer.pending() == 0
    }

    /// Encode `input` into `output`.
    ///
    /// Input is accepted only while no encoded bytes are waiting, so a
    /// `Partial` return means: drain, then call again with the unconsumed
    /// input and the same flush mode.
    pub fn encode(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Progress> {
        let mut written = self.writer.drain_into(output);
        if self.state == State::Finished {
            let status = if self.writer.pending() > 0 {
                Status::Partial
            } else {
                Status::Eof
            };
            return Ok(Progress::new(0, written, status));
        }
        if self.writer.pending() > 0 {
            return Ok(Progress::new(0, written, Status::Partial));
        }
        if self.state == State::Header {
            self.write_header();
            self.state = State::Body;
        }

        let mut consumed = 0;
        while consumed < input.len() {
            let take = self.blocks.available().min(input.len() - consumed);
            let chunk = &input[consumed..consumed + take];
            self.blocks.write(chunk)?;
            self.adler.update(chunk);
            consumed += take;
            self.flushed = false;
            if self.blocks.available() == 0 {
                self.emit_block(false)?;
                written += self.writer.drain_into(&mut output[written..]);
                if self.writer.pending() > 0 {
                    return Ok(Progress::new(consumed, written, Status::Partial));
                }
            }
        }

        match flush {
            Flush::None => {}
            Flush::Block => {
                if !self.flushed {
                    if self.blocks.input_len() > 0 {
                        self.emit_block(false)?;
                    }
                    // Empty stored block to reach a byte boundary.
                    self.writer.write_bits(0, 3);
                    self.writer.align();
                    self.writer.write_bits(0x0000, 16);
                    self.writer.write_bits(0xFFFF, 16);
                    self.flushed = true;
                }
            }
            Flush::Finish => {
                self.emit_block(true)?;
                self.writer.align();
                let checksum = self.adler.finish();
                self.writer.write_bytes(&checksum.to_be_bytes());
                self.state = State::Finished;
                debug!(checksum, "zlib stream finished");
            }
        }

        written += self.writer.drain_into(&mut output[written..]);
        let status = if self.writer.pending() > 0 {
            Status::Partial
        } else if self.state == State::Finished {
            Status::Eof
        } else {
            Status::Success
        };
        Ok(Progress::new(consumed, written, status))
    }

    /// Prepare for a new stream with the same options.
    pub fn reset(&mut self) {
        self.state = State::Header;
        self.blocks.reset();
        self.writer.reset();
        self.adler = Adler32::new();
        self.ring = RingDist::deflate();
        self.flushed = false;
    }

    fn write_header(&mut self) {
        let window_bits = usize::BITS - (self.options.window_size - 1).leading_zeros();
        let cinfo = window_bits.clamp(8, 15) - 8;
        let cmf = (cinfo << 4) | 8;
        let flevel = match self.options.chain_length {
            0..=4 => 1,
            5..=32 => 2,
            _ => 3,
        };
        let mut flg = flevel << 6;
        flg += (31 - (cmf * 256 + flg) % 31) % 31;
        self.writer.write_bits(cmf, 8);
        self.writer.write_bits(flg, 8);
        debug!(cmf, flg, "zlib header");
    }

    /// Turn the pending input into symbols and write one block.
    fn emit_block(&mut self, last: bool) -> Result<()> {
        self.blocks.try_block()?;
        self.tokenize()?;

        let mut lit_freq = vec![0u32; LITERAL_CODES];
        let mut dist_freq = vec![0u32; DISTANCE_CODES];
        for t in &self.tokens {
            lit_freq[t.lcode as usize] += 1;
            if t.is_match() {
                dist_freq[t.dcode as usize] += 1;
            }
        }

        let data_extra: u64 = self
            .tokens
            .iter()
            .map(|t| t.lbits as u64 + t.dbits as u64)
            .sum();
        let stored_bits = self.stored_bits();
        let fixed_bits = 3 + data_extra + self.data_bits(&self.fixed_literals, &self.fixed_distances);
        let trees = self.dynamic_trees(&lit_freq, &dist_freq)?;
        let dynamic_bits =
            3 + trees.header_bits + data_extra + self.data_bits(&trees.literals, &trees.distances);

        let kind = if stored_bits <= fixed_bits.min(dynamic_bits) {
            BlockKind::Stored
        } else if fixed_bits <= dynamic_bits {
            BlockKind::Fixed
        } else {
            BlockKind::Dynamic
        };
        trace!(
            input = self.blocks.input_len(),
            symbols = self.tokens.len(),
            stored_bits,
            fixed_bits,
            dynamic_bits,
            ?kind,
            last,
            "deflate block"
        );

        match kind {
            BlockKind::Stored => self.write_stored(last),
            BlockKind::Fixed => {
                self.writer.write_bits(last as u32, 1);
                self.writer.write_bits(1, 2);
                let (lit, dist) = (&self.fixed_literals, &self.fixed_distances);
                write_tokens(&mut self.writer, &self.tokens, lit, dist)?;
            }
            BlockKind::Dynamic => {
                self.writer.write_bits(last as u32, 1);
                self.writer.write_bits(2, 2);
                write_trees(&mut self.writer, &trees)?;
                write_tokens(&mut self.writer, &self.tokens, &trees.literals, &trees.distances)?;
            }
        }

        self.blocks.clear_input();
        self.blocks.clear_output();
        Ok(())
    }

    fn tokenize(&mut self) -> Result<()> {
        self.tokens.clear();
        for command in parse(self.blocks.output()) {
            match command? {
                Command::Literal(bytes) => {
                    self.tokens.extend(bytes.iter().map(|&b| Token::literal(b)));
                }
                Command::Copy {
                    mut length,
                    distance,
                } => {
                    while length > 0 {
                        let take = if length <= MAX_MATCH {
                            length
                        } else if length - MAX_MATCH < 3 {
                            length - 3
                        } else {
                            MAX_MATCH
                        };
                        let row = self.table.encode(0, take as u32, false)?;
                        let (dcode, dextra) = self.ring.encode(distance as u32)?;
                        self.tokens.push(Token {
                            lcode: row.code,
                            lbits: row.copy_bits,
                            lextra: (take as u32 - row.copy_first) as u16,
                            dcode: dcode as u8,
                            dbits: self.ring.bit_count(dcode) as u8,
                            dextra: dextra as u16,
                        });
                        length -= take;
                    }
                }
                Command::Dictionary { .. } => {
                    return Err(Error::sanitize("dictionary reference in a zlib block"));
                }
            }
        }
        self.tokens.push(Token {
            lcode: END_OF_BLOCK as u16,
            ..Token::literal(0)
        });
        Ok(())
    }

    fn stored_bits(&self) -> u64 {
        let n = self.blocks.input_len();
        let chunks = ((n + MAX_STORED - 1) / MAX_STORED).max(1) as u64;
        let pad = (8 - (self.writer.partial_bits() as u64 + 3) % 8) % 8;
        pad + chunks * (3 + 32) + 8 * n as u64 + (chunks - 1) * 5
    }

    fn data_bits(&self, literals: &PrefixList, distances: &PrefixList) -> u64 {
        self.tokens
            .iter()
            .map(|t| {
                let mut bits = literals.len_of(t.lcode as u64) as u64;
                if t.is_match() {
                    bits += distances.len_of(t.dcode as u64) as u64;
                }
                bits
            })
            .sum()
    }

    fn dynamic_trees(&self, lit_freq: &[u32], dist_freq: &[u32]) -> Result<DynamicTrees> {
        let mut lit_freq = lit_freq.to_vec();
        let mut dist_freq = dist_freq.to_vec();
        ensure_two_symbols(&mut lit_freq);
        ensure_two_symbols(&mut dist_freq);

        let mut literals = PrefixList::new(LITERAL_CODES)?;
        literals.gen_lengths(&lit_freq, MAX_BITS)?;
        literals.gen_codes()?;
        let mut distances = PrefixList::new(DISTANCE_CODES)?;
        distances.gen_lengths(&dist_freq, MAX_BITS)?;
        distances.gen_codes()?;

        let lit_lengths: Vec<u8> = literals.lines().iter().map(|l| l.len as u8).collect();
        let dist_lengths: Vec<u8> = distances.lines().iter().map(|l| l.len as u8).collect();
        let hlit = trimmed_len(&lit_lengths, 257);
        let hdist = trimmed_len(&dist_lengths, 1);
        let mut all = lit_lengths[..hlit].to_vec();
        all.extend_from_slice(&dist_lengths[..hdist]);
        let tokens = rle_lengths(&all);

        let mut cl_freq = vec![0u32; CODE_LENGTH_CODES];
        for t in &tokens {
            cl_freq[t.symbol as usize] += 1;
        }
        ensure_two_symbols(&mut cl_freq);
        let mut code_lengths = PrefixList::new(CODE_LENGTH_CODES)?;
        code_lengths.gen_lengths(&cl_freq, MAX_CL_BITS)?;
        code_lengths.gen_codes()?;

        let hclen = CL_ORDER
            .iter()
            .rposition(|&s| code_lengths.lines()[s].len > 0)
            .map_or(4, |p| (p + 1).max(4));
        let token_bits: u64 = tokens
            .iter()
            .map(|t| code_lengths.len_of(t.symbol as u64) as u64 + repeat_bits(t.symbol).0 as u64)
            .sum();
        let header_bits = 5 + 5 + 4 + 3 * hclen as u64 + token_bits;

        Ok(DynamicTrees {
            literals,
            distances,
            code_lengths,
            hlit,
            hdist,
            hclen,
            tokens,
            header_bits,
        })
    }

    fn write_stored(&mut self, last: bool) {
        let input = self.blocks.input();
        let mut chunks = input.chunks(MAX_STORED).peekable();
        if chunks.peek().is_none() {
            write_stored_chunk(&mut self.writer, &[], last);
            return;
        }
        while let Some(chunk) = chunks.next() {
            let final_chunk = last && chunks.peek().is_none();
            write_stored_chunk(&mut self.writer, chunk, final_chunk);
        }
    }
}

fn write_stored_chunk(writer: &mut BitWriter, chunk: &[u8], last: bool) {
    writer.write_bits(last as u32, 1);
    writer.write_bits(0, 2);
    writer.align();
    let len = chunk.len() as u32;
    writer.write_bits(len, 16);
    writer.write_bits(!len & 0xFFFF, 16);
    writer.write_bytes(chunk);
}

fn write_trees(writer: &mut BitWriter, trees: &DynamicTrees) -> Result<()> {
    writer.write_bits((trees.hlit - 257) as u32, 5);
    writer.write_bits((trees.hdist - 1) as u32, 5);
    writer.write_bits((trees.hclen - 4) as u32, 4);
    for &symbol in &CL_ORDER[..trees.hclen] {
        writer.write_bits(trees.code_lengths.lines()[symbol].len as u32, 3);
    }
    for t in &trees.tokens {
        trees.code_lengths.encode(writer, t.symbol as u64)?;
        writer.write_bits(t.extra as u32, repeat_bits(t.symbol).0);
    }
    Ok(())
}

fn write_tokens(
    writer: &mut BitWriter,
    tokens: &[Token],
    literals: &PrefixList,
    distances: &PrefixList,
) -> Result<()> {
    for t in tokens {
        literals.encode(writer, t.lcode as u64)?;
        if t.is_match() {
            writer.write_bits(t.lextra as u32, t.lbits as u32);
            distances.encode(writer, t.dcode as u64)?;
            writer.write_bits(t.dextra as u32, t.dbits as u32);
        }
    }
    Ok(())
}

/// Give a histogram at least two used symbols so its code is complete.
fn ensure_two_symbols(freqs: &mut [u32]) {
    let mut used = freqs.iter().filter(|&&f| f > 0).count();
    for f in freqs.iter_mut() {
        if used >= 2 {
            break;
        }
        if *f == 0 {
            *f = 1;
            used += 1;
        }
    }
}

/// Length with trailing zeros dropped, but at least `min`.
fn trimmed_len(lengths: &[u8], min: usize) -> usize {
    lengths
        .iter()
        .rposition(|&l| l > 0)
        .map_or(min, |p| (p + 1).max(min))
}

impl StreamingCompressor for Deflater {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zlib
    }

    fn compress_chunk(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: Flush,
    ) -> Result<Progress> {
        self.encode(input, output, flush)
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::Inflater;

    fn encode_all(options: EncoderOptions, data: &[u8]) -> Vec<u8> {
        let mut enc = Deflater::new(options).unwrap();
        let mut out = vec![0u8; data.len() * 2 + 64];
        let p = enc.encode(data, &mut out, Flush::Finish).unwrap();
        assert_eq!(p.status, Status::Eof);
        assert_eq!(p.consumed, data.len());
        out.truncate(p.written);
        out
    }

    fn decode_all(stream: &[u8]) -> Vec<u8> {
        let mut dec = Inflater::new().unwrap();
        let mut out = vec![0u8; 1 << 20];
        let p = dec.decode(stream, &mut out).unwrap();
        assert_eq!(p.status, Status::Eof);
        out.truncate(p.written);
        out
    }

    #[test]
    fn test_empty_input() {
        let stream = encode_all(EncoderOptions::default(), b"");
        assert_eq!(stream[0], 0x78);
        assert_eq!((stream[0] as u32 * 256 + stream[1] as u32) % 31, 0);
        assert_eq!(decode_all(&stream), b"");
    }

    #[test]
    fn test_roundtrip_text() {
        let data = b"The quick brown fox jumps over the lazy dog. ".repeat(50);
        let stream = encode_all(EncoderOptions::default(), &data);
        assert!(stream.len() < data.len() / 4);
        assert_eq!(decode_all(&stream), data);
    }

    #[test]
    fn test_long_runs_split_matches() {
        let data = vec![b'z'; 5000];
        let stream = encode_all(EncoderOptions::new(8192, 32768, 8).unwrap(), &data);
        assert!(stream.len() < 100);
        assert_eq!(decode_all(&stream), data);
    }

    #[test]
    fn test_incompressible_goes_stored() {
        let mut x = 0x1234_5678u32;
        let data: Vec<u8> = (0..3000)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect();
        let stream = encode_all(EncoderOptions::default(), &data);
        assert!(stream.len() <= data.len() + 2 + 5 + 4 + 1);
        assert_eq!(decode_all(&stream), data);
    }

    #[test]
    fn test_small_blocks_share_window() {
        let data = b"abcdefgh".repeat(200);
        let stream = encode_all(EncoderOptions::new(16, 1024, 4).unwrap(), &data);
        assert_eq!(decode_all(&stream), data);
    }

    #[test]
    fn test_block_flush_is_decodable_prefix() {
        let mut enc = Deflater::new(EncoderOptions::default()).unwrap();
        let mut out = vec![0u8; 256];
        let p = enc.encode(b"hello hello", &mut out, Flush::Block).unwrap();
        assert_eq!(p.status, Status::Success);
        assert_eq!(&out[p.written - 4..p.written], &[0x00, 0x00, 0xFF, 0xFF]);

        let mut dec = Inflater::new().unwrap();
        let mut plain = [0u8; 32];
        let d = dec.decode(&out[..p.written], &mut plain).unwrap();
        assert_eq!(d.status, Status::Success);
        assert_eq!(&plain[..d.written], b"hello hello");

        // Repeating the flush without new input adds nothing.
        let again = enc.encode(b"", &mut out, Flush::Block).unwrap();
        assert_eq!(again.written, 0);
    }

    #[test]
    fn test_small_output_drains_across_calls() {
        let data = b"drain me slowly, drain me slowly, drain me slowly".to_vec();
        let mut enc = Deflater::new(EncoderOptions::default()).unwrap();
        let mut stream = Vec::new();
        let mut pos = 0;
        loop {
            let mut buf = [0u8; 3];
            let p = enc.encode(&data[pos..], &mut buf, Flush::Finish).unwrap();
            pos += p.consumed;
            stream.extend_from_slice(&buf[..p.written]);
            if p.is_eof() {
                break;
            }
        }
        assert!(enc.is_done());
        assert_eq!(decode_all(&stream), data);
    }

    #[test]
    fn test_window_rejected_above_limit() {
        let options = EncoderOptions {
            block_size: 4096,
            window_size: 65536,
            chain_length: 8,
        };
        assert!(Deflater::new(options).is_err());
    }
}
