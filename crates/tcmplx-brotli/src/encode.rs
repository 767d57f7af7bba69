//! Streaming Brotli encoder.
//!
//! Raw input is gathered into a [`BlockBuf`]. Each full block, or whatever
//! is pending at a flush, becomes one metablock with a single block type per
//! category and one literal and one distance tree. The literal context mode
//! is the one [`subdivide`] finds covering the most bytes. A metablock that
//! would come out larger than its raw bytes is sent uncompressed instead.

use tcmplx_core::{
    Algorithm, CompressionLevel, EncoderOptions, Error, Flush, Progress, Result, Status,
    StreamingCompressor, MAX_BLOCK_SIZE,
};
use tcmplx_lz::command::{parse, Command};
use tcmplx_lz::BlockBuf;
use tcmplx_prefix::{BitWriter, InsCopyTable, PrefixList, Preset, RingDist, TablePreset};
use tracing::{debug, trace};

use crate::ctxtmap::ContextMode;
use crate::ctxtspan::subdivide;
use crate::decode::{COMMAND_ALPHABET, LITERAL_ALPHABET, MAX_DISTANCE_BITS};
use crate::huffman::{build_code, write_code, write_varlen8};

/// Score slack when merging context spans.
const SPAN_MARGIN: u64 = 64;

/// Copy length paired with a trailing insert that has no copy.
const TAIL_COPY: u32 = 4;

/// Largest metadata block.
pub const MAX_METADATA: usize = 1 << 24;

/// Distance code and its extra bits.
#[derive(Debug, Clone, Copy)]
struct Distance {
    code: u16,
    bits: u8,
    extra: u32,
}

/// One insert-and-copy command, ready to write.
#[derive(Debug, Clone, Copy)]
struct Token {
    code: u16,
    insert_start: usize,
    insert_len: usize,
    insert_bits: u8,
    insert_extra: u32,
    copy_bits: u8,
    copy_extra: u32,
    distance: Option<Distance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Body,
    Finished,
}

/// Streaming Brotli encoder.
#[derive(Debug, Clone)]
pub struct BrotliEncoder {
    options: EncoderOptions,
    state: State,
    blocks: BlockBuf,
    writer: BitWriter,
    table: InsCopyTable,
    ring: RingDist,
    window_bits: u32,
    tokens: Vec<Token>,
    flushed: bool,
}

impl BrotliEncoder {
    /// Create an encoder.
    pub fn new(options: EncoderOptions) -> Result<Self> {
        options.validate_for(Algorithm::Brotli)?;
        let window_bits = (10..=24u32)
            .find(|&bits| (1usize << bits) - 16 >= options.window_size)
            .unwrap_or(24);
        Ok(BrotliEncoder {
            options,
            state: State::Header,
            blocks: BlockBuf::new(
                options.block_size,
                options.window_size,
                options.chain_length,
            )?,
            writer: BitWriter::new(),
            table: InsCopyTable::new(TablePreset::BrotliInsertCopy),
            ring: RingDist::new(true, 0, 0)?,
            window_bits,
            tokens: Vec::new(),
            flushed: false,
        })
    }

    /// Create an encoder for a compression level.
    pub fn with_level(level: CompressionLevel) -> Result<Self> {
        Self::new(EncoderOptions::with_level(Algorithm::Brotli, level))
    }

    /// Encoder options in use.
    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// WBITS written in the stream header.
    pub fn window_bits(&self) -> u32 {
        self.window_bits
    }

    /// Check if the last metablock has been written and drained.
    pub fn is_done(&self) -> bool {
        self.state == State::Finished && self.writer.pending() == 0
    }

    /// Queue a metadata block. Input already accepted is written first so
    /// the metadata keeps its place in the stream.
    pub fn add_metadata(&mut self, data: &[u8]) -> Result<()> {
        if self.state == State::Finished {
            return Err(Error::param("stream already finished"));
        }
        if data.len() > MAX_METADATA {
            return Err(Error::param(format!(
                "metadata of {} bytes exceeds {}",
                data.len(),
                MAX_METADATA
            )));
        }
        if self.state == State::Header {
            self.write_header()?;
            self.state = State::Body;
        }
        if self.blocks.input_len() > 0 {
            self.emit_block()?;
        }
        write_metadata(&mut self.writer, data);
        debug!(len = data.len(), "metadata block");
        Ok(())
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
            self.write_header()?;
            self.state = State::Body;
        }

        let mut consumed = 0;
        while consumed < input.len() {
            let take = self.blocks.available().min(input.len() - consumed);
            self.blocks.write(&input[consumed..consumed + take])?;
            consumed += take;
            self.flushed = false;
            if self.blocks.available() == 0 {
                self.emit_block()?;
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
                        self.emit_block()?;
                    }
                    // Empty metadata block to reach a byte boundary.
                    write_metadata(&mut self.writer, &[]);
                    self.flushed = true;
                }
            }
            Flush::Finish => {
                if self.blocks.input_len() > 0 {
                    self.emit_block()?;
                }
                self.writer.write_bits(1, 1); // ISLAST
                self.writer.write_bits(1, 1); // ISLASTEMPTY
                self.writer.align();
                self.state = State::Finished;
                debug!("brotli stream finished");
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
        self.ring.reset();
        self.flushed = false;
    }

    fn write_header(&mut self) -> Result<()> {
        let mut code = PrefixList::preset(Preset::WindowBits)?;
        code.valuesort();
        code.encode(&mut self.writer, self.window_bits as u64)?;
        debug!(wbits = self.window_bits, "brotli header");
        Ok(())
    }

    /// Turn the pending input into one metablock.
    fn emit_block(&mut self) -> Result<()> {
        self.blocks.try_block()?;
        let saved = self.ring.clone();
        self.tokenize()?;

        let mut scratch = BitWriter::new();
        let mode = self.write_compressed(&mut scratch)?;
        let len = self.blocks.input_len();
        let header = 1 + 2 + 4 * nibbles(len) as u64 + 1;
        let pad = (8 - (self.writer.partial_bits() as u64 + header) % 8) % 8;
        let stored_bits = header + pad + 8 * len as u64;
        let stored = stored_bits < scratch.bit_len();
        trace!(
            input = len,
            commands = self.tokens.len(),
            compressed_bits = scratch.bit_len(),
            stored_bits,
            ?mode,
            stored,
            "brotli metablock"
        );

        if stored {
            self.ring = saved;
            write_meta_length(&mut self.writer, len);
            self.writer.write_bits(1, 1); // ISUNCOMPRESSED
            self.writer.write_bytes(self.blocks.input());
        } else {
            self.writer.append(&scratch);
        }
        self.blocks.clear_input();
        self.blocks.clear_output();
        Ok(())
    }

    fn tokenize(&mut self) -> Result<()> {
        self.tokens.clear();
        let mut pos = 0usize;
        let mut insert_start = 0usize;
        for command in parse(self.blocks.output()) {
            match command? {
                Command::Literal(bytes) => pos += bytes.len(),
                Command::Copy { length, distance } => {
                    let insert = (pos - insert_start) as u32;
                    let (length, distance) = (length as u32, distance as u32);
                    let reuse = if distance == self.ring.last() {
                        self.table.encode(insert, length, true).ok().copied()
                    } else {
                        None
                    };
                    let (row, dist) = match reuse {
                        Some(row) => (row, None),
                        None => {
                            let row = *self.table.encode(insert, length, false)?;
                            let (dcode, extra) = self.ring.encode(distance)?;
                            let dist = Distance {
                                code: dcode as u16,
                                bits: self.ring.bit_count(dcode) as u8,
                                extra,
                            };
                            (row, Some(dist))
                        }
                    };
                    self.tokens.push(Token {
                        code: row.code,
                        insert_start,
                        insert_len: insert as usize,
                        insert_bits: row.insert_bits,
                        insert_extra: insert - row.insert_first,
                        copy_bits: row.copy_bits,
                        copy_extra: length - row.copy_first,
                        distance: dist,
                    });
                    pos += length as usize;
                    insert_start = pos;
                }
                Command::Dictionary { .. } => {
                    return Err(Error::sanitize("dictionary reference in block commands"));
                }
            }
        }
        if pos > insert_start {
            // Trailing literals ride a command whose copy the metablock
            // length cuts off.
            let insert = (pos - insert_start) as u32;
            let row = *self.table.encode(insert, TAIL_COPY, false)?;
            self.tokens.push(Token {
                code: row.code,
                insert_start,
                insert_len: insert as usize,
                insert_bits: row.insert_bits,
                insert_extra: insert - row.insert_first,
                copy_bits: row.copy_bits,
                copy_extra: TAIL_COPY - row.copy_first,
                distance: None,
            });
        }
        Ok(())
    }

    /// Write the pending block as a compressed metablock.
    fn write_compressed(&self, w: &mut BitWriter) -> Result<ContextMode> {
        let data = self.blocks.input();
        let mode = choose_mode(data);

        let mut lit_freq = vec![0u32; LITERAL_ALPHABET];
        let mut cmd_freq = vec![0u32; COMMAND_ALPHABET];
        let mut dist_freq = vec![0u32; self.ring.alphabet_size(MAX_DISTANCE_BITS) as usize];
        for t in &self.tokens {
            cmd_freq[t.code as usize] += 1;
            for &b in &data[t.insert_start..t.insert_start + t.insert_len] {
                lit_freq[b as usize] += 1;
            }
            if let Some(d) = t.distance {
                dist_freq[d.code as usize] += 1;
            }
        }
        let literals = build_code(&lit_freq)?;
        let commands = build_code(&cmd_freq)?;
        let distances = build_code(&dist_freq)?;

        write_meta_length(w, data.len());
        w.write_bits(0, 1); // ISUNCOMPRESSED
        for _ in 0..3 {
            write_varlen8(w, 0); // NBLTYPES
        }
        w.write_bits(self.ring.postfix(), 2);
        w.write_bits(self.ring.direct_count() >> self.ring.postfix(), 4);
        w.write_bits(mode.bits(), 2);
        write_varlen8(w, 0); // NTREESL
        write_varlen8(w, 0); // NTREESD
        write_code(w, &literals, LITERAL_ALPHABET)?;
        write_code(w, &commands, COMMAND_ALPHABET)?;
        write_code(w, &distances, dist_freq.len())?;

        for t in &self.tokens {
            commands.encode(w, t.code as u64)?;
            w.write_bits(t.insert_extra, t.insert_bits as u32);
            w.write_bits(t.copy_extra, t.copy_bits as u32);
            for &b in &data[t.insert_start..t.insert_start + t.insert_len] {
                literals.encode(w, b as u64)?;
            }
            if let Some(d) = t.distance {
                distances.encode(w, d.code as u64)?;
                w.write_bits(d.extra, d.bits as u32);
            }
        }
        Ok(mode)
    }
}

impl StreamingCompressor for BrotliEncoder {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Brotli
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
        BrotliEncoder::reset(self);
    }
}

/// Nibbles needed for `MLEN - 1`, at least four.
fn nibbles(len: usize) -> u32 {
    let bits = usize::BITS - len.saturating_sub(1).leading_zeros();
    ((bits + 3) / 4).max(4)
}

/// ISLAST (always clear here), MNIBBLES and MLEN - 1 for a data metablock.
fn write_meta_length(w: &mut BitWriter, len: usize) {
    debug_assert!(len > 0 && len <= MAX_BLOCK_SIZE);
    let n = nibbles(len);
    w.write_bits(0, 1);
    w.write_bits(n - 4, 2);
    w.write_bits((len - 1) as u32, 4 * n);
}

fn write_metadata(w: &mut BitWriter, data: &[u8]) {
    w.write_bits(0, 1); // ISLAST
    w.write_bits(3, 2); // MNIBBLES = 0
    w.write_bits(0, 1); // reserved
    if data.is_empty() {
        w.write_bits(0, 2);
        w.align();
        return;
    }
    let skip = (data.len() - 1) as u32;
    let bytes = match skip {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        _ => 3,
    };
    w.write_bits(bytes, 2);
    w.write_bits(skip, 8 * bytes);
    w.write_bytes(data);
}

/// Mode covering the most bytes across the buffer's spans.
fn choose_mode(data: &[u8]) -> ContextMode {
    let spans = subdivide(data, SPAN_MARGIN);
    let mut coverage = [0usize; 4];
    for (i, span) in spans.iter().enumerate() {
        let end = spans.get(i + 1).map_or(data.len(), |next| next.offset);
        coverage[span.mode.bits() as usize] += end - span.offset;
    }
    let best = (0..4).rev().max_by_key(|&m| coverage[m]).unwrap_or(0);
    ContextMode::from_bits(best as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::BrotliDecoder;

    fn encode_all(enc: &mut BrotliEncoder, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; 1024];
        let mut input = data;
        loop {
            let p = enc.encode(input, &mut buf, Flush::Finish).unwrap();
            out.extend_from_slice(&buf[..p.written]);
            input = &input[p.consumed..];
            if p.status == Status::Eof {
                return out;
            }
        }
    }

    fn decode_all(stream: &[u8]) -> (Vec<u8>, BrotliDecoder) {
        let mut dec = BrotliDecoder::new().unwrap();
        let mut out = Vec::new();
        let mut buf = vec![0u8; 1024];
        let mut input = stream;
        loop {
            let p = dec.decode(input, &mut buf).unwrap();
            out.extend_from_slice(&buf[..p.written]);
            input = &input[p.consumed..];
            match p.status {
                Status::Eof => return (out, dec),
                Status::Success if input.is_empty() => panic!("truncated stream"),
                _ => {}
            }
        }
    }

    fn options() -> EncoderOptions {
        EncoderOptions::new(4096, 1 << 16, 16).unwrap()
    }

    #[test]
    fn test_empty_input() {
        let mut enc = BrotliEncoder::new(options()).unwrap();
        let stream = encode_all(&mut enc, b"");
        // WBITS 17 then ISLAST, ISLASTEMPTY.
        assert_eq!(stream.len(), 2);
        let (out, _) = decode_all(&stream);
        assert!(out.is_empty());
        assert!(enc.is_done());
    }

    #[test]
    fn test_window_bits() {
        let enc = BrotliEncoder::new(options()).unwrap();
        assert_eq!(enc.window_bits(), 17);
        let enc = BrotliEncoder::new(EncoderOptions::new(64, 1008, 4).unwrap()).unwrap();
        assert_eq!(enc.window_bits(), 10);
        let enc = BrotliEncoder::with_level(CompressionLevel::Default).unwrap();
        assert_eq!(enc.window_bits(), 22);
    }

    #[test]
    fn test_roundtrip_text() {
        let data = b"It was the best of times, it was the worst of times. ".repeat(80);
        let mut enc = BrotliEncoder::new(options()).unwrap();
        let stream = encode_all(&mut enc, &data);
        assert!(stream.len() < data.len() / 4);
        let (out, _) = decode_all(&stream);
        assert_eq!(out, data);
    }

    #[test]
    fn test_incompressible_goes_uncompressed() {
        let data: Vec<u8> = (0..3000u32)
            .map(|i| (i.wrapping_mul(2654435761) >> 13) as u8)
            .collect();
        let mut enc = BrotliEncoder::new(options()).unwrap();
        let stream = encode_all(&mut enc, &data);
        assert!(stream.len() <= data.len() + 16);
        let (out, _) = decode_all(&stream);
        assert_eq!(out, data);
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut enc = BrotliEncoder::new(options()).unwrap();
        let mut out = vec![0u8; 4096];
        let mut stream = Vec::new();
        let p = enc.encode(b"before ", &mut out, Flush::None).unwrap();
        stream.extend_from_slice(&out[..p.written]);
        enc.add_metadata(b"first").unwrap();
        enc.add_metadata(&[]).unwrap();
        enc.add_metadata(&vec![7u8; 300]).unwrap();
        let p = enc.encode(b"after", &mut out, Flush::Finish).unwrap();
        stream.extend_from_slice(&out[..p.written]);
        assert_eq!(p.status, Status::Eof);

        let (data, dec) = decode_all(&stream);
        assert_eq!(data, b"before after");
        assert_eq!(dec.metadata(), &[b"first".to_vec(), vec![7u8; 300]]);
        assert!(enc.add_metadata(b"late").is_err());
    }

    #[test]
    fn test_metadata_too_large() {
        let mut enc = BrotliEncoder::new(options()).unwrap();
        let big = vec![0u8; MAX_METADATA + 1];
        assert!(matches!(enc.add_metadata(&big), Err(Error::Param(_))));
    }

    #[test]
    fn test_block_flush_is_decodable() {
        let mut enc = BrotliEncoder::new(options()).unwrap();
        let mut dec = BrotliDecoder::new().unwrap();
        let mut out = vec![0u8; 4096];
        let mut plain = vec![0u8; 4096];
        for chunk in [&b"alpha "[..], b"beta ", b"gamma"] {
            let p = enc.encode(chunk, &mut out, Flush::Block).unwrap();
            assert_eq!(p.status, Status::Success);
            let q = dec.decode(&out[..p.written], &mut plain).unwrap();
            assert_eq!(q.consumed, p.written);
            assert_eq!(&plain[..q.written], chunk);
        }
        // A second flush with no new input adds nothing.
        let p = enc.encode(&[], &mut out, Flush::Block).unwrap();
        assert_eq!(p.written, 0);
    }

    #[test]
    fn test_tiny_output_buffer() {
        let data = b"abcabcabcabcabcabcabc tiny buffers ".repeat(20);
        let mut enc = BrotliEncoder::new(options()).unwrap();
        let mut stream = Vec::new();
        let mut input = &data[..];
        loop {
            let mut buf = [0u8; 1];
            let p = enc.encode(input, &mut buf, Flush::Finish).unwrap();
            stream.extend_from_slice(&buf[..p.written]);
            input = &input[p.consumed..];
            if p.status == Status::Eof {
                break;
            }
        }
        let (out, _) = decode_all(&stream);
        assert_eq!(out, data);
    }

    #[test]
    fn test_reset() {
        let mut enc = BrotliEncoder::new(options()).unwrap();
        let first = encode_all(&mut enc, b"same input, same input");
        enc.reset();
        let second = encode_all(&mut enc, b"same input, same input");
        assert_eq!(first, second);
    }

    /// Force the compressed form of one metablock, skipping the stored
    /// fallback, and close the stream.
    fn compressed_stream(data: &[u8]) -> Vec<u8> {
        let mut enc = BrotliEncoder::new(options()).unwrap();
        enc.write_header().unwrap();
        enc.blocks.write(data).unwrap();
        enc.blocks.try_block().unwrap();
        enc.tokenize().unwrap();
        let mut w = enc.writer.clone();
        enc.write_compressed(&mut w).unwrap();
        w.write_bits(1, 1);
        w.write_bits(1, 1);
        w.align();
        w.take_bytes()
    }

    #[test]
    fn test_single_symbol_alphabets() {
        // One literal, one command, one distance.
        let run = [b'a'; 20];
        let (out, _) = decode_all(&compressed_stream(&run));
        assert_eq!(out, run);
        let mut enc = BrotliEncoder::new(options()).unwrap();
        let (out, _) = decode_all(&encode_all(&mut enc, &run));
        assert_eq!(out, run);

        // One insert-only command and no distances at all.
        let (out, _) = decode_all(&compressed_stream(b"abcdefgh"));
        assert_eq!(out, b"abcdefgh");
        let (out, _) = decode_all(&compressed_stream(b"z"));
        assert_eq!(out, b"z");
    }

    #[test]
    fn test_short_inputs_roundtrip() {
        for data in [&b"dispatch by algorithm "[..], b"x", b"xy", b"aaaa", b"abab"] {
            let mut enc = BrotliEncoder::new(options()).unwrap();
            let (out, _) = decode_all(&encode_all(&mut enc, data));
            assert_eq!(out, data);
        }
    }

    #[test]
    fn test_nibbles() {
        assert_eq!(nibbles(1), 4);
        assert_eq!(nibbles(1 << 16), 4);
        assert_eq!(nibbles((1 << 16) + 1), 5);
        assert_eq!(nibbles(1 << 24), 6);
    }
}
