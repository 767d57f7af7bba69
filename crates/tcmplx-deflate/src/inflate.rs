//! Resumable zlib/DEFLATE decoder.
//!
//! The decoder is a state machine over the RFC 1950 and RFC 1951 grammar.
//! Each state reads everything it needs or nothing at all, so a call can
//! stop at any bit when input runs out and pick up there on the next call.
//! Output bytes double as the match window: every produced byte is fed to
//! the owned [`BlockBuf`] and copies read back through it.

use tcmplx_core::{
    adler32, Adler32, Algorithm, Error, Progress, Result, Status, StreamingDecompressor,
};
use tcmplx_lz::BlockBuf;
use tcmplx_prefix::{BitReader, InsCopyTable, PrefixList, RingDist, RowKind, Source, TablePreset};
use tracing::{debug, trace};

use crate::huffman::{
    fixed_distances, fixed_literals, repeat_bits, CL_ORDER, CODE_LENGTH_CODES, DISTANCE_CODES,
    END_OF_BLOCK, LITERAL_CODES,
};

/// Largest DEFLATE window.
pub const WINDOW_SIZE: usize = 32768;

const CM_DEFLATE: u32 = 8;
const FDICT: u32 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    DictId,
    NeedDictionary,
    BlockHeader,
    StoredLength,
    Stored { remaining: u32 },
    TableCounts,
    CodeLengthCodes { index: usize },
    CodeLengths { index: usize },
    CodeLengthRepeat { index: usize, symbol: u8 },
    Symbol,
    PendingLiteral { byte: u8 },
    LengthExtra { code: u16 },
    Distance { length: u32 },
    DistanceExtra { length: u32, dcode: u32 },
    Copy { length: u32, distance: u32 },
    Trailer,
    Done,
}

enum Flow {
    Continue,
    NeedInput,
    NeedOutput,
    Done,
}

/// Output slice plus the span not yet folded into the checksum.
struct Sink<'o> {
    out: &'o mut [u8],
    written: usize,
    hashed: usize,
}

impl<'o> Sink<'o> {
    fn new(out: &'o mut [u8]) -> Self {
        Sink {
            out,
            written: 0,
            hashed: 0,
        }
    }

    #[inline]
    fn space(&self) -> usize {
        self.out.len() - self.written
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        self.out[self.written] = byte;
        self.written += 1;
    }

    fn fold_into(&mut self, adler: &mut Adler32) {
        adler.update(&self.out[self.hashed..self.written]);
        self.hashed = self.written;
    }
}

/// Read `n` bits or suspend.
macro_rules! need {
    ($reader:expr, $src:expr, $n:expr) => {
        match $reader.read($src, $n) {
            Some(v) => v,
            None => return Ok(Flow::NeedInput),
        }
    };
}

/// Streaming zlib decoder.
#[derive(Debug, Clone)]
pub struct Inflater {
    state: State,
    reader: BitReader,
    window: BlockBuf,
    table: InsCopyTable,
    ring: RingDist,
    literals: PrefixList,
    distances: PrefixList,
    code_lengths: PrefixList,
    cl_lengths: [u8; CODE_LENGTH_CODES],
    lengths: Vec<u8>,
    hlit: usize,
    hdist: usize,
    hclen: usize,
    last_block: bool,
    adler: Adler32,
    dict_id: u32,
    total_in: u64,
    total_out: u64,
}

impl Inflater {
    /// Create a decoder positioned at the zlib header.
    pub fn new() -> Result<Self> {
        Ok(Inflater {
            state: State::Header,
            reader: BitReader::new(),
            window: BlockBuf::new(1, WINDOW_SIZE, 1)?,
            table: InsCopyTable::new(TablePreset::Deflate),
            ring: RingDist::deflate(),
            literals: PrefixList::new(0)?,
            distances: PrefixList::new(0)?,
            code_lengths: PrefixList::new(0)?,
            cl_lengths: [0; CODE_LENGTH_CODES],
            lengths: Vec::new(),
            hlit: 0,
            hdist: 0,
            hclen: 0,
            last_block: false,
            adler: Adler32::new(),
            dict_id: 0,
            total_in: 0,
            total_out: 0,
        })
    }

    /// Decode from `input` into `output`.
    ///
    /// Returns [`Error::ZDictionary`] once the header asks for a preset
    /// dictionary; supply it with [`Inflater::set_dictionary`] and continue
    /// with the input after [`Inflater::total_in`] bytes.
    pub fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        let mut src = Source::new(input);
        let mut sink = Sink::new(output);
        let result = self.run(&mut src, &mut sink);
        sink.fold_into(&mut self.adler);
        self.total_in += src.consumed() as u64;
        self.total_out += sink.written as u64;
        let status = match result? {
            Flow::NeedInput | Flow::Continue => Status::Success,
            Flow::NeedOutput => Status::Partial,
            Flow::Done => Status::Eof,
        };
        Ok(Progress::new(src.consumed(), sink.written, status))
    }

    /// Supply the preset dictionary requested by the header.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.state != State::NeedDictionary {
            return Err(Error::param("stream did not request a dictionary"));
        }
        let actual = adler32(dictionary);
        if actual != self.dict_id {
            return Err(Error::checksum_mismatch(self.dict_id, actual));
        }
        self.window.bypass(dictionary)?;
        debug!(len = dictionary.len(), "preset dictionary loaded");
        self.state = State::BlockHeader;
        Ok(())
    }

    /// Input bytes consumed over the stream so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Output bytes produced over the stream so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Check if the trailer has been verified.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Prepare for a new stream.
    pub fn reset(&mut self) {
        self.state = State::Header;
        self.reader.reset();
        self.window.reset();
        self.ring = RingDist::deflate();
        self.last_block = false;
        self.adler = Adler32::new();
        self.dict_id = 0;
        self.total_in = 0;
        self.total_out = 0;
    }

    fn run(&mut self, src: &mut Source<'_>, sink: &mut Sink<'_>) -> Result<Flow> {
        loop {
            match self.step(src, sink)? {
                Flow::Continue => {}
                flow => return Ok(flow),
            }
        }
    }

    fn end_block(&mut self) {
        trace!(last = self.last_block, "end of block");
        self.state = if self.last_block {
            State::Trailer
        } else {
            State::BlockHeader
        };
    }

    #[inline]
    fn emit(&mut self, sink: &mut Sink<'_>, byte: u8) -> Result<()> {
        sink.push(byte);
        self.window.bypass_byte(byte)
    }

    fn step(&mut self, src: &mut Source<'_>, sink: &mut Sink<'_>) -> Result<Flow> {
        match self.state {
            State::Header => {
                if !self.reader.fill(src, 16) {
                    return Ok(Flow::NeedInput);
                }
                let cmf = need!(self.reader, src, 8);
                let flg = need!(self.reader, src, 8);
                if cmf & 0x0F != CM_DEFLATE {
                    return Err(Error::sanitize("unsupported compression method"));
                }
                if cmf >> 4 > 7 {
                    return Err(Error::sanitize("invalid window size"));
                }
                if (cmf * 256 + flg) % 31 != 0 {
                    return Err(Error::sanitize("zlib header check failed"));
                }
                debug!(
                    window = 1u32 << ((cmf >> 4) + 8),
                    dictionary = flg & FDICT != 0,
                    "zlib header"
                );
                self.state = if flg & FDICT != 0 {
                    State::DictId
                } else {
                    State::BlockHeader
                };
            }
            State::DictId => {
                if !self.reader.fill(src, 32) {
                    return Ok(Flow::NeedInput);
                }
                let mut id = 0u32;
                for _ in 0..4 {
                    id = (id << 8) | need!(self.reader, src, 8);
                }
                self.dict_id = id;
                self.state = State::NeedDictionary;
                return Err(Error::ZDictionary { checksum: id });
            }
            State::NeedDictionary => {
                return Err(Error::ZDictionary {
                    checksum: self.dict_id,
                });
            }
            State::BlockHeader => {
                if !self.reader.fill(src, 3) {
                    return Ok(Flow::NeedInput);
                }
                self.last_block = need!(self.reader, src, 1) == 1;
                let btype = need!(self.reader, src, 2);
                trace!(btype, last = self.last_block, "block header");
                self.state = match btype {
                    0 => State::StoredLength,
                    1 => {
                        self.literals = fixed_literals()?;
                        self.distances = fixed_distances()?;
                        State::Symbol
                    }
                    2 => State::TableCounts,
                    _ => return Err(Error::sanitize("reserved block type")),
                };
            }
            State::StoredLength => {
                self.reader.align();
                if !self.reader.fill(src, 32) {
                    return Ok(Flow::NeedInput);
                }
                let len = need!(self.reader, src, 16);
                let nlen = need!(self.reader, src, 16);
                if len != !nlen & 0xFFFF {
                    return Err(Error::sanitize("stored block length check failed"));
                }
                trace!(len, "stored block");
                self.state = State::Stored { remaining: len };
            }
            State::Stored { remaining } => {
                if remaining == 0 {
                    self.end_block();
                    return Ok(Flow::Continue);
                }
                if sink.space() == 0 {
                    return Ok(Flow::NeedOutput);
                }
                let start = sink.written;
                let want = (remaining as usize).min(sink.space());
                let buffered = self.reader.drain_bytes(&mut sink.out[start..start + want]);
                let fresh = src.take(want - buffered);
                let end = start + buffered + fresh.len();
                sink.out[start + buffered..end].copy_from_slice(fresh);
                sink.written = end;
                self.window.bypass(&sink.out[start..end])?;
                let took = (end - start) as u32;
                self.state = State::Stored {
                    remaining: remaining - took,
                };
                if took == 0 {
                    return Ok(Flow::NeedInput);
                }
            }
            State::TableCounts => {
                if !self.reader.fill(src, 14) {
                    return Ok(Flow::NeedInput);
                }
                self.hlit = need!(self.reader, src, 5) as usize + 257;
                self.hdist = need!(self.reader, src, 5) as usize + 1;
                self.hclen = need!(self.reader, src, 4) as usize + 4;
                if self.hlit > LITERAL_CODES || self.hdist > DISTANCE_CODES {
                    return Err(Error::sanitize("too many length or distance symbols"));
                }
                self.cl_lengths = [0; CODE_LENGTH_CODES];
                self.state = State::CodeLengthCodes { index: 0 };
            }
            State::CodeLengthCodes { mut index } => {
                while index < self.hclen {
                    self.cl_lengths[CL_ORDER[index]] = need!(self.reader, src, 3) as u8;
                    index += 1;
                    self.state = State::CodeLengthCodes { index };
                }
                self.code_lengths = PrefixList::from_lengths(&self.cl_lengths)
                    .map_err(|e| Error::sanitize(format!("code length code: {}", e)))?;
                self.lengths.clear();
                self.lengths.resize(self.hlit + self.hdist, 0);
                self.state = State::CodeLengths { index: 0 };
            }
            State::CodeLengths { index } => {
                if index == self.lengths.len() {
                    self.build_dynamic_tables()?;
                    self.state = State::Symbol;
                    return Ok(Flow::Continue);
                }
                let symbol = match self.code_lengths.decode(&mut self.reader, src)? {
                    Some(s) => s as u8,
                    None => return Ok(Flow::NeedInput),
                };
                self.state = if symbol < 16 {
                    self.lengths[index] = symbol;
                    State::CodeLengths { index: index + 1 }
                } else {
                    State::CodeLengthRepeat { index, symbol }
                };
            }
            State::CodeLengthRepeat { index, symbol } => {
                let (bits, base) = repeat_bits(symbol);
                let count = base + need!(self.reader, src, bits) as usize;
                let value = if symbol == 16 {
                    if index == 0 {
                        return Err(Error::sanitize("repeat with no previous length"));
                    }
                    self.lengths[index - 1]
                } else {
                    0
                };
                if index + count > self.lengths.len() {
                    return Err(Error::sanitize("code lengths overrun"));
                }
                self.lengths[index..index + count].fill(value);
                self.state = State::CodeLengths {
                    index: index + count,
                };
            }
            State::Symbol => {
                let symbol = match self.literals.decode(&mut self.reader, src)? {
                    Some(s) => s as usize,
                    None => return Ok(Flow::NeedInput),
                };
                let row = *self
                    .table
                    .get(symbol)
                    .map_err(|_| Error::sanitize("invalid literal/length symbol"))?;
                match row.kind {
                    RowKind::Literal => {
                        if sink.space() == 0 {
                            self.state = State::PendingLiteral { byte: symbol as u8 };
                            return Ok(Flow::NeedOutput);
                        }
                        self.emit(sink, symbol as u8)?;
                    }
                    RowKind::Stop => self.end_block(),
                    RowKind::Copy | RowKind::CopyMinus1 => {
                        self.state = if row.copy_bits == 0 {
                            State::Distance {
                                length: row.copy_first,
                            }
                        } else {
                            State::LengthExtra { code: row.code }
                        };
                    }
                    RowKind::InsertCopy | RowKind::BlockCount => {
                        return Err(Error::sanitize("invalid literal/length symbol"));
                    }
                }
            }
            State::PendingLiteral { byte } => {
                if sink.space() == 0 {
                    return Ok(Flow::NeedOutput);
                }
                self.emit(sink, byte)?;
                self.state = State::Symbol;
            }
            State::LengthExtra { code } => {
                let row = *self.table.get(code as usize)?;
                let extra = need!(self.reader, src, row.copy_bits as u32);
                self.state = State::Distance {
                    length: row.copy_len(extra),
                };
            }
            State::Distance { length } => {
                let dcode = match self.distances.decode(&mut self.reader, src)? {
                    Some(d) => d as u32,
                    None => return Ok(Flow::NeedInput),
                };
                if dcode as usize >= DISTANCE_CODES {
                    return Err(Error::sanitize("invalid distance symbol"));
                }
                if self.ring.bit_count(dcode) == 0 {
                    let distance = self.ring.decode(dcode, 0)?;
                    self.state = self.copy_state(length, distance)?;
                } else {
                    self.state = State::DistanceExtra { length, dcode };
                }
            }
            State::DistanceExtra { length, dcode } => {
                let extra = need!(self.reader, src, self.ring.bit_count(dcode));
                let distance = self.ring.decode(dcode, extra)?;
                self.state = self.copy_state(length, distance)?;
            }
            State::Copy {
                mut length,
                distance,
            } => {
                while length > 0 && sink.space() > 0 {
                    let byte = self.window.peek(distance as usize - 1)?;
                    self.emit(sink, byte)?;
                    length -= 1;
                }
                if length > 0 {
                    self.state = State::Copy { length, distance };
                    return Ok(Flow::NeedOutput);
                }
                self.state = State::Symbol;
            }
            State::Trailer => {
                self.reader.align();
                if !self.reader.fill(src, 32) {
                    return Ok(Flow::NeedInput);
                }
                let mut expected = 0u32;
                for _ in 0..4 {
                    expected = (expected << 8) | need!(self.reader, src, 8);
                }
                sink.fold_into(&mut self.adler);
                let actual = self.adler.finish();
                if expected != actual {
                    return Err(Error::checksum_mismatch(expected, actual));
                }
                debug!(
                    total_out = self.total_out + sink.written as u64,
                    "zlib stream complete"
                );
                self.state = State::Done;
                return Ok(Flow::Done);
            }
            State::Done => return Ok(Flow::Done),
        }
        Ok(Flow::Continue)
    }

    fn copy_state(&self, length: u32, distance: u32) -> Result<State> {
        if distance as usize > self.window.chain().size() {
            return Err(Error::sanitize("distance too far back"));
        }
        Ok(State::Copy { length, distance })
    }

    fn build_dynamic_tables(&mut self) -> Result<()> {
        if self.lengths[END_OF_BLOCK as usize] == 0 {
            return Err(Error::sanitize("missing end-of-block code"));
        }
        let (lit, dist) = self.lengths.split_at(self.hlit);
        self.literals = PrefixList::from_lengths(lit)
            .map_err(|e| Error::sanitize(format!("literal/length code: {}", e)))?;
        self.distances = PrefixList::from_lengths(dist)
            .map_err(|e| Error::sanitize(format!("distance code: {}", e)))?;
        trace!(
            hlit = self.hlit,
            hdist = self.hdist,
            hclen = self.hclen,
            max_literal_bits = self.literals.max_len(),
            "dynamic tables"
        );
        Ok(())
    }
}

impl StreamingDecompressor for Inflater {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zlib
    }

    fn decompress_chunk(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        self.decode(input, output)
    }

    fn is_finished(&self) -> bool {
        self.is_done()
    }

    fn reset(&mut self) {
        Inflater::reset(self);
    }
}
