//! Resumable Brotli decoder.
//!
//! Same shape as the zlib decoder: a state machine where every state reads
//! all of its bits or none, so decoding can stop at any bit boundary and
//! resume on the next call. Produced bytes feed a [`BlockBuf`] sized to the
//! stream's window, and backward copies read through it.

use tcmplx_core::{Algorithm, Error, Progress, Result, Status, StreamingDecompressor};
use tcmplx_lz::BlockBuf;
use tcmplx_prefix::{
    BitReader, InsCopyTable, PrefixList, Preset, RingDist, RowKind, Source, TablePreset,
};
use tracing::{debug, trace};

use crate::bdict;
use crate::ctxtmap::{
    distance_context, literal_context, ContextMap, ContextMode, DISTANCE_CONTEXTS,
    LITERAL_CONTEXTS,
};
use crate::huffman::{read_varlen8, CodeReader};

/// Block categories, in header order.
pub(crate) const LITERALS: usize = 0;
pub(crate) const COMMANDS: usize = 1;
pub(crate) const DISTANCES: usize = 2;

pub(crate) const LITERAL_ALPHABET: usize = 256;
pub(crate) const COMMAND_ALPHABET: usize = 704;
const BLOCK_COUNT_ALPHABET: usize = 26;

/// Largest distance extra-bit count.
pub(crate) const MAX_DISTANCE_BITS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WindowBits,
    MetaLast,
    MetaLastEmpty,
    MetaNibbles,
    MetaLength { nibbles: u32 },
    MetaUncompressedFlag,
    Uncompressed,
    MetaReserved,
    MetaSkipBytes,
    MetaSkipLength { bytes: u32 },
    MetaSkip { remaining: u32 },
    BlockTypes { cat: usize },
    BlockTypeCode { cat: usize },
    BlockCountCode { cat: usize },
    CountSymbol { cat: usize, header: bool },
    CountExtra { cat: usize, code: u16, header: bool },
    DistanceParams,
    ContextModes,
    TreeCount { cat: usize },
    MapRle { cat: usize },
    MapCode { cat: usize },
    MapCells { cat: usize, index: usize },
    MapRun { cat: usize, index: usize, symbol: u32 },
    MapImtf { cat: usize },
    Trees { group: usize, index: usize },
    Command,
    CommandExtra { code: u16 },
    Literal,
    Distance,
    DistanceExtra { dcode: u32 },
    Copy,
    DictWord { pos: usize },
    SwitchType { cat: usize },
    Trailer,
    Done,
}

enum Flow {
    Continue,
    NeedInput,
    NeedOutput,
    Done,
}

struct Sink<'o> {
    out: &'o mut [u8],
    written: usize,
}

impl<'o> Sink<'o> {
    fn new(out: &'o mut [u8]) -> Self {
        Sink { out, written: 0 }
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

/// Decode one symbol or suspend.
macro_rules! symbol {
    ($code:expr, $reader:expr, $src:expr) => {
        match $code.decode(&mut $reader, $src)? {
            Some(v) => v,
            None => return Ok(Flow::NeedInput),
        }
    };
}

/// Block type bookkeeping for one category.
#[derive(Debug, Clone)]
struct BlockSwitch {
    ntypes: usize,
    current: usize,
    previous: usize,
    remaining: u32,
    types: PrefixList,
    counts: PrefixList,
}

impl BlockSwitch {
    fn new() -> Self {
        BlockSwitch {
            ntypes: 1,
            current: 0,
            previous: 1,
            remaining: 0,
            types: PrefixList::single(0),
            counts: PrefixList::single(0),
        }
    }

    /// Check if the current block ran out and a switch command is due.
    #[inline]
    fn due(&self) -> bool {
        self.ntypes > 1 && self.remaining == 0
    }

    #[inline]
    fn count_one(&mut self) {
        if self.ntypes > 1 {
            self.remaining -= 1;
        }
    }

    /// Apply a block type symbol: 0 repeats the previous type, 1 advances.
    fn switch_to(&mut self, symbol: u64) {
        let mut next = match symbol {
            0 => self.previous,
            1 => self.current + 1,
            n => n as usize - 2,
        };
        if next >= self.ntypes {
            next -= self.ntypes;
        }
        self.previous = self.current;
        self.current = next;
    }
}

/// Streaming Brotli decoder.
#[derive(Debug, Clone)]
pub struct BrotliDecoder {
    state: State,
    reader: BitReader,
    window: BlockBuf,
    window_size: usize,
    wbits_code: PrefixList,
    table: InsCopyTable,
    counts_table: InsCopyTable,
    ring: RingDist,
    code: CodeReader,
    is_last: bool,
    meta_remaining: u32,
    switches: [BlockSwitch; 3],
    modes: Vec<ContextMode>,
    literal_map: ContextMap,
    distance_map: ContextMap,
    ntrees: [usize; 3],
    rle_max: u32,
    map_code: PrefixList,
    literal_trees: Vec<PrefixList>,
    command_trees: Vec<PrefixList>,
    distance_trees: Vec<PrefixList>,
    insert_remaining: u32,
    copy_len: u32,
    distance: u32,
    zero_distance: bool,
    word: Vec<u8>,
    p1: u8,
    p2: u8,
    pos: u64,
    metadata: Vec<Vec<u8>>,
    total_in: u64,
    total_out: u64,
}

impl BrotliDecoder {
    /// Create a decoder positioned at the stream header.
    pub fn new() -> Result<Self> {
        Ok(BrotliDecoder {
            state: State::WindowBits,
            reader: BitReader::new(),
            window: BlockBuf::new(1, 0, 1)?,
            window_size: 0,
            wbits_code: PrefixList::preset(Preset::WindowBits)?,
            table: InsCopyTable::new(TablePreset::BrotliInsertCopy),
            counts_table: InsCopyTable::new(TablePreset::BrotliBlockCount),
            ring: RingDist::new(true, 0, 0)?,
            code: CodeReader::new()?,
            is_last: false,
            meta_remaining: 0,
            switches: [BlockSwitch::new(), BlockSwitch::new(), BlockSwitch::new()],
            modes: Vec::new(),
            literal_map: ContextMap::new(1, LITERAL_CONTEXTS)?,
            distance_map: ContextMap::new(1, DISTANCE_CONTEXTS)?,
            ntrees: [1; 3],
            rle_max: 0,
            map_code: PrefixList::single(0),
            literal_trees: Vec::new(),
            command_trees: Vec::new(),
            distance_trees: Vec::new(),
            insert_remaining: 0,
            copy_len: 0,
            distance: 0,
            zero_distance: false,
            word: Vec::with_capacity(bdict::MAX_TRANSFORMED_LEN),
            p1: 0,
            p2: 0,
            pos: 0,
            metadata: Vec::new(),
            total_in: 0,
            total_out: 0,
        })
    }

    /// Decode from `input` into `output`.
    ///
    /// `Success` means all input was used and more is needed, `Partial`
    /// means `output` filled up, and `Eof` means the stream ended.
    pub fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        let mut src = Source::new(input);
        let mut sink = Sink::new(output);
        let result = self.run(&mut src, &mut sink);
        self.total_in += src.consumed() as u64;
        self.total_out += sink.written as u64;
        let status = match result? {
            Flow::NeedInput | Flow::Continue => Status::Success,
            Flow::NeedOutput => Status::Partial,
            Flow::Done => Status::Eof,
        };
        Ok(Progress::new(src.consumed(), sink.written, status))
    }

    /// Metadata blocks seen so far, in stream order. Empty metadata blocks
    /// are flush markers and are not kept.
    pub fn metadata(&self) -> &[Vec<u8>] {
        &self.metadata
    }

    /// Take the metadata blocks seen so far.
    pub fn take_metadata(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.metadata)
    }

    /// Window size from the stream header, or zero before it is read.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Input bytes consumed over the stream so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Output bytes produced over the stream so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Check if the last metablock has been read.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Prepare for a new stream.
    pub fn reset(&mut self) {
        self.state = State::WindowBits;
        self.reader.reset();
        self.window.reset();
        self.window_size = 0;
        self.ring.reset();
        self.is_last = false;
        self.meta_remaining = 0;
        self.p1 = 0;
        self.p2 = 0;
        self.pos = 0;
        self.metadata.clear();
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

    #[inline]
    fn emit(&mut self, sink: &mut Sink<'_>, byte: u8) -> Result<()> {
        sink.push(byte);
        self.p2 = self.p1;
        self.p1 = byte;
        self.pos += 1;
        self.meta_remaining -= 1;
        self.window.bypass_byte(byte)
    }

    fn end_metablock(&mut self) {
        trace!(last = self.is_last, pos = self.pos, "end of metablock");
        self.state = if self.is_last {
            State::Trailer
        } else {
            State::MetaLast
        };
    }

    /// Padding before uncompressed or metadata bytes must be zero.
    fn align_zero(&mut self) -> Result<()> {
        if self.reader.align() != 0 {
            return Err(Error::sanitize("nonzero padding bits"));
        }
        Ok(())
    }

    fn begin_compressed(&mut self) {
        for switch in &mut self.switches {
            *switch = BlockSwitch::new();
        }
        self.modes.clear();
        self.literal_trees.clear();
        self.command_trees.clear();
        self.distance_trees.clear();
        self.state = State::BlockTypes { cat: LITERALS };
    }

    fn after_count(cat: usize, header: bool) -> State {
        match (header, cat) {
            (true, DISTANCES) => State::DistanceParams,
            (true, _) => State::BlockTypes { cat: cat + 1 },
            (false, LITERALS) => State::Literal,
            (false, COMMANDS) => State::Command,
            (false, _) => State::Distance,
        }
    }

    fn tree_group(&mut self, group: usize) -> &mut Vec<PrefixList> {
        match group {
            LITERALS => &mut self.literal_trees,
            COMMANDS => &mut self.command_trees,
            _ => &mut self.distance_trees,
        }
    }

    fn group_size(&self, group: usize) -> usize {
        match group {
            COMMANDS => self.switches[COMMANDS].ntypes,
            cat => self.ntrees[cat],
        }
    }

    fn group_alphabet(&self, group: usize) -> usize {
        match group {
            LITERALS => LITERAL_ALPHABET,
            COMMANDS => COMMAND_ALPHABET,
            _ => self.ring.alphabet_size(MAX_DISTANCE_BITS) as usize,
        }
    }

    fn map_mut(&mut self, cat: usize) -> &mut ContextMap {
        if cat == LITERALS {
            &mut self.literal_map
        } else {
            &mut self.distance_map
        }
    }

    fn after_map(&mut self, cat: usize) -> State {
        if cat == LITERALS {
            State::TreeCount { cat: DISTANCES }
        } else {
            self.code.begin(LITERAL_ALPHABET);
            State::Trees { group: 0, index: 0 }
        }
    }

    fn after_insert(&mut self) -> Result<State> {
        if self.meta_remaining == 0 {
            return Ok(if self.is_last {
                State::Trailer
            } else {
                State::MetaLast
            });
        }
        if self.zero_distance {
            let distance = self.ring.last();
            return self.copy_state(distance, None);
        }
        Ok(State::Distance)
    }

    fn after_command(&self) -> State {
        if self.meta_remaining == 0 {
            if self.is_last {
                State::Trailer
            } else {
                State::MetaLast
            }
        } else {
            State::Command
        }
    }

    fn start_command(&mut self, code: u16, insert_extra: u32, copy_extra: u32) -> Result<State> {
        let row = *self.table.get(code as usize)?;
        if row.kind != RowKind::InsertCopy {
            return Err(Error::sanitize("invalid insert-and-copy symbol"));
        }
        let insert = row.insert_len(insert_extra);
        if insert > self.meta_remaining {
            return Err(Error::sanitize("insert length exceeds metablock"));
        }
        self.insert_remaining = insert;
        self.copy_len = row.copy_len(copy_extra);
        self.zero_distance = row.zero_distance;
        if insert > 0 {
            Ok(State::Literal)
        } else {
            self.after_insert()
        }
    }

    /// Decide between a window copy and a dictionary word. `saved` is the
    /// ring as it was before the distance code, restored for dictionary
    /// references.
    fn copy_state(&mut self, distance: u32, saved: Option<RingDist>) -> Result<State> {
        let max_distance = (self.window_size as u64).min(self.pos);
        if distance as u64 <= max_distance {
            if self.copy_len > self.meta_remaining {
                return Err(Error::sanitize("copy length exceeds metablock"));
            }
            self.distance = distance;
            return Ok(State::Copy);
        }
        if let Some(saved) = saved {
            self.ring = saved;
        }
        let len = self.copy_len as usize;
        if !(bdict::MIN_WORD_LEN..=bdict::MAX_WORD_LEN).contains(&len) {
            return Err(Error::sanitize("distance too far back"));
        }
        let word_id = distance as u64 - max_distance - 1;
        self.word.clear();
        bdict::lookup(len, word_id as usize, &mut self.word)?;
        if self.word.len() > self.meta_remaining as usize {
            return Err(Error::sanitize("dictionary word exceeds metablock"));
        }
        trace!(len, word_id, out = self.word.len(), "dictionary word");
        Ok(State::DictWord { pos: 0 })
    }

    fn resolve_distance(&mut self, dcode: u32, extra: u32) -> Result<State> {
        let saved = self.ring.clone();
        let distance = self.ring.decode(dcode, extra)?;
        self.copy_state(distance, Some(saved))
    }

    fn step(&mut self, src: &mut Source<'_>, sink: &mut Sink<'_>) -> Result<Flow> {
        match self.state {
            State::WindowBits => {
                let wbits = symbol!(self.wbits_code, self.reader, src) as u32;
                self.window_size = (1usize << wbits) - 16;
                self.window = BlockBuf::new(1, self.window_size, 1)?;
                debug!(wbits, window = self.window_size, "brotli header");
                self.state = State::MetaLast;
            }
            State::MetaLast => {
                self.is_last = need!(self.reader, src, 1) == 1;
                self.state = if self.is_last {
                    State::MetaLastEmpty
                } else {
                    State::MetaNibbles
                };
            }
            State::MetaLastEmpty => {
                self.state = if need!(self.reader, src, 1) == 1 {
                    State::Trailer
                } else {
                    State::MetaNibbles
                };
            }
            State::MetaNibbles => {
                let code = need!(self.reader, src, 2);
                self.state = if code == 3 {
                    State::MetaReserved
                } else {
                    State::MetaLength { nibbles: code + 4 }
                };
            }
            State::MetaLength { nibbles } => {
                let value = need!(self.reader, src, nibbles * 4);
                if nibbles > 4 && value >> ((nibbles - 1) * 4) == 0 {
                    return Err(Error::sanitize("exuberant nibble in metablock length"));
                }
                self.meta_remaining = value + 1;
                trace!(mlen = self.meta_remaining, last = self.is_last, "metablock");
                if self.is_last {
                    self.begin_compressed();
                } else {
                    self.state = State::MetaUncompressedFlag;
                }
            }
            State::MetaUncompressedFlag => {
                if need!(self.reader, src, 1) == 1 {
                    self.align_zero()?;
                    self.state = State::Uncompressed;
                } else {
                    self.begin_compressed();
                }
            }
            State::Uncompressed => {
                while self.meta_remaining > 0 {
                    if sink.space() == 0 {
                        return Ok(Flow::NeedOutput);
                    }
                    let byte = need!(self.reader, src, 8) as u8;
                    self.emit(sink, byte)?;
                }
                self.end_metablock();
            }
            State::MetaReserved => {
                if need!(self.reader, src, 1) != 0 {
                    return Err(Error::sanitize("reserved metablock bit set"));
                }
                self.state = State::MetaSkipBytes;
            }
            State::MetaSkipBytes => {
                let bytes = need!(self.reader, src, 2);
                if bytes == 0 {
                    self.align_zero()?;
                    trace!("empty metadata block");
                    self.end_metablock();
                } else {
                    self.state = State::MetaSkipLength { bytes };
                }
            }
            State::MetaSkipLength { bytes } => {
                let value = need!(self.reader, src, bytes * 8);
                if bytes > 1 && value >> ((bytes - 1) * 8) == 0 {
                    return Err(Error::sanitize("exuberant byte in metadata length"));
                }
                let len = value as usize + 1;
                let mut block = Vec::new();
                block
                    .try_reserve_exact(len)
                    .map_err(|_| Error::memory(len))?;
                self.metadata.push(block);
                self.align_zero()?;
                self.state = State::MetaSkip {
                    remaining: len as u32,
                };
            }
            State::MetaSkip { mut remaining } => {
                while remaining > 0 {
                    let byte = need!(self.reader, src, 8) as u8;
                    if let Some(block) = self.metadata.last_mut() {
                        block.push(byte);
                    }
                    remaining -= 1;
                    self.state = State::MetaSkip { remaining };
                }
                debug!(
                    len = self.metadata.last().map_or(0, Vec::len),
                    "metadata block"
                );
                self.end_metablock();
            }
            State::BlockTypes { cat } => {
                let Some(n) = read_varlen8(&mut self.reader, src) else {
                    return Ok(Flow::NeedInput);
                };
                let switch = &mut self.switches[cat];
                switch.ntypes = n as usize + 1;
                switch.current = 0;
                switch.previous = 1;
                switch.remaining = 0;
                self.state = if switch.ntypes > 1 {
                    self.code.begin(switch.ntypes + 2);
                    State::BlockTypeCode { cat }
                } else {
                    Self::after_count(cat, true)
                };
            }
            State::BlockTypeCode { cat } => {
                let Some(types) = self.code.step(&mut self.reader, src)? else {
                    return Ok(Flow::NeedInput);
                };
                self.switches[cat].types = types;
                self.code.begin(BLOCK_COUNT_ALPHABET);
                self.state = State::BlockCountCode { cat };
            }
            State::BlockCountCode { cat } => {
                let Some(counts) = self.code.step(&mut self.reader, src)? else {
                    return Ok(Flow::NeedInput);
                };
                self.switches[cat].counts = counts;
                self.state = State::CountSymbol { cat, header: true };
            }
            State::CountSymbol { cat, header } => {
                let code = symbol!(self.switches[cat].counts, self.reader, src) as u16;
                let row = *self
                    .counts_table
                    .get(code as usize)
                    .map_err(|_| Error::sanitize("invalid block count symbol"))?;
                if row.insert_bits == 0 {
                    self.switches[cat].remaining = row.insert_first;
                    self.state = Self::after_count(cat, header);
                } else {
                    self.state = State::CountExtra { cat, code, header };
                }
            }
            State::CountExtra { cat, code, header } => {
                let row = *self.counts_table.get(code as usize)?;
                let extra = need!(self.reader, src, row.insert_bits as u32);
                self.switches[cat].remaining = row.insert_len(extra);
                self.state = Self::after_count(cat, header);
            }
            State::DistanceParams => {
                if !self.reader.fill(src, 6) {
                    return Ok(Flow::NeedInput);
                }
                let postfix = need!(self.reader, src, 2);
                let direct = need!(self.reader, src, 4) << postfix;
                self.ring.reconfigure(true, direct, postfix)?;
                trace!(postfix, direct, "distance parameters");
                self.state = State::ContextModes;
            }
            State::ContextModes => {
                while self.modes.len() < self.switches[LITERALS].ntypes {
                    let bits = need!(self.reader, src, 2);
                    self.modes.push(ContextMode::from_bits(bits));
                }
                self.state = State::TreeCount { cat: LITERALS };
            }
            State::TreeCount { cat } => {
                let Some(n) = read_varlen8(&mut self.reader, src) else {
                    return Ok(Flow::NeedInput);
                };
                let ctxts = if cat == LITERALS {
                    LITERAL_CONTEXTS
                } else {
                    DISTANCE_CONTEXTS
                };
                *self.map_mut(cat) = ContextMap::new(self.switches[cat].ntypes, ctxts)?;
                self.ntrees[cat] = n as usize + 1;
                self.state = if self.ntrees[cat] > 1 {
                    State::MapRle { cat }
                } else {
                    self.after_map(cat)
                };
            }
            State::MapRle { cat } => {
                if !self.reader.fill(src, 1) {
                    return Ok(Flow::NeedInput);
                }
                if self.reader.peek(1) == 0 {
                    self.reader.consume(1);
                    self.rle_max = 0;
                } else {
                    if !self.reader.fill(src, 5) {
                        return Ok(Flow::NeedInput);
                    }
                    self.rle_max = (self.reader.peek(5) >> 1) + 1;
                    self.reader.consume(5);
                }
                self.code.begin(self.ntrees[cat] + self.rle_max as usize);
                self.state = State::MapCode { cat };
            }
            State::MapCode { cat } => {
                let Some(code) = self.code.step(&mut self.reader, src)? else {
                    return Ok(Flow::NeedInput);
                };
                self.map_code = code;
                self.state = State::MapCells { cat, index: 0 };
            }
            State::MapCells { cat, mut index } => {
                let size = if cat == LITERALS {
                    self.literal_map.as_slice().len()
                } else {
                    self.distance_map.as_slice().len()
                };
                while index < size {
                    let symbol = symbol!(self.map_code, self.reader, src) as u32;
                    if symbol == 0 {
                        self.map_mut(cat).as_mut_slice()[index] = 0;
                        index += 1;
                        self.state = State::MapCells { cat, index };
                    } else if symbol <= self.rle_max {
                        self.state = State::MapRun { cat, index, symbol };
                        return Ok(Flow::Continue);
                    } else {
                        let tree = symbol - self.rle_max;
                        self.map_mut(cat).as_mut_slice()[index] = tree as u8;
                        index += 1;
                        self.state = State::MapCells { cat, index };
                    }
                }
                self.state = State::MapImtf { cat };
            }
            State::MapRun { cat, index, symbol } => {
                let extra = need!(self.reader, src, symbol);
                let run = (1usize << symbol) + extra as usize;
                let cells = self.map_mut(cat).as_mut_slice();
                if index + run > cells.len() {
                    return Err(Error::sanitize("context map run overruns map"));
                }
                cells[index..index + run].fill(0);
                self.state = State::MapCells {
                    cat,
                    index: index + run,
                };
            }
            State::MapImtf { cat } => {
                let imtf = need!(self.reader, src, 1) == 1;
                let trees = self.ntrees[cat];
                let map = self.map_mut(cat);
                if imtf {
                    map.revert_movetofront();
                }
                if map.tree_count() > trees {
                    return Err(Error::sanitize("context map references a missing tree"));
                }
                self.state = self.after_map(cat);
            }
            State::Trees { group, index } => {
                let Some(tree) = self.code.step(&mut self.reader, src)? else {
                    return Ok(Flow::NeedInput);
                };
                self.tree_group(group).push(tree);
                if index + 1 < self.group_size(group) {
                    self.code.begin(self.group_alphabet(group));
                    self.state = State::Trees {
                        group,
                        index: index + 1,
                    };
                } else if group < DISTANCES {
                    self.code.begin(self.group_alphabet(group + 1));
                    self.state = State::Trees {
                        group: group + 1,
                        index: 0,
                    };
                } else {
                    trace!(
                        literal_types = self.switches[LITERALS].ntypes,
                        command_types = self.switches[COMMANDS].ntypes,
                        distance_types = self.switches[DISTANCES].ntypes,
                        literal_trees = self.literal_trees.len(),
                        distance_trees = self.distance_trees.len(),
                        "metablock header"
                    );
                    self.state = State::Command;
                }
            }
            State::Command => {
                if self.switches[COMMANDS].due() {
                    self.state = State::SwitchType { cat: COMMANDS };
                    return Ok(Flow::Continue);
                }
                let switch = &self.switches[COMMANDS];
                let code = symbol!(self.command_trees[switch.current], self.reader, src) as u16;
                self.switches[COMMANDS].count_one();
                let row = *self
                    .table
                    .get(code as usize)
                    .map_err(|_| Error::sanitize("invalid insert-and-copy symbol"))?;
                self.state = if row.insert_bits == 0 && row.copy_bits == 0 {
                    self.start_command(code, 0, 0)?
                } else {
                    State::CommandExtra { code }
                };
            }
            State::CommandExtra { code } => {
                let row = *self.table.get(code as usize)?;
                let (ibits, cbits) = (row.insert_bits as u32, row.copy_bits as u32);
                if !self.reader.fill(src, ibits + cbits) {
                    return Ok(Flow::NeedInput);
                }
                let insert_extra = need!(self.reader, src, ibits);
                let copy_extra = need!(self.reader, src, cbits);
                self.state = self.start_command(code, insert_extra, copy_extra)?;
            }
            State::Literal => {
                while self.insert_remaining > 0 {
                    if self.switches[LITERALS].due() {
                        self.state = State::SwitchType { cat: LITERALS };
                        return Ok(Flow::Continue);
                    }
                    if sink.space() == 0 {
                        return Ok(Flow::NeedOutput);
                    }
                    let btype = self.switches[LITERALS].current;
                    let context = literal_context(self.modes[btype], self.p1, self.p2);
                    let tree = self.literal_map.get(btype, context as usize) as usize;
                    let byte = symbol!(self.literal_trees[tree], self.reader, src) as u8;
                    self.switches[LITERALS].count_one();
                    self.emit(sink, byte)?;
                    self.insert_remaining -= 1;
                }
                self.state = self.after_insert()?;
            }
            State::Distance => {
                if self.switches[DISTANCES].due() {
                    self.state = State::SwitchType { cat: DISTANCES };
                    return Ok(Flow::Continue);
                }
                let btype = self.switches[DISTANCES].current;
                let context = distance_context(self.copy_len)?;
                let tree = self.distance_map.get(btype, context as usize) as usize;
                let dcode = symbol!(self.distance_trees[tree], self.reader, src) as u32;
                self.switches[DISTANCES].count_one();
                self.state = if self.ring.bit_count(dcode) == 0 {
                    self.resolve_distance(dcode, 0)?
                } else {
                    State::DistanceExtra { dcode }
                };
            }
            State::DistanceExtra { dcode } => {
                let extra = need!(self.reader, src, self.ring.bit_count(dcode));
                self.state = self.resolve_distance(dcode, extra)?;
            }
            State::Copy => {
                while self.copy_len > 0 {
                    if sink.space() == 0 {
                        return Ok(Flow::NeedOutput);
                    }
                    let byte = self.window.peek(self.distance as usize - 1)?;
                    self.emit(sink, byte)?;
                    self.copy_len -= 1;
                }
                self.state = self.after_command();
            }
            State::DictWord { mut pos } => {
                while pos < self.word.len() {
                    if sink.space() == 0 {
                        self.state = State::DictWord { pos };
                        return Ok(Flow::NeedOutput);
                    }
                    let byte = self.word[pos];
                    self.emit(sink, byte)?;
                    pos += 1;
                }
                self.state = self.after_command();
            }
            State::SwitchType { cat } => {
                let symbol = symbol!(self.switches[cat].types, self.reader, src);
                let switch = &mut self.switches[cat];
                switch.switch_to(symbol);
                trace!(cat, btype = switch.current, "block switch");
                self.state = State::CountSymbol { cat, header: false };
            }
            State::Trailer => {
                self.align_zero()?;
                debug!(
                    total_out = self.total_out + sink.written as u64,
                    metadata = self.metadata.len(),
                    "brotli stream complete"
                );
                self.state = State::Done;
                return Ok(Flow::Done);
            }
            State::Done => return Ok(Flow::Done),
        }
        Ok(Flow::Continue)
    }
}

impl StreamingDecompressor for BrotliDecoder {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Brotli
    }

    fn decompress_chunk(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        self.decode(input, output)
    }

    fn is_finished(&self) -> bool {
        self.is_done()
    }

    fn reset(&mut self) {
        BrotliDecoder::reset(self);
    }
}
