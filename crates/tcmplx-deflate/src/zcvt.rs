//! zlib stream conversion state and one-shot helpers.

use tcmplx_core::{EncoderOptions, Error, Flush, Progress, Result, Status};

use crate::deflate::Deflater;
use crate::inflate::Inflater;

/// Scratch buffer size for the one-shot drivers.
const CHUNK: usize = 16 * 1024;

/// A zlib conversion in one direction.
#[derive(Debug, Clone)]
pub enum ZCvt {
    /// Decompressing.
    Decode(Inflater),
    /// Compressing.
    Encode(Deflater),
}

impl ZCvt {
    /// Start decoding a zlib stream.
    pub fn decoder() -> Result<Self> {
        Ok(ZCvt::Decode(Inflater::new()?))
    }

    /// Start encoding a zlib stream.
    pub fn encoder(options: EncoderOptions) -> Result<Self> {
        Ok(ZCvt::Encode(Deflater::new(options)?))
    }

    /// Decode a chunk; an error on an encoder.
    pub fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        match self {
            ZCvt::Decode(d) => d.decode(input, output),
            ZCvt::Encode(_) => Err(Error::param("decode called on a zlib encoder")),
        }
    }

    /// Encode a chunk; an error on a decoder.
    pub fn encode(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Progress> {
        match self {
            ZCvt::Encode(e) => e.encode(input, output, flush),
            ZCvt::Decode(_) => Err(Error::param("encode called on a zlib decoder")),
        }
    }

    /// Supply a preset dictionary after [`Error::ZDictionary`].
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        match self {
            ZCvt::Decode(d) => d.set_dictionary(dictionary),
            ZCvt::Encode(_) => Err(Error::param("preset dictionaries are decode-only")),
        }
    }

    /// Check for end of stream.
    pub fn is_done(&self) -> bool {
        match self {
            ZCvt::Decode(d) => d.is_done(),
            ZCvt::Encode(e) => e.is_done(),
        }
    }

    /// Start over in the same direction.
    pub fn reset(&mut self) {
        match self {
            ZCvt::Decode(d) => d.reset(),
            ZCvt::Encode(e) => e.reset(),
        }
    }
}

/// Compress `input` into a complete zlib stream.
pub fn zlib_compress(input: &[u8], options: EncoderOptions) -> Result<Vec<u8>> {
    let mut encoder = Deflater::new(options)?;
    let mut output = Vec::with_capacity(input.len() / 2 + 64);
    let mut buf = vec![0u8; CHUNK];
    let mut pos = 0;
    loop {
        let p = encoder.encode(&input[pos..], &mut buf, Flush::Finish)?;
        pos += p.consumed;
        output.extend_from_slice(&buf[..p.written]);
        if p.status == Status::Eof {
            return Ok(output);
        }
    }
}

/// Decompress a complete zlib stream.
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = Inflater::new()?;
    let mut output = Vec::with_capacity(input.len() * 2);
    let mut buf = vec![0u8; CHUNK];
    let mut pos = 0;
    loop {
        let p = decoder.decode(&input[pos..], &mut buf)?;
        pos += p.consumed;
        output.extend_from_slice(&buf[..p.written]);
        match p.status {
            Status::Eof => return Ok(output),
            Status::Partial => {}
            Status::Success => return Err(Error::unexpected_eof(input.len())),
        }
    }
}

/// Decompress a complete zlib stream into `output`.
pub fn zlib_decompress_to(input: &[u8], output: &mut [u8]) -> Result<usize> {
    let mut decoder = Inflater::new()?;
    let p = decoder.decode(input, output)?;
    match p.status {
        Status::Eof => Ok(p.written),
        Status::Partial => Err(Error::buffer_too_small(output.len() + 1, output.len())),
        Status::Success => Err(Error::unexpected_eof(input.len())),
    }
}
