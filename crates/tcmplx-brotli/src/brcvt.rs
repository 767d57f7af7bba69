//! Brotli stream conversion state and one-shot helpers.

use tcmplx_core::{EncoderOptions, Error, Flush, Progress, Result, Status};

use crate::decode::BrotliDecoder;
use crate::encode::BrotliEncoder;

/// Scratch buffer size for the one-shot drivers.
const CHUNK: usize = 16 * 1024;

/// A Brotli conversion in one direction.
#[derive(Debug, Clone)]
pub enum BrCvt {
    /// Decompressing.
    Decode(BrotliDecoder),
    /// Compressing.
    Encode(BrotliEncoder),
}

impl BrCvt {
    /// Start decoding a Brotli stream.
    pub fn decoder() -> Result<Self> {
        Ok(BrCvt::Decode(BrotliDecoder::new()?))
    }

    /// Start encoding a Brotli stream.
    pub fn encoder(options: EncoderOptions) -> Result<Self> {
        Ok(BrCvt::Encode(BrotliEncoder::new(options)?))
    }

    /// Decode a chunk; an error on an encoder.
    pub fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        match self {
            BrCvt::Decode(d) => d.decode(input, output),
            BrCvt::Encode(_) => Err(Error::param("decode called on a brotli encoder")),
        }
    }

    /// Encode a chunk; an error on a decoder.
    pub fn encode(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Progress> {
        match self {
            BrCvt::Encode(e) => e.encode(input, output, flush),
            BrCvt::Decode(_) => Err(Error::param("encode called on a brotli decoder")),
        }
    }

    /// Queue a metadata block on an encoder.
    pub fn add_metadata(&mut self, data: &[u8]) -> Result<()> {
        match self {
            BrCvt::Encode(e) => e.add_metadata(data),
            BrCvt::Decode(_) => Err(Error::param("metadata is added when encoding")),
        }
    }

    /// Metadata blocks a decoder has seen; empty for an encoder.
    pub fn metadata(&self) -> &[Vec<u8>] {
        match self {
            BrCvt::Decode(d) => d.metadata(),
            BrCvt::Encode(_) => &[],
        }
    }

    /// Take the metadata blocks a decoder has seen.
    pub fn take_metadata(&mut self) -> Vec<Vec<u8>> {
        match self {
            BrCvt::Decode(d) => d.take_metadata(),
            BrCvt::Encode(_) => Vec::new(),
        }
    }

    /// Check for end of stream.
    pub fn is_done(&self) -> bool {
        match self {
            BrCvt::Decode(d) => d.is_done(),
            BrCvt::Encode(e) => e.is_done(),
        }
    }

    /// Start over in the same direction.
    pub fn reset(&mut self) {
        match self {
            BrCvt::Decode(d) => d.reset(),
            BrCvt::Encode(e) => e.reset(),
        }
    }
}

/// Compress `input` into a complete Brotli stream.
pub fn brotli_compress(input: &[u8], options: EncoderOptions) -> Result<Vec<u8>> {
    brotli_compress_with_metadata(input, &[], options)
}

/// Compress `input`, placing each `metadata` block ahead of the data.
pub fn brotli_compress_with_metadata(
    input: &[u8],
    metadata: &[&[u8]],
    options: EncoderOptions,
) -> Result<Vec<u8>> {
    let mut encoder = BrotliEncoder::new(options)?;
    for block in metadata {
        encoder.add_metadata(block)?;
    }
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

/// Decompress a complete Brotli stream.
pub fn brotli_decompress(input: &[u8]) -> Result<Vec<u8>> {
    brotli_decompress_with_metadata(input).map(|(data, _)| data)
}

/// Decompress a complete Brotli stream, returning its metadata blocks too.
pub fn brotli_decompress_with_metadata(input: &[u8]) -> Result<(Vec<u8>, Vec<Vec<u8>>)> {
    let mut decoder = BrotliDecoder::new()?;
    let mut output = Vec::with_capacity(input.len() * 2);
    let mut buf = vec![0u8; CHUNK];
    let mut pos = 0;
    loop {
        let p = decoder.decode(&input[pos..], &mut buf)?;
        pos += p.consumed;
        output.extend_from_slice(&buf[..p.written]);
        match p.status {
            Status::Eof => return Ok((output, decoder.take_metadata())),
            Status::Partial => {}
            Status::Success => return Err(Error::unexpected_eof(input.len())),
        }
    }
}

/// Decompress a complete Brotli stream into `output`.
pub fn brotli_decompress_to(input: &[u8], output: &mut [u8]) -> Result<usize> {
    let mut decoder = BrotliDecoder::new()?;
    let p = decoder.decode(input, output)?;
    match p.status {
        Status::Eof => Ok(p.written),
        Status::Partial => Err(Error::buffer_too_small(output.len() + 1, output.len())),
        Status::Success => Err(Error::unexpected_eof(input.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_is_enforced() {
        let mut d = BrCvt::decoder().unwrap();
        assert!(matches!(
            d.encode(b"x", &mut [0u8; 8], Flush::None),
            Err(Error::Param(_))
        ));
        assert!(d.add_metadata(b"x").is_err());
        let mut e = BrCvt::encoder(EncoderOptions::default()).unwrap();
        assert!(e.decode(b"x", &mut [0u8; 8]).is_err());
        assert!(e.metadata().is_empty());
    }

    #[test]
    fn test_one_shot_roundtrip() {
        let data = b"one shot one shot one shot".repeat(100);
        let stream = brotli_compress(&data, EncoderOptions::default()).unwrap();
        assert_eq!(brotli_decompress(&stream).unwrap(), data);

        let mut exact = vec![0u8; data.len()];
        assert_eq!(brotli_decompress_to(&stream, &mut exact).unwrap(), data.len());
        assert_eq!(exact, data);

        let mut short = vec![0u8; data.len() - 1];
        assert!(matches!(
            brotli_decompress_to(&stream, &mut short),
            Err(Error::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_metadata_one_shot() {
        let stream = brotli_compress_with_metadata(
            b"payload",
            &[&b"tag"[..], b"", b"second tag"],
            EncoderOptions::default(),
        )
        .unwrap();
        let (data, metadata) = brotli_decompress_with_metadata(&stream).unwrap();
        assert_eq!(data, b"payload");
        assert_eq!(metadata, vec![b"tag".to_vec(), b"second tag".to_vec()]);
    }

    #[test]
    fn test_truncated_stream() {
        let data = b"truncate me please, truncate me please".repeat(4);
        let stream = brotli_compress(&data, EncoderOptions::default()).unwrap();
        assert!(matches!(
            brotli_decompress(&stream[..stream.len() - 2]),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_decoder_streams_metadata() {
        let stream =
            brotli_compress_with_metadata(b"x", &[&b"meta"[..]], EncoderOptions::default())
                .unwrap();
        let mut b = BrCvt::decoder().unwrap();
        let mut out = [0u8; 4];
        let p = b.decode(&stream, &mut out).unwrap();
        assert!(p.is_eof());
        assert_eq!(&out[..p.written], b"x");
        assert_eq!(b.metadata(), &[b"meta".to_vec()]);
        assert_eq!(b.take_metadata().len(), 1);
        b.reset();
        assert!(!b.is_done());
    }
}
