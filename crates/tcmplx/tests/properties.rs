//! Property-based tests for the codec building blocks and both formats.
//!
//! - Round-trip through either format, under any chunking of input and output
//! - Canonical code assignment and the Kraft sum of generated lengths
//! - Distance ring encode/decode are inverses
//! - Hash-chain lookups land on real occurrences
//! - Context map move-to-front is reversible
//! - Brotli metadata survives alongside an empty payload

use proptest::prelude::*;

use tcmplx::brotli::{
    brotli_compress_with_metadata, brotli_decompress_with_metadata, ContextMap,
};
use tcmplx::lz::hashchain::HASH_WIDTH;
use tcmplx::lz::HashChain;
use tcmplx::prefix::{PrefixList, RingDist};
use tcmplx::{stream_decoder, stream_encoder, Algorithm, EncoderOptions, Flush, Status};

/// Bytes with enough repetition for matches to show up.
fn compressible_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            prop::collection::vec(any::<u8>(), 1..16),
            prop::collection::vec(prop::sample::select(b"abc ".to_vec()), 1..64),
        ],
        0..40,
    )
    .prop_map(|pieces| pieces.concat())
}

fn algorithm_strategy() -> impl Strategy<Value = Algorithm> {
    prop_oneof![Just(Algorithm::Zlib), Just(Algorithm::Brotli)]
}

fn options_strategy() -> impl Strategy<Value = EncoderOptions> {
    (
        prop_oneof![Just(64usize), Just(1000), Just(4096)],
        prop_oneof![Just(1024usize), Just(32768)],
        1usize..32,
    )
        .prop_map(|(block, window, chain)| EncoderOptions::new(block, window, chain).unwrap())
}

/// Run a stream through chunks of `step_in` input and `step_out` output.
fn encode_chunked(
    algorithm: Algorithm,
    options: EncoderOptions,
    data: &[u8],
    step_in: usize,
    step_out: usize,
) -> Vec<u8> {
    let mut enc = stream_encoder(algorithm, options).unwrap();
    let mut out = Vec::new();
    let mut buf = vec![0u8; step_out];
    let mut pos = 0;
    loop {
        let end = (pos + step_in).min(data.len());
        let flush = if end == data.len() { Flush::Finish } else { Flush::None };
        let p = enc.compress_chunk(&data[pos..end], &mut buf, flush).unwrap();
        pos += p.consumed;
        out.extend_from_slice(&buf[..p.written]);
        if p.status == Status::Eof {
            return out;
        }
    }
}

fn decode_chunked(algorithm: Algorithm, stream: &[u8], step_in: usize, step_out: usize) -> Vec<u8> {
    let mut dec = stream_decoder(algorithm).unwrap();
    let mut out = Vec::new();
    let mut buf = vec![0u8; step_out];
    let mut pos = 0;
    loop {
        let end = (pos + step_in).min(stream.len());
        let p = dec.decompress_chunk(&stream[pos..end], &mut buf).unwrap();
        pos += p.consumed;
        out.extend_from_slice(&buf[..p.written]);
        match p.status {
            Status::Eof => return out,
            Status::Success if pos == stream.len() => panic!("stream ended early"),
            _ => {}
        }
    }
}

/// Sum of 2^(15 - len) over used lines.
fn kraft(list: &PrefixList) -> u32 {
    list.lines()
        .iter()
        .filter(|l| l.len > 0)
        .map(|l| 1u32 << (15 - l.len))
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    /// Property: decode(encode(x)) == x for both formats and any chunking.
    #[test]
    fn prop_roundtrip(
        algorithm in algorithm_strategy(),
        options in options_strategy(),
        data in compressible_strategy(),
        step_in in 1usize..700,
        step_out in 1usize..300,
    ) {
        let stream = encode_chunked(algorithm, options, &data, step_in, step_out);
        let out = decode_chunked(algorithm, &stream, step_out, step_in);
        prop_assert_eq!(out, data);
    }

    /// Property: generated lengths are complete and within the limit, and
    /// the assigned codes are canonical.
    #[test]
    fn prop_gen_lengths_and_canonical_codes(
        freqs in prop::collection::vec(0u32..1000, 2..256),
        max_bits in 9u16..=15,
    ) {
        let mut list = PrefixList::new(freqs.len()).unwrap();
        list.gen_lengths(&freqs, max_bits).unwrap();
        list.gen_codes().unwrap();
        let used = freqs.iter().filter(|&&f| f > 0).count();
        prop_assert!(list.max_len() <= max_bits);
        for (line, &f) in list.lines().iter().zip(&freqs) {
            prop_assert_eq!(line.len > 0, f > 0);
            prop_assert_eq!(u32::from(line.code) >> line.len, 0);
        }
        match used {
            0 => prop_assert_eq!(kraft(&list), 0),
            1 => prop_assert_eq!(list.max_len(), 1),
            _ => prop_assert_eq!(kraft(&list), 1 << 15),
        }

        // Canonical: ordering by (len, value) gives consecutive codes that
        // shift left when the length grows.
        let mut lines: Vec<_> = list.lines().iter().filter(|l| l.len > 0).copied().collect();
        lines.sort_by_key(|l| (l.len, l.value));
        for pair in lines.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert_eq!((a.code as u32 + 1) << (b.len - a.len), b.code as u32);
        }
        if let Some(first) = lines.first() {
            prop_assert_eq!(first.code, 0);
        }
    }

    /// Property: a distance decodes back from its code and leaves the ring
    /// in the same state on both sides.
    #[test]
    fn prop_ringdist_inverse(
        special in any::<bool>(),
        direct in 0u32..=15,
        postfix in 0u32..=3,
        distances in prop::collection::vec(1u32..(1 << 24), 1..40),
    ) {
        let mut enc = RingDist::new(special, direct << postfix, postfix).unwrap();
        let mut dec = enc.clone();
        for d in distances {
            let (dcode, extra) = enc.encode(d).unwrap();
            prop_assert!(dcode < enc.alphabet_size(24));
            prop_assert!(extra < (1u32 << enc.bit_count(dcode)) || enc.bit_count(dcode) == 0);
            prop_assert_eq!(dec.decode(dcode, extra).unwrap(), d);
            prop_assert_eq!(&enc, &dec);
        }
    }

    /// Property: a planted three-byte needle is found, and every hit is a
    /// real occurrence no farther back than the plant.
    #[test]
    fn prop_hashchain_finds_planted(
        mut buf in prop::collection::vec(any::<u8>(), 8..200),
        needle in any::<[u8; HASH_WIDTH]>(),
        at in any::<prop::sample::Index>(),
    ) {
        let p = at.index(buf.len() - HASH_WIDTH + 1);
        buf[p..p + HASH_WIDTH].copy_from_slice(&needle);
        let mut chain = HashChain::new(buf.len(), 256).unwrap();
        for &b in &buf {
            chain.add(b).unwrap();
        }
        let planted = buf.len() - p;
        let d = chain.find(&needle, HASH_WIDTH);
        prop_assert!(d.is_some());
        let d = d.unwrap();
        prop_assert!(d <= planted);
        for (k, &b) in needle.iter().enumerate() {
            prop_assert_eq!(chain.peek(d - 1 - k).unwrap(), b);
        }
    }

    /// Property: move-to-front then its inverse restores the map.
    #[test]
    fn prop_movetofront_inverse(
        cells in prop::collection::vec(0u8..16, 1..256),
    ) {
        let mut map = ContextMap::new(cells.len(), 1).unwrap();
        map.as_mut_slice().copy_from_slice(&cells);
        map.apply_movetofront();
        map.revert_movetofront();
        prop_assert_eq!(map.as_slice(), &cells[..]);
    }

    /// Property: metadata around an empty payload comes back byte for byte.
    #[test]
    fn prop_metadata_with_empty_payload(
        meta in prop::collection::vec(any::<u8>(), 1..=16),
    ) {
        let stream =
            brotli_compress_with_metadata(&[], &[&meta[..]], EncoderOptions::default()).unwrap();
        let (data, metadata) = brotli_decompress_with_metadata(&stream).unwrap();
        prop_assert!(data.is_empty());
        prop_assert_eq!(metadata, vec![meta]);
    }
}
