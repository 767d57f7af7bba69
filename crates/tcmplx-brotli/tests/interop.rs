//! Interoperability with the Rust port of the reference Brotli library.

use std::io::{Read, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tcmplx_brotli::{
    brotli_compress, brotli_compress_with_metadata, brotli_decompress, BrotliDecoder,
};
use tcmplx_core::{EncoderOptions, Status};

fn reference_compress(data: &[u8], quality: u32, lgwin: u32) -> Vec<u8> {
    let mut c = brotli::CompressorWriter::new(Vec::new(), 4096, quality, lgwin);
    c.write_all(data).unwrap();
    c.into_inner()
}

fn reference_decompress(stream: &[u8]) -> Vec<u8> {
    let mut d = brotli::Decompressor::new(stream, 4096);
    let mut out = Vec::new();
    d.read_to_end(&mut out).unwrap();
    out
}

fn sample_text(len: usize, seed: u64) -> Vec<u8> {
    let words: [&[u8]; 10] = [
        b"the ", b"metablock ", b"context ", b"Dictionary ", b"window ", b"of ",
        b"prefix ", b"\xc3\xa9t\xc3\xa9 ", b"time ", b"\n",
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len + 16);
    while out.len() < len {
        out.extend_from_slice(words[rng.gen_range(0..words.len())]);
    }
    out.truncate(len);
    out
}

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

#[test]
fn decodes_short_utf8_text_at_high_quality() {
    let text = "L'\u{e9}t\u{e9} fut long; en \u{e9}t\u{e9} la rivi\u{e8}re \u{e9}tait basse, \
                et l'\u{e9}t\u{e9} d'apr\u{e8}s aussi. \u{c7}a d\u{e9}pend de l'ann\u{e9}e."
        .as_bytes();
    for quality in [9, 10, 11] {
        let stream = reference_compress(text, quality, 22);
        assert_eq!(brotli_decompress(&stream).unwrap(), text, "quality {}", quality);
    }
}

#[test]
fn decodes_reference_streams_at_every_quality() {
    let text = sample_text(120_000, 1);
    let mut mixed = sample_text(30_000, 2);
    mixed.extend_from_slice(&random_bytes(10_000, 3));
    mixed.extend_from_slice(&sample_text(30_000, 4));
    // Low qualities use few features; high ones bring block switches,
    // context maps and dictionary references.
    for quality in [0, 1, 2, 5, 9, 11] {
        for data in [&text, &mixed] {
            let stream = reference_compress(data, quality, 22);
            assert_eq!(
                &brotli_decompress(&stream).unwrap(),
                data,
                "quality {}",
                quality
            );
        }
    }
}

#[test]
fn decodes_small_window_and_tiny_inputs() {
    for data in [&b""[..], b"a", b"time", b"The time is now"] {
        for lgwin in [10, 16, 24] {
            let stream = reference_compress(data, 11, lgwin);
            assert_eq!(brotli_decompress(&stream).unwrap(), data);
        }
    }
}

#[test]
fn reference_decodes_our_streams() {
    let text = sample_text(70_000, 5);
    let noise = random_bytes(20_000, 6);
    for options in [
        EncoderOptions::default(),
        EncoderOptions::new(1 << 16, (1 << 22) - 16, 64).unwrap(),
        EncoderOptions::new(100, 1008, 1).unwrap(),
    ] {
        for data in [&text[..], &noise[..], &b""[..], &b"x"[..]] {
            let stream = brotli_compress(data, options).unwrap();
            assert_eq!(reference_decompress(&stream), data);
        }
    }
}

#[test]
fn reference_skips_our_metadata() {
    let data = sample_text(5_000, 7);
    let stream = brotli_compress_with_metadata(
        &data,
        &[&b"header"[..], &[0xAB; 700][..]],
        EncoderOptions::default(),
    )
    .unwrap();
    assert_eq!(reference_decompress(&stream), data);
}

#[test]
fn byte_at_a_time_output_matches_bulk_decode() {
    let data = sample_text(20_000, 8);
    let stream = reference_compress(&data, 11, 18);

    let mut decoder = BrotliDecoder::new().unwrap();
    let mut pos = 0;
    let mut out = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        let p = decoder.decode(&stream[pos..], &mut byte).unwrap();
        pos += p.consumed;
        out.extend_from_slice(&byte[..p.written]);
        match p.status {
            Status::Eof => break,
            Status::Partial => {}
            Status::Success => panic!("stream ended early"),
        }
    }
    assert_eq!(pos, stream.len());
    assert_eq!(out, data);
}

#[test]
fn byte_at_a_time_input_matches_bulk_decode() {
    let data = sample_text(5_000, 9);
    let stream = reference_compress(&data, 9, 20);
    let mut decoder = BrotliDecoder::new().unwrap();
    let mut out = vec![0u8; data.len()];
    let mut written = 0;
    for (i, b) in stream.iter().enumerate() {
        let p = decoder
            .decode(std::slice::from_ref(b), &mut out[written..])
            .unwrap();
        written += p.written;
        assert_eq!(p.status == Status::Eof, i == stream.len() - 1);
    }
    assert_eq!(out, data);
    assert_eq!(decoder.total_in(), stream.len() as u64);
}
