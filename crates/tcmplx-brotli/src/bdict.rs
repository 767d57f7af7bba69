//! Built-in dictionary access and word transforms (RFC 7932 appendices A
//! and B).
//!
//! Word data comes from `brotli-decompressor`; the transform table is kept
//! here as constant data.

use brotli_decompressor::dictionary::{
    kBrotliDictionary, kBrotliDictionaryOffsetsByLength, kBrotliDictionarySizeBitsByLength,
};
use tcmplx_core::{Error, Result};

/// Shortest dictionary word.
pub const MIN_WORD_LEN: usize = 4;

/// Longest dictionary word.
pub const MAX_WORD_LEN: usize = 24;

/// Number of word transforms.
pub const TRANSFORM_COUNT: usize = 121;

/// Longest transformed word: a maximal word plus the longest prefix and
/// suffix.
pub const MAX_TRANSFORMED_LEN: usize = MAX_WORD_LEN + 5 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Identity,
    OmitFirst(u8),
    OmitLast(u8),
    UppercaseFirst,
    UppercaseAll,
}

use Op::*;

#[rustfmt::skip]
static TRANSFORMS: [(&[u8], Op, &[u8]); TRANSFORM_COUNT] = [
    (b"", Identity, b""),
    (b"", Identity, b" "),
    (b" ", Identity, b" "),
    (b"", OmitFirst(1), b""),
    (b"", UppercaseFirst, b" "),
    (b"", Identity, b" the "),
    (b" ", Identity, b""),
    (b"s ", Identity, b" "),
    (b"", Identity, b" of "),
    (b"", UppercaseFirst, b""),
    (b"", Identity, b" and "),
    (b"", OmitFirst(2), b""),
    (b"", OmitLast(1), b""),
    (b", ", Identity, b" "),
    (b"", Identity, b", "),
    (b" ", UppercaseFirst, b" "),
    (b"", Identity, b" in "),
    (b"", Identity, b" to "),
    (b"e ", Identity, b" "),
    (b"", Identity, b"\""),
    (b"", Identity, b"."),
    (b"", Identity, b"\">"),
    (b"", Identity, b"\n"),
    (b"", OmitLast(3), b""),
    (b"", Identity, b"]"),
    (b"", Identity, b" for "),
    (b"", OmitFirst(3), b""),
    (b"", OmitLast(2), b""),
    (b"", Identity, b" a "),
    (b"", Identity, b" that "),
    (b" ", UppercaseFirst, b""),
    (b"", Identity, b". "),
    (b".", Identity, b""),
    (b" ", Identity, b", "),
    (b"", OmitFirst(4), b""),
    (b"", Identity, b" with "),
    (b"", Identity, b"'"),
    (b"", Identity, b" from "),
    (b"", Identity, b" by "),
    (b"", OmitFirst(5), b""),
    (b"", OmitFirst(6), b""),
    (b" the ", Identity, b""),
    (b"", OmitLast(4), b""),
    (b"", Identity, b". The "),
    (b"", UppercaseAll, b""),
    (b"", Identity, b" on "),
    (b"", Identity, b" as "),
    (b"", Identity, b" is "),
    (b"", OmitLast(7), b""),
    (b"", OmitLast(1), b"ing "),
    (b"", Identity, b"\n\t"),
    (b"", Identity, b":"),
    (b" ", Identity, b". "),
    (b"", Identity, b"ed "),
    (b"", OmitFirst(9), b""),
    (b"", OmitFirst(7), b""),
    (b"", OmitLast(6), b""),
    (b"", Identity, b"("),
    (b"", UppercaseFirst, b", "),
    (b"", OmitLast(8), b""),
    (b"", Identity, b" at "),
    (b"", Identity, b"ly "),
    (b" the ", Identity, b" of "),
    (b"", OmitLast(5), b""),
    (b"", OmitLast(9), b""),
    (b" ", UppercaseFirst, b", "),
    (b"", UppercaseFirst, b"\""),
    (b".", Identity, b"("),
    (b"", UppercaseAll, b" "),
    (b"", UppercaseFirst, b"\">"),
    (b"", Identity, b"=\""),
    (b" ", Identity, b"."),
    (b".com/", Identity, b""),
    (b" the ", Identity, b" of the "),
    (b"", UppercaseFirst, b"'"),
    (b"", Identity, b". This "),
    (b"", Identity, b","),
    (b".", Identity, b" "),
    (b"", UppercaseFirst, b"("),
    (b"", UppercaseFirst, b"."),
    (b"", Identity, b" not "),
    (b" ", Identity, b"=\""),
    (b"", Identity, b"er "),
    (b" ", UppercaseAll, b" "),
    (b"", Identity, b"al "),
    (b" ", UppercaseAll, b""),
    (b"", Identity, b"='"),
    (b"", UppercaseAll, b"\""),
    (b"", UppercaseFirst, b". "),
    (b" ", Identity, b"("),
    (b"", Identity, b"ful "),
    (b" ", UppercaseFirst, b". "),
    (b"", Identity, b"ive "),
    (b"", Identity, b"less "),
    (b"", UppercaseAll, b"'"),
    (b"", Identity, b"est "),
    (b" ", UppercaseFirst, b"."),
    (b"", UppercaseAll, b"\">"),
    (b" ", Identity, b"='"),
    (b"", UppercaseFirst, b","),
    (b"", Identity, b"ize "),
    (b"", UppercaseAll, b"."),
    (b"\xc2\xa0", Identity, b""),
    (b" ", Identity, b","),
    (b"", UppercaseFirst, b"=\""),
    (b"", UppercaseAll, b"=\""),
    (b"", Identity, b"ous "),
    (b"", UppercaseAll, b", "),
    (b"", UppercaseFirst, b"='"),
    (b" ", UppercaseFirst, b","),
    (b" ", UppercaseAll, b"=\""),
    (b" ", UppercaseAll, b", "),
    (b"", UppercaseAll, b","),
    (b"", UppercaseAll, b"("),
    (b"", UppercaseAll, b". "),
    (b" ", UppercaseAll, b"."),
    (b"", UppercaseAll, b"='"),
    (b" ", UppercaseAll, b". "),
    (b" ", UppercaseFirst, b"=\""),
    (b" ", UppercaseAll, b"='"),
    (b" ", UppercaseFirst, b"='"),
];

/// Index bits for words of `len` bytes; 0 outside the dictionary's range.
pub fn size_bits(len: usize) -> u32 {
    if !(MIN_WORD_LEN..=MAX_WORD_LEN).contains(&len) {
        return 0;
    }
    kBrotliDictionarySizeBitsByLength[len] as u32
}

/// Number of words of `len` bytes.
pub fn word_count(len: usize) -> usize {
    match size_bits(len) {
        0 => 0,
        bits => 1 << bits,
    }
}

/// Word `index` among the words of `len` bytes.
pub fn get_word(len: usize, index: usize) -> Result<&'static [u8]> {
    let count = word_count(len);
    if index >= count {
        return Err(Error::out_of_range(index, count));
    }
    let start = kBrotliDictionaryOffsetsByLength[len] as usize + index * len;
    Ok(&kBrotliDictionary[start..start + len])
}

/// Append `word` under transform `id` to `out`, returning the bytes added.
pub fn transform(word: &[u8], id: usize, out: &mut Vec<u8>) -> Result<usize> {
    let &(prefix, op, suffix) = TRANSFORMS
        .get(id)
        .ok_or_else(|| Error::param(format!("transform {} out of range", id)))?;
    let start = out.len();
    out.extend_from_slice(prefix);
    let body = out.len();
    match op {
        Identity | UppercaseFirst | UppercaseAll => out.extend_from_slice(word),
        OmitFirst(n) => out.extend_from_slice(word.get(n as usize..).unwrap_or(&[])),
        OmitLast(n) => {
            out.extend_from_slice(&word[..word.len().saturating_sub(n as usize)])
        }
    }
    match op {
        UppercaseFirst => {
            to_upper(&mut out[body..]);
        }
        UppercaseAll => {
            let mut i = body;
            while i < out.len() {
                i += to_upper(&mut out[i..]);
            }
        }
        _ => {}
    }
    out.extend_from_slice(suffix);
    Ok(out.len() - start)
}

/// Resolve a dictionary reference of `len` bytes and `word_id`, appending
/// the transformed word to `out`.
pub fn lookup(len: usize, word_id: usize, out: &mut Vec<u8>) -> Result<usize> {
    let bits = size_bits(len);
    if bits == 0 {
        return Err(Error::sanitize(format!(
            "no dictionary words of length {}",
            len
        )));
    }
    let index = word_id & ((1 << bits) - 1);
    let id = word_id >> bits;
    if id >= TRANSFORM_COUNT {
        return Err(Error::sanitize(format!("dictionary transform {} out of range", id)));
    }
    transform(get_word(len, index)?, id, out)
}

/// Uppercase the character at the start of `p` in the dictionary's loose
/// UTF-8 sense, returning its byte width.
fn to_upper(p: &mut [u8]) -> usize {
    let Some(&first) = p.first() else {
        return 1;
    };
    if first < 0xC0 {
        if first.is_ascii_lowercase() {
            p[0] ^= 32;
        }
        return 1;
    }
    if first < 0xE0 {
        if let Some(b) = p.get_mut(1) {
            *b ^= 32;
        }
        return 2;
    }
    if let Some(b) = p.get_mut(2) {
        *b ^= 5;
    }
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_counts() {
        assert_eq!(word_count(3), 0);
        assert_eq!(word_count(25), 0);
        assert_eq!(word_count(4), 1024);
        assert_eq!(word_count(24), 32);
        let total: usize = (MIN_WORD_LEN..=MAX_WORD_LEN)
            .map(|len| word_count(len) * len)
            .sum();
        assert_eq!(total, kBrotliDictionary.len());
    }

    #[test]
    fn test_first_words() {
        assert_eq!(get_word(4, 0).unwrap(), b"time");
        assert!(get_word(4, 1024).is_err());
        assert!(get_word(2, 0).is_err());
    }

    #[test]
    fn test_transforms() {
        let mut out = Vec::new();
        transform(b"time", 0, &mut out).unwrap();
        assert_eq!(out, b"time");

        out.clear();
        assert_eq!(transform(b"time", 9, &mut out).unwrap(), 4);
        assert_eq!(out, b"Time");

        out.clear();
        transform(b"time", 44, &mut out).unwrap();
        assert_eq!(out, b"TIME");

        out.clear();
        transform(b"time", 49, &mut out).unwrap();
        assert_eq!(out, b"timing ");

        out.clear();
        transform(b"time", 73, &mut out).unwrap();
        assert_eq!(out, b" the time of the ");

        out.clear();
        transform(b"time", 54, &mut out).unwrap();
        assert!(out.is_empty());

        assert!(matches!(
            transform(b"time", TRANSFORM_COUNT, &mut out),
            Err(Error::Param(_))
        ));
    }

    #[test]
    fn test_uppercase_multibyte() {
        let mut out = Vec::new();
        transform("\u{e9}t\u{e9}".as_bytes(), 44, &mut out).unwrap();
        assert_eq!(out, "\u{c9}T\u{c9}".as_bytes());
    }

    #[test]
    fn test_lookup_splits_word_id() {
        let mut out = Vec::new();
        lookup(4, 9 << 10, &mut out).unwrap();
        assert_eq!(out, b"Time");
        assert!(lookup(4, TRANSFORM_COUNT << 10, &mut out).is_err());
        assert!(lookup(30, 0, &mut out).is_err());
    }

    #[test]
    fn test_transform_length_bound() {
        let longest = TRANSFORMS
            .iter()
            .map(|(p, _, s)| p.len() + s.len())
            .max()
            .unwrap();
        assert!(MAX_WORD_LEN + longest <= MAX_TRANSFORMED_LEN);
    }
}
