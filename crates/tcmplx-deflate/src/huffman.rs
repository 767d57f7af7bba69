//! DEFLATE code tables and code-length run-length coding.

use tcmplx_core::Result;
use tcmplx_prefix::PrefixList;

/// Order in which code length code lengths are sent.
pub const CL_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Literal/length symbols a dynamic block may define.
pub const LITERAL_CODES: usize = 286;

/// Distance symbols a dynamic block may define.
pub const DISTANCE_CODES: usize = 30;

/// Code length alphabet size.
pub const CODE_LENGTH_CODES: usize = 19;

/// End-of-block symbol.
pub const END_OF_BLOCK: u64 = 256;

/// Longest literal/length or distance code.
pub const MAX_BITS: u16 = 15;

/// Longest code length code.
pub const MAX_CL_BITS: u16 = 7;

/// Longest match one length symbol can carry.
pub const MAX_MATCH: usize = 258;

/// Code lengths of the fixed literal/length code (RFC 1951 3.2.6).
pub fn fixed_literal_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

/// Fixed literal/length code, sorted for decoding.
pub fn fixed_literals() -> Result<PrefixList> {
    PrefixList::from_lengths(&fixed_literal_lengths())
}

/// Fixed distance code, sorted for decoding.
pub fn fixed_distances() -> Result<PrefixList> {
    PrefixList::from_lengths(&[5u8; 32])
}

/// Extra bits and base repeat count of a code length symbol.
#[inline]
pub fn repeat_bits(symbol: u8) -> (u32, usize) {
    match symbol {
        16 => (2, 3),
        17 => (3, 3),
        18 => (7, 11),
        _ => (0, 0),
    }
}

/// One code length alphabet symbol and its extra bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClToken {
    pub symbol: u8,
    pub extra: u8,
}

impl ClToken {
    fn new(symbol: u8, extra: usize) -> Self {
        ClToken {
            symbol,
            extra: extra as u8,
        }
    }
}

/// Run-length code a sequence of code lengths with symbols 16, 17 and 18.
pub fn rle_lengths(lengths: &[u8]) -> Vec<ClToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < lengths.len() {
        let cur = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == cur).count();
        let mut left = run;
        if cur == 0 {
            while left >= 11 {
                let take = left.min(138);
                tokens.push(ClToken::new(18, take - 11));
                left -= take;
            }
            if left >= 3 {
                tokens.push(ClToken::new(17, left - 3));
                left = 0;
            }
        } else {
            tokens.push(ClToken::new(cur, 0));
            left -= 1;
            while left >= 3 {
                let take = left.min(6);
                tokens.push(ClToken::new(16, take - 3));
                left -= take;
            }
        }
        tokens.extend(std::iter::repeat(ClToken::new(cur, 0)).take(left));
        i += run;
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(tokens: &[ClToken]) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        for t in tokens {
            let (_, base) = repeat_bits(t.symbol);
            match t.symbol {
                16 => {
                    let prev = *out.last().unwrap();
                    out.extend(std::iter::repeat(prev).take(base + t.extra as usize));
                }
                17 | 18 => out.extend(std::iter::repeat(0).take(base + t.extra as usize)),
                l => out.push(l),
            }
        }
        out
    }

    #[test]
    fn test_fixed_tables_complete() {
        let lit = fixed_literals().unwrap();
        assert_eq!(lit.len(), 288);
        assert_eq!(lit.max_len(), 9);
        let dist = fixed_distances().unwrap();
        assert_eq!(dist.max_len(), 5);
    }

    #[test]
    fn test_rle_runs() {
        let mut lengths = vec![8u8; 10];
        lengths.extend([0u8; 150]);
        lengths.extend([5, 5, 0, 0, 7]);
        let tokens = rle_lengths(&lengths);
        assert_eq!(tokens[0], ClToken::new(8, 0));
        assert_eq!(tokens[1], ClToken::new(16, 3));
        assert_eq!(expand(&tokens), lengths);
        assert!(tokens.iter().any(|t| t.symbol == 18 && t.extra == 127));
    }

    #[test]
    fn test_rle_short_runs_stay_literal() {
        let lengths = [3u8, 3, 0, 0, 4];
        let tokens = rle_lengths(&lengths);
        assert_eq!(tokens.len(), 5);
        assert_eq!(expand(&tokens), lengths);
    }
}
