//! Context mode guessing and span subdivision.
//!
//! A [`ContextGuess`] scores how well each [`ContextMode`] would predict a
//! stretch of bytes (lower is better). [`subdivide`] cuts a buffer into up to
//! [`MAX_SPANS`] pieces, scores each, and merges neighbours whose preferred
//! modes agree or nearly agree.

use crate::ctxtmap::{signed_bucket, ContextMode};

/// Most spans [`subdivide`] returns.
pub const MAX_SPANS: usize = 16;

/// A run of input starting at `offset` best described by `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSpan {
    pub offset: usize,
    pub mode: ContextMode,
}

/// Running per-mode scores over a byte stream.
#[derive(Debug, Clone, Default)]
pub struct ContextGuess {
    scores: [u64; 4],
    p1: u8,
    continuation: u8,
    count: u64,
}

impl ContextGuess {
    /// Start with zero scores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Score more bytes.
    pub fn guess(&mut self, buf: &[u8]) {
        for &byte in buf {
            let diff = self.p1 ^ byte;
            self.scores[0] += (diff & 0x3F).count_ones() as u64;
            self.scores[1] += (diff & 0xFC).count_ones() as u64;
            self.scores[2] += self.utf8_cost(byte);
            let a = signed_bucket(self.p1) as i32;
            let b = signed_bucket(byte) as i32;
            self.scores[3] += 2 * (a - b).unsigned_abs() as u64 + 1;
            self.p1 = byte;
            self.count += 1;
        }
    }

    fn utf8_cost(&mut self, byte: u8) -> u64 {
        if self.continuation > 0 {
            if byte & 0xC0 == 0x80 {
                self.continuation -= 1;
                return 1;
            }
            self.continuation = 0;
            return 6;
        }
        match byte {
            0x00..=0x08 | 0x0E..=0x1F | 0x7F => 5,
            0x09..=0x0D | 0x20..=0x7E => 1,
            0xC2..=0xDF => {
                self.continuation = 1;
                1
            }
            0xE0..=0xEF => {
                self.continuation = 2;
                1
            }
            0xF0..=0xF4 => {
                self.continuation = 3;
                1
            }
            _ => 6,
        }
    }

    /// Scores indexed by [`ContextMode::bits`].
    pub fn scores(&self) -> [u64; 4] {
        self.scores
    }

    /// Bytes scored so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mode with the lowest score; UTF-8 on ties and empty input.
    pub fn best(&self) -> ContextMode {
        best_of(&self.scores)
    }
}

fn best_of(scores: &[u64; 4]) -> ContextMode {
    let mut best = ContextMode::Utf8;
    for mode in ContextMode::ALL {
        if scores[mode.bits() as usize] < scores[best.bits() as usize] {
            best = mode;
        }
    }
    best
}

#[derive(Debug, Clone, Copy)]
struct Node {
    scores: [u64; 4],
}

impl Node {
    fn best_score(&self) -> u64 {
        self.scores[best_of(&self.scores).bits() as usize]
    }
}

/// Split `buf` into spans of consistent context mode.
///
/// Adjacent pieces are merged when the merged best score exceeds the sum of
/// their separate best scores by at most `margin`. The returned spans cover
/// `0..buf.len()` in order, and consecutive spans have different modes.
pub fn subdivide(buf: &[u8], margin: u64) -> Vec<ContextSpan> {
    let n = buf.len();
    let pieces = MAX_SPANS.min(n.max(1));
    let bound = |i: usize| i * n / pieces;

    let leaves: Vec<Node> = (0..pieces)
        .map(|i| {
            let mut guess = ContextGuess::new();
            if bound(i) > 0 {
                guess.p1 = buf[bound(i) - 1];
            }
            guess.guess(&buf[bound(i)..bound(i + 1)]);
            Node {
                scores: guess.scores(),
            }
        })
        .collect();

    // levels[k][j] covers leaves j << k ..= ((j + 1) << k) - 1 when merged.
    let mut levels: Vec<Vec<Option<Node>>> = vec![leaves.into_iter().map(Some).collect()];
    while levels[levels.len() - 1].len() > 1 {
        let below = &levels[levels.len() - 1];
        let mut above = Vec::with_capacity((below.len() + 1) / 2);
        for pair in below.chunks(2) {
            let merged = match pair {
                [Some(a), Some(b)] => {
                    let mut scores = [0u64; 4];
                    for (s, (x, y)) in scores.iter_mut().zip(a.scores.iter().zip(&b.scores)) {
                        *s = x + y;
                    }
                    let node = Node { scores };
                    let separate = a.best_score() + b.best_score();
                    if node.best_score() <= separate + margin {
                        Some(node)
                    } else {
                        None
                    }
                }
                [Some(a)] => Some(*a),
                _ => None,
            };
            above.push(merged);
        }
        levels.push(above);
    }

    let mut spans: Vec<ContextSpan> = Vec::with_capacity(pieces);
    collect(&levels, levels.len() - 1, 0, &bound, &mut spans);
    spans
}

fn collect(
    levels: &[Vec<Option<Node>>],
    level: usize,
    index: usize,
    bound: &dyn Fn(usize) -> usize,
    spans: &mut Vec<ContextSpan>,
) {
    let Some(nodes) = levels.get(level) else {
        return;
    };
    if index >= nodes.len() {
        return;
    }
    match nodes[index] {
        Some(node) => {
            let mode = best_of(&node.scores);
            if spans.last().map_or(true, |s| s.mode != mode) {
                spans.push(ContextSpan {
                    offset: bound(index << level),
                    mode,
                });
            }
        }
        None => {
            collect(levels, level - 1, 2 * index, bound, spans);
            collect(levels, level - 1, 2 * index + 1, bound, spans);
        }
    }
}
