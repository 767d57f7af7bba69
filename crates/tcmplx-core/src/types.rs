//! Core type definitions shared by the format crates.

/// Compression level presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionLevel {
    /// Literals only, no match search.
    None,

    /// Short hash chains (level 1-3).
    Fast,

    /// Balanced chain depth (level 4-6, default).
    #[default]
    Default,

    /// Deep chains (level 7-9).
    Best,

    /// Custom level, clamped to 0-9.
    Custom(i32),
}

impl CompressionLevel {
    /// Convert to numeric level.
    pub fn to_level(self) -> i32 {
        match self {
            CompressionLevel::None => 0,
            CompressionLevel::Fast => 1,
            CompressionLevel::Default => 6,
            CompressionLevel::Best => 9,
            CompressionLevel::Custom(level) => level.clamp(0, 9),
        }
    }

    /// Create from numeric level.
    pub fn from_level(level: i32) -> Self {
        match level {
            0 => CompressionLevel::None,
            1..=3 => CompressionLevel::Fast,
            4..=6 => CompressionLevel::Default,
            7..=9 => CompressionLevel::Best,
            _ => CompressionLevel::Custom(level),
        }
    }

    /// Hash chain length searched per position.
    ///
    /// Level 0 keeps a chain of one entry; the match finder still runs but
    /// the encoders are expected to prefer literal-only blocks.
    pub fn chain_length(self) -> usize {
        match self.to_level() {
            0 => 1,
            1 => 4,
            2 => 6,
            3 => 8,
            4 => 12,
            5 => 16,
            6 => 24,
            7 => 48,
            8 => 96,
            _ => 256,
        }
    }
}

/// Supported stream formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Zlib framing around DEFLATE (RFC 1950 / RFC 1951).
    Zlib,
    /// Brotli (RFC 7932).
    Brotli,
}

impl Algorithm {
    /// Get algorithm name as string.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Zlib => "zlib",
            Algorithm::Brotli => "brotli",
        }
    }

    /// Largest backward distance the format can express.
    pub fn max_window(self) -> usize {
        match self {
            Algorithm::Zlib => 32768,
            Algorithm::Brotli => (1 << 24) - 16,
        }
    }
}

/// Compression ratio metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionRatio {
    /// Original uncompressed size in bytes.
    pub original_size: usize,
    /// Compressed size in bytes.
    pub compressed_size: usize,
}

impl CompressionRatio {
    /// Create new ratio from sizes.
    pub fn new(original: usize, compressed: usize) -> Self {
        CompressionRatio {
            original_size: original,
            compressed_size: compressed,
        }
    }

    /// Calculate ratio (original / compressed).
    pub fn ratio(&self) -> f64 {
        if self.compressed_size == 0 {
            return 0.0;
        }
        self.original_size as f64 / self.compressed_size as f64
    }

    /// Check if compression saved space.
    pub fn is_effective(&self) -> bool {
        self.compressed_size < self.original_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_roundtrip() {
        for level in [
            CompressionLevel::None,
            CompressionLevel::Fast,
            CompressionLevel::Default,
            CompressionLevel::Best,
        ] {
            assert_eq!(CompressionLevel::from_level(level.to_level()), level);
        }
        assert_eq!(CompressionLevel::Custom(42).to_level(), 9);
    }

    #[test]
    fn test_chain_length_monotonic() {
        let lengths: Vec<usize> = (0..=9)
            .map(|l| CompressionLevel::Custom(l).chain_length())
            .collect();
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_ratio() {
        let ratio = CompressionRatio::new(100, 25);
        assert!((ratio.ratio() - 4.0).abs() < f64::EPSILON);
        assert!(ratio.is_effective());
        assert_eq!(CompressionRatio::new(10, 0).ratio(), 0.0);
    }
}
