//! Quality-score encodings and remapping between them
//!
//! FASTQ quality strings store one printable character per base. The encodings
//! differ in the offset subtracted from the character to obtain the score and
//! in the range of scores they allow. Converting between two encodings is a
//! per-character linear shift, clamped into the destination's valid range.

use std::fmt;
use std::str::FromStr;

use crate::error::ExtensionError;

/// Highest printable character allowed in a quality string
const MAX_QUALITY_CHAR: u8 = b'~';

/// Score used when a record without qualities has to be written as FASTQ
pub const DEFAULT_QUALITY_SCORE: u8 = 30;

/// Known quality-score encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QualityEncoding {
    /// Phred+33 (Sanger, Illumina 1.8+)
    #[default]
    Sanger,
    /// Phred+64 (Illumina 1.3 - 1.7)
    Illumina,
    /// Solexa+64 (Solexa, Illumina < 1.3)
    Solexa,
}
impl QualityEncoding {
    /// The character value that represents a score of zero
    #[must_use]
    pub fn offset(self) -> u8 {
        match self {
            Self::Sanger => 33,
            Self::Illumina | Self::Solexa => 64,
        }
    }

    /// The lowest score the encoding can represent
    #[must_use]
    pub fn min_score(self) -> i16 {
        match self {
            Self::Sanger | Self::Illumina => 0,
            Self::Solexa => -5,
        }
    }

    /// Inclusive range of characters that may appear in a quality string
    #[must_use]
    pub fn char_range(self) -> (u8, u8) {
        let low = i16::from(self.offset()) + self.min_score();
        (low as u8, MAX_QUALITY_CHAR)
    }

    /// Checks that every character of `qual` is valid for this encoding
    #[must_use]
    pub fn is_valid(self, qual: &[u8]) -> bool {
        let (low, high) = self.char_range();
        qual.iter().all(|&q| (low..=high).contains(&q))
    }

    /// The character written for [`DEFAULT_QUALITY_SCORE`]
    #[must_use]
    pub fn default_char(self) -> u8 {
        self.offset() + DEFAULT_QUALITY_SCORE
    }

    /// Format name used in settings and file names
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sanger => "fastq-sanger",
            Self::Illumina => "fastq-illumina",
            Self::Solexa => "fastq-solexa",
        }
    }
}
impl FromStr for QualityEncoding {
    type Err = ExtensionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fastq" | "fastq-sanger" | "sanger" | "phred33" => Ok(Self::Sanger),
            "fastq-illumina" | "illumina" | "phred64" => Ok(Self::Illumina),
            "fastq-solexa" | "solexa" => Ok(Self::Solexa),
            _ => Err(ExtensionError::UnknownFormat(s.to_string())),
        }
    }
}
impl fmt::Display for QualityEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A precomputed remapping of quality characters from one encoding to another
///
/// Every byte value maps to `byte + (dest offset - source offset)`, clamped into
/// the destination's printable range. The table is built once per conversion so
/// the per-base work is a single lookup.
#[derive(Clone)]
pub struct QualityShift {
    from: QualityEncoding,
    to: QualityEncoding,
    table: [u8; 256],
}
impl QualityShift {
    /// Builds the shift between two encodings
    ///
    /// Returns `None` when both encodings share the same offset and range, in which
    /// case no remapping is needed.
    ///
    /// Sanger to Illumina is lossy: Illumina tops out at Q62 (`~`), so Sanger
    /// scores from Q63 to Q93 all become Q62.
    #[must_use]
    pub fn between(from: QualityEncoding, to: QualityEncoding) -> Option<Self> {
        if from == to {
            return None;
        }
        let delta = i16::from(to.offset()) - i16::from(from.offset());
        let (low, high) = to.char_range();
        let mut table = [0u8; 256];
        for (byte, slot) in table.iter_mut().enumerate() {
            let shifted = byte as i16 + delta;
            *slot = shifted.clamp(i16::from(low), i16::from(high)) as u8;
        }
        Some(Self { from, to, table })
    }

    #[must_use]
    pub fn from(&self) -> QualityEncoding {
        self.from
    }

    #[must_use]
    pub fn to(&self) -> QualityEncoding {
        self.to
    }

    /// Remaps a quality string in place
    #[inline]
    pub fn apply(&self, qual: &mut [u8]) {
        for q in qual.iter_mut() {
            *q = self.table[*q as usize];
        }
    }
}
impl fmt::Debug for QualityShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QualityShift")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

/// Remaps `qual` in place from one encoding to another
///
/// This is a convenience wrapper over [`QualityShift`] for one-off conversions.
pub fn shift_quality(qual: &mut [u8], from: QualityEncoding, to: QualityEncoding) {
    if let Some(shift) = QualityShift::between(from, to) {
        shift.apply(qual);
    }
}
