//! File formats and their classification
//!
//! Formats are inferred from a path's extension (ignoring a trailing compression
//! suffix) or parsed from a format name supplied through the settings.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{error::ExtensionError, QualityEncoding};

/// Compression suffixes that are stripped before looking at the real extension
pub const COMPRESSION_EXTENSIONS: [&str; 5] = ["gz", "bgz", "bz2", "xz", "zst"];

/// The two pipelines an input can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// FASTA / FASTQ family
    Sequence,
    /// SAM / BAM family
    Alignment,
}

/// On-disk format of a sequence or alignment file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Fasta,
    Fastq(QualityEncoding),
    Sam,
    Bam,
}
impl FileFormat {
    /// Classifies a path by its extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ExtensionError> {
        let path = path.as_ref();
        let unsupported = || ExtensionError::UnsupportedExtension(path.display().to_string());
        let extension = real_extension(path).ok_or_else(unsupported)?;
        match extension.as_str() {
            "fa" | "fasta" | "fna" | "ffn" | "faa" | "frn" | "fas" => Ok(Self::Fasta),
            "fq" | "fastq" => Ok(Self::Fastq(QualityEncoding::Sanger)),
            "sam" => Ok(Self::Sam),
            "bam" => Ok(Self::Bam),
            _ => Err(unsupported()),
        }
    }

    #[must_use]
    pub fn kind(self) -> FileKind {
        match self {
            Self::Fasta | Self::Fastq(_) => FileKind::Sequence,
            Self::Sam | Self::Bam => FileKind::Alignment,
        }
    }

    #[must_use]
    pub fn is_fastq(self) -> bool {
        matches!(self, Self::Fastq(_))
    }

    /// The quality encoding carried by the format, if any
    #[must_use]
    pub fn quality_encoding(self) -> Option<QualityEncoding> {
        match self {
            Self::Fastq(encoding) => Some(encoding),
            Self::Sam | Self::Bam => Some(QualityEncoding::Sanger),
            Self::Fasta => None,
        }
    }

    /// Returns the file extension for this format (including the dot)
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Fasta => ".fasta",
            Self::Fastq(_) => ".fastq",
            Self::Sam => ".sam",
            Self::Bam => ".bam",
        }
    }

    /// Format name as accepted by [`FromStr`]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Fasta => "fasta",
            Self::Fastq(QualityEncoding::Sanger) => "fastq",
            Self::Fastq(encoding) => encoding.name(),
            Self::Sam => "sam",
            Self::Bam => "bam",
        }
    }

    /// Replaces the quality encoding of a FASTQ format, leaving others untouched
    #[must_use]
    pub fn with_encoding(self, encoding: QualityEncoding) -> Self {
        match self {
            Self::Fastq(_) => Self::Fastq(encoding),
            other => other,
        }
    }
}
impl FromStr for FileFormat {
    type Err = ExtensionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fasta" | "fa" => Ok(Self::Fasta),
            "sam" => Ok(Self::Sam),
            "bam" => Ok(Self::Bam),
            name if name.starts_with("fastq") || name == "fq" => {
                let name = if name == "fq" { "fastq" } else { name };
                Ok(Self::Fastq(name.parse()?))
            }
            _ => Err(ExtensionError::UnknownFormat(s.to_string())),
        }
    }
}
impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercased extension of `path`, skipping a compression suffix
fn real_extension(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    if COMPRESSION_EXTENSIONS.contains(&extension.as_str()) {
        let inner = Path::new(path.file_stem()?);
        return real_extension(inner);
    }
    Some(extension)
}
