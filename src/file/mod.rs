//! Readers, writers and output naming
//!
//! Readers and writers are distinct types, so every handle has a single
//! direction. All readers report the on-disk `length` of their file and the
//! `position` reached so far, which the engines use for progress.

mod alignment;
pub mod naming;
mod sequence;
mod tracked;

pub use alignment::AlignmentReader;
pub use sequence::{SequenceReader, SequenceWriter, DEFAULT_WRITE_BUFFER_SIZE};
pub use tracked::{CountingReader, DEFAULT_READ_BUFFER_SIZE};

use std::path::Path;

use crate::{error::Result, FileFormat, FileKind, QualityEncoding, SequenceRecord};

/// Determines the format of `path`, letting a declared FASTQ variant refine it
///
/// The extension decides the family; a declared format only contributes the
/// quality encoding when both agree the file is FASTQ.
pub fn resolve_format(path: &Path, declared: Option<FileFormat>) -> Result<FileFormat> {
    let detected = FileFormat::from_path(path)?;
    Ok(match (detected, declared) {
        (FileFormat::Fastq(_), Some(FileFormat::Fastq(encoding))) => FileFormat::Fastq(encoding),
        _ => detected,
    })
}

/// An opened input of either kind
///
/// Engines that accept sequence and alignment files alike read through this
/// type and always receive [`SequenceRecord`]s.
pub enum InputSource {
    Sequence(SequenceReader),
    Alignment(AlignmentReader),
}
impl InputSource {
    /// Opens `path`, classifying it by extension
    pub fn open(path: &Path, declared: Option<FileFormat>) -> Result<Self> {
        let format = resolve_format(path, declared)?;
        match format.kind() {
            FileKind::Sequence => Ok(Self::Sequence(SequenceReader::open(path, format)?)),
            FileKind::Alignment => Ok(Self::Alignment(AlignmentReader::open(path, format)?)),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FileKind {
        match self {
            Self::Sequence(_) => FileKind::Sequence,
            Self::Alignment(_) => FileKind::Alignment,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Sequence(reader) => reader.path(),
            Self::Alignment(reader) => reader.path(),
        }
    }

    #[must_use]
    pub fn format(&self) -> FileFormat {
        match self {
            Self::Sequence(reader) => reader.format(),
            Self::Alignment(_) => FileFormat::Sam,
        }
    }

    /// Quality encoding of the records produced by this source
    #[must_use]
    pub fn quality_encoding(&self) -> Option<QualityEncoding> {
        self.format().quality_encoding()
    }

    #[must_use]
    pub fn length(&self) -> u64 {
        match self {
            Self::Sequence(reader) => reader.length(),
            Self::Alignment(reader) => reader.length(),
        }
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        match self {
            Self::Sequence(reader) => reader.position(),
            Self::Alignment(reader) => reader.position(),
        }
    }

    pub fn is_valid(&mut self) -> Result<bool> {
        match self {
            Self::Sequence(reader) => reader.is_valid(),
            Self::Alignment(reader) => reader.is_valid(),
        }
    }

    /// Reads the next record, converting alignments by move
    pub fn read_record(&mut self) -> Result<Option<SequenceRecord>> {
        match self {
            Self::Sequence(reader) => reader.read(),
            Self::Alignment(reader) => Ok(reader.read()?.map(SequenceRecord::from)),
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{Error, ReadError};
    use std::fs;

    #[test]
    fn test_resolve_format() -> anyhow::Result<()> {
        let illumina = FileFormat::Fastq(QualityEncoding::Illumina);
        assert_eq!(resolve_format(Path::new("a.fq"), Some(illumina))?, illumina);
        assert_eq!(
            resolve_format(Path::new("a.fq"), None)?,
            FileFormat::Fastq(QualityEncoding::Sanger)
        );
        assert_eq!(resolve_format(Path::new("a.fa"), Some(illumina))?, FileFormat::Fasta);
        assert_eq!(resolve_format(Path::new("a.sam"), Some(illumina))?, FileFormat::Sam);
        assert!(resolve_format(Path::new("a.txt"), None).is_err());
        Ok(())
    }

    #[test]
    fn test_input_source_dispatch() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let fastq = dir.path().join("reads.fq");
        let sam = dir.path().join("aln.sam");
        fs::write(&fastq, "@r1\nACGT\n+\nIIII\n")?;
        fs::write(&sam, "r2\t16\tchr1\t1\t60\t2M\t*\t0\t0\tAC\tAB\n")?;

        let mut source = InputSource::open(&fastq, None)?;
        assert_eq!(source.kind(), FileKind::Sequence);
        assert!(source.is_valid()?);
        assert_eq!(source.read_record()?.map(|r| r.name().to_string()), Some("r1".into()));
        assert!(source.read_record()?.is_none());

        let mut source = InputSource::open(&sam, None)?;
        assert_eq!(source.kind(), FileKind::Alignment);
        assert_eq!(source.quality_encoding(), Some(QualityEncoding::Sanger));
        let record = source.read_record()?.expect("one alignment");
        assert_eq!(record.sequence(), b"GT");
        assert_eq!(source.position(), source.length());
        Ok(())
    }

    #[test]
    fn test_input_source_missing_file() {
        assert!(matches!(
            InputSource::open(Path::new("/no/such/reads.fq"), None),
            Err(Error::ReadError(ReadError::CannotOpen { .. }))
        ));
    }
}
