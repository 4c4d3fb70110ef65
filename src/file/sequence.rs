use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use seq_io::fasta::Record as _;
use seq_io::fastq::Record as _;

use super::tracked::{TrackedInput, DEFAULT_READ_BUFFER_SIZE};
use crate::{
    error::{ConfigError, ReadError, Result, WriteError},
    FileFormat, FileKind, SequenceRecord,
};

/// Default write buffer size
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 128 * 1024;

type Stream = Box<dyn Read + Send>;

/// The `seq_io` parser matching the declared format
enum Parser {
    Fasta(seq_io::fasta::Reader<Stream>),
    Fastq(seq_io::fastq::Reader<Stream>),
}

/// Why a record could not be produced
enum ParseFailure {
    Io(io::Error),
    Malformed(String),
}

/// Streaming reader over a FASTA or FASTQ file
///
/// Parsing is delegated to `seq_io`; FASTA records may span several sequence
/// lines. Input compressed with any codec known to `niffler` is decompressed
/// on the fly.
pub struct SequenceReader {
    path: PathBuf,
    format: FileFormat,
    length: u64,
    consumed: Arc<AtomicU64>,
    parser: Parser,
    /// First record (or failure) pulled by [`SequenceReader::is_valid`]
    peeked: Option<Result<Option<SequenceRecord>>>,
    n_records: u64,
}
impl SequenceReader {
    /// Opens `path` as a sequence file of the given format
    pub fn open<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<Self> {
        let path = path.as_ref();
        if format.kind() != FileKind::Sequence {
            return Err(ReadError::NotASequenceFile(path.to_path_buf()).into());
        }
        let input = TrackedInput::open(path)?;
        let parser = if format.is_fastq() {
            Parser::Fastq(seq_io::fastq::Reader::with_capacity(
                input.reader,
                DEFAULT_READ_BUFFER_SIZE,
            ))
        } else {
            Parser::Fasta(seq_io::fasta::Reader::with_capacity(
                input.reader,
                DEFAULT_READ_BUFFER_SIZE,
            ))
        };
        Ok(Self {
            path: path.to_path_buf(),
            format,
            length: input.length,
            consumed: input.consumed,
            parser,
            peeked: None,
            n_records: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Size of the file on disk
    #[must_use]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Number of on-disk bytes consumed so far
    #[must_use]
    pub fn position(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    /// Number of records returned so far
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.n_records
    }

    /// Checks that the head of the file parses as the declared format
    ///
    /// An empty file is valid. For FASTQ the first record must carry quality
    /// characters inside the range of the declared encoding. The record is kept
    /// and returned by the next [`SequenceReader::read`].
    pub fn is_valid(&mut self) -> Result<bool> {
        let first = match self.peeked.take() {
            Some(first) => first,
            None => self.parse_next(),
        };
        let malformed = matches!(
            first,
            Err(crate::Error::ReadError(ReadError::MalformedRecord { .. }))
        );
        if first.is_err() && !malformed {
            return first.map(|_| false);
        }
        let valid = match &first {
            Ok(Some(record)) => match (self.format, record.quality()) {
                (FileFormat::Fastq(encoding), Some(quality)) => encoding.is_valid(quality),
                _ => true,
            },
            Ok(None) => true,
            Err(_) => false,
        };
        self.peeked = Some(first);
        Ok(valid)
    }

    /// Reads the next record, `None` once the file is exhausted
    pub fn read(&mut self) -> Result<Option<SequenceRecord>> {
        let record = match self.peeked.take() {
            Some(peeked) => peeked?,
            None => self.parse_next()?,
        };
        if record.is_some() {
            self.n_records += 1;
        }
        Ok(record)
    }

    fn parse_next(&mut self) -> Result<Option<SequenceRecord>> {
        let parsed = match &mut self.parser {
            Parser::Fasta(reader) => reader.next().map(|result| match result {
                Ok(record) => Ok(owned_record(record.head(), record.full_seq().into_owned(), None)),
                Err(seq_io::fasta::Error::Io(err)) => Err(ParseFailure::Io(err)),
                Err(err) => Err(ParseFailure::Malformed(err.to_string())),
            }),
            Parser::Fastq(reader) => reader.next().map(|result| match result {
                Ok(record) => Ok(owned_record(
                    record.head(),
                    record.seq().to_vec(),
                    Some(record.qual().to_vec()),
                )),
                Err(seq_io::fastq::Error::Io(err)) => Err(ParseFailure::Io(err)),
                Err(err) => Err(ParseFailure::Malformed(err.to_string())),
            }),
        };
        match parsed {
            None => Ok(None),
            Some(Ok(record)) => {
                if record.quality().is_some_and(|q| q.len() != record.sequence().len()) {
                    return Err(self.malformed("sequence and quality lengths differ".to_string()));
                }
                Ok(Some(record))
            }
            Some(Err(ParseFailure::Io(err))) => Err(err.into()),
            Some(Err(ParseFailure::Malformed(reason))) => Err(self.malformed(reason)),
        }
    }

    fn malformed(&self, reason: String) -> crate::Error {
        ReadError::MalformedRecord {
            path: self.path.clone(),
            record: self.n_records,
            reason,
        }
        .into()
    }
}
impl Iterator for SequenceReader {
    type Item = Result<SequenceRecord>;
    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}

/// Builds an owned record from a raw header (without marker)
fn owned_record(head: &[u8], sequence: Vec<u8>, quality: Option<Vec<u8>>) -> SequenceRecord {
    let (name, description) = split_header(head);
    SequenceRecord {
        name,
        description,
        sequence,
        quality,
    }
}

/// Splits a header line (without marker) into name and description
fn split_header(header: &[u8]) -> (String, String) {
    let header = String::from_utf8_lossy(header);
    match header.split_once(|c: char| c == ' ' || c == '\t') {
        Some((name, description)) => (name.to_string(), description.trim().to_string()),
        None => (header.trim_end().to_string(), String::new()),
    }
}

/// Writer for FASTA and FASTQ files, encoding records with `seq_io`
///
/// FASTA records are written on a single sequence line. FASTQ records lacking a
/// quality string receive the default quality character of the output encoding.
pub struct SequenceWriter<W: Write = BufWriter<File>> {
    path: PathBuf,
    format: FileFormat,
    inner: W,
    bytes_written: u64,
    records_written: u64,
}
impl SequenceWriter {
    /// Creates (or truncates) the file at `path`
    pub fn create<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<Self> {
        let path = path.as_ref();
        check_output_format(format)?;
        let file = File::create(path).map_err(|source| WriteError::CannotCreate {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(
            BufWriter::with_capacity(DEFAULT_WRITE_BUFFER_SIZE, file),
            format,
            path,
        )
    }
}
impl<W: Write> SequenceWriter<W> {
    /// Wraps an arbitrary writer; `path` is used for naming and reporting only
    pub fn new(inner: W, format: FileFormat, path: impl Into<PathBuf>) -> Result<Self> {
        check_output_format(format)?;
        Ok(Self {
            path: path.into(),
            format,
            inner,
            bytes_written: 0,
            records_written: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Total bytes written (before buffering)
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn write(&mut self, record: &SequenceRecord) -> Result<()> {
        let header = record.header();
        match self.format {
            FileFormat::Fastq(encoding) => match record.quality() {
                Some(quality) => seq_io::fastq::write_to(
                    &mut self.inner,
                    header.as_bytes(),
                    &record.sequence,
                    quality,
                )?,
                None => {
                    let filler = vec![encoding.default_char(); record.sequence.len()];
                    seq_io::fastq::write_to(&mut self.inner, header.as_bytes(), &record.sequence, &filler)?;
                }
            },
            _ => seq_io::fasta::write_to(&mut self.inner, header.as_bytes(), &record.sequence)?,
        }

        self.bytes_written += record.encoded_len(self.format) as u64;
        self.records_written += 1;
        Ok(())
    }

    /// Flushes buffered bytes to the underlying writer
    pub fn finish(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Consumes the writer and returns the inner handle
    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn check_output_format(format: FileFormat) -> Result<()> {
    if format.kind() == FileKind::Sequence {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedOutputFormat(format.to_string()).into())
    }
}
