use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::tracked::{read_trimmed_line, TrackedInput, DEFAULT_READ_BUFFER_SIZE};
use crate::{
    error::{ReadError, Result},
    AlignmentRecord, FileFormat,
};

/// Number of mandatory tab-separated SAM columns
const SAM_COLUMNS: usize = 11;

/// Streaming reader over the text form of SAM
///
/// Header lines (`@HD`, `@SQ`, ...) are skipped, as are records whose `SEQ`
/// column is `*` since they carry no read sequence. Optional tag columns are
/// ignored.
pub struct AlignmentReader {
    path: PathBuf,
    length: u64,
    consumed: Arc<AtomicU64>,
    inner: Box<dyn BufRead + Send>,
    line: Vec<u8>,
    n_records: u64,
}
impl AlignmentReader {
    /// Opens a SAM file; BAM is recognised but cannot be read
    pub fn open<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<Self> {
        let path = path.as_ref();
        match format {
            FileFormat::Sam => {}
            FileFormat::Bam => return Err(ReadError::UnsupportedFormat(format.to_string()).into()),
            _ => {
                return Err(ReadError::InvalidFormat {
                    path: path.to_path_buf(),
                    format: FileFormat::Sam.to_string(),
                }
                .into())
            }
        }
        let input = TrackedInput::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            length: input.length,
            consumed: input.consumed,
            inner: Box::new(BufReader::with_capacity(DEFAULT_READ_BUFFER_SIZE, input.reader)),
            line: Vec::with_capacity(512),
            n_records: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn length(&self) -> u64 {
        self.length
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.n_records
    }

    /// Checks that the first buffered line is a header or a full alignment line
    pub fn is_valid(&mut self) -> Result<bool> {
        let head = self.inner.fill_buf()?;
        let Some(first_line) = head.split(|&b| b == b'\n').next() else {
            return Ok(true);
        };
        Ok(match first_line.first() {
            None => true,
            Some(b'@') => true,
            Some(_) => first_line.split(|&b| b == b'\t').count() >= SAM_COLUMNS,
        })
    }

    /// Reads the next alignment that carries a read sequence
    pub fn read(&mut self) -> Result<Option<AlignmentRecord>> {
        loop {
            if !read_trimmed_line(&mut self.inner, &mut self.line)? {
                return Ok(None);
            }
            if self.line.is_empty() || self.line[0] == b'@' {
                continue;
            }
            let record = self.parse_line()?;
            self.n_records += 1;
            if !record.is_empty() {
                return Ok(Some(record));
            }
        }
    }

    fn parse_line(&self) -> Result<AlignmentRecord> {
        let text = std::str::from_utf8(&self.line)
            .map_err(|_| self.malformed("alignment line is not valid UTF-8"))?;
        let fields: Vec<&str> = text.split('\t').collect();
        if fields.len() < SAM_COLUMNS {
            return Err(self.malformed("fewer than 11 mandatory columns"));
        }

        let seq = match fields[9] {
            "*" => Vec::new(),
            seq => seq.as_bytes().to_vec(),
        };
        let qual = match fields[10] {
            "*" => None,
            qual => Some(qual.as_bytes().to_vec()),
        };

        Ok(AlignmentRecord {
            qname: fields[0].to_string(),
            flag: self.number(fields[1], "FLAG is not a number")?,
            rname: fields[2].to_string(),
            pos: self.number(fields[3], "POS is not a number")?,
            mapq: self.number(fields[4], "MAPQ is not a number")?,
            cigar: fields[5].to_string(),
            rnext: fields[6].to_string(),
            pnext: self.number(fields[7], "PNEXT is not a number")?,
            tlen: self.number(fields[8], "TLEN is not a number")?,
            seq,
            qual,
        })
    }

    fn number<T: FromStr>(&self, field: &str, reason: &'static str) -> Result<T> {
        field.parse().map_err(|_| self.malformed(reason))
    }

    fn malformed(&self, reason: &'static str) -> crate::Error {
        ReadError::MalformedRecord {
            path: self.path.clone(),
            record: self.n_records,
            reason: reason.to_string(),
        }
        .into()
    }
}
impl Iterator for AlignmentReader {
    type Item = Result<AlignmentRecord>;
    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}
