use crate::{FileFormat, QualityShift};

/// An owned sequence record read from or written to a FASTA / FASTQ file.
///
/// The record is owned by whichever engine read it until it is handed to a writer.
///
/// # Example
///
/// ```
/// use seqops::SequenceRecord;
///
/// let record = SequenceRecord::new("read_001", b"ACGTACGT".to_vec())
///     .with_description("1:N:0:ACGTAC")
///     .with_quality(b"IIIIFFFF".to_vec());
///
/// assert_eq!(record.barcode(), Some("ACGTAC"));
/// assert_eq!(record.header(), "read_001 1:N:0:ACGTAC");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceRecord {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) sequence: Vec<u8>,
    pub(crate) quality: Option<Vec<u8>>,
}

impl SequenceRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, sequence: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sequence,
            quality: None,
        }
    }

    /// Sets the free-text description that follows the name in the header
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the quality string
    #[must_use]
    pub fn with_quality(mut self, quality: Vec<u8>) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Returns the record name (the header up to the first whitespace)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the header text after the name, empty if absent
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    #[must_use]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    #[inline]
    #[must_use]
    pub fn quality(&self) -> Option<&[u8]> {
        self.quality.as_deref()
    }

    /// Returns the full header line without its leading marker
    #[must_use]
    pub fn header(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.description)
        }
    }

    /// Returns the Illumina barcode token of the header, if present
    ///
    /// Illumina read headers end with `<read>:<filtered>:<control>:<index>`; the
    /// index sequence after the last `:` of the description is the barcode.
    #[must_use]
    pub fn barcode(&self) -> Option<&str> {
        let (_, token) = self.description.rsplit_once(':')?;
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }

    /// A record without a name and a sequence carries no data
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.sequence.is_empty()
    }

    /// Truncates the sequence (and quality) to at most `length` bases
    pub fn trim(&mut self, length: usize) {
        self.sequence.truncate(length);
        if let Some(quality) = self.quality.as_mut() {
            quality.truncate(length);
        }
    }

    /// Remaps the quality string in place, if the record has one
    pub fn shift_quality(&mut self, shift: &QualityShift) {
        if let Some(quality) = self.quality.as_mut() {
            shift.apply(quality);
        }
    }

    /// Returns the exact number of bytes the record occupies once written in `format`
    ///
    /// FASTA records are written on a single sequence line, FASTQ records with a
    /// bare `+` separator. Alignment formats are not written by this crate and
    /// report the FASTQ size.
    #[must_use]
    pub fn encoded_len(&self, format: FileFormat) -> usize {
        let mut header = 1 + self.name.len() + 1;
        if !self.description.is_empty() {
            header += 1 + self.description.len();
        }
        let sequence = self.sequence.len() + 1;
        match format {
            FileFormat::Fasta => header + sequence,
            _ => header + sequence + 2 + self.sequence.len() + 1,
        }
    }
}
