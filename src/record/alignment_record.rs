use crate::SequenceRecord;

/// SAM flag bit marking a read aligned to the reverse strand
pub const FLAG_REVERSE: u16 = 0x10;

/// An owned alignment record holding the mandatory SAM columns
///
/// Only the read sequence and quality survive conversion into a
/// [`SequenceRecord`]; the positional fields are kept so that callers reading
/// alignments directly can inspect them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub qname: String,
    pub flag: u16,
    pub rname: String,
    pub pos: u64,
    pub mapq: u8,
    pub cigar: String,
    pub rnext: String,
    pub pnext: u64,
    pub tlen: i64,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

impl AlignmentRecord {
    #[inline]
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.flag & FLAG_REVERSE != 0
    }

    /// A record without a read sequence carries no data
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Converts by move, discarding alignment-only fields
///
/// Reverse-strand alignments store the reverse complement of the read, so the
/// sequence is complemented back and the quality string reversed to recover the
/// read as it came off the sequencer.
impl From<AlignmentRecord> for SequenceRecord {
    fn from(record: AlignmentRecord) -> Self {
        let reverse = record.is_reverse();
        let mut sequence = record.seq;
        let mut quality = record.qual;
        if reverse {
            reverse_complement(&mut sequence);
            if let Some(quality) = quality.as_mut() {
                quality.reverse();
            }
        }
        SequenceRecord {
            name: record.qname,
            description: String::new(),
            sequence,
            quality,
        }
    }
}

fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' | b'u' => b'a',
        other => other,
    }
}

fn reverse_complement(sequence: &mut [u8]) {
    sequence.reverse();
    for base in sequence.iter_mut() {
        *base = complement(*base);
    }
}
