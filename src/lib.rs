//! # seqops
//!
//! Streaming operations over sequencing files: FASTA and FASTQ (plain or
//! compressed) and SAM.
//!
//! Three engines share the same readers, writers and progress plumbing:
//!
//! - [`Converter`] merges inputs into one FASTA/FASTQ file, remapping FASTQ
//!   quality encodings on the way
//! - [`Splitter`] cuts one input into numbered parts by record count, file
//!   count or size
//! - [`Extractor`] selects records matching a set of queries, optionally
//!   demultiplexing them into one file per query and handling mate pairs
//!
//! Every engine reports progress as a percentage through an optional callback
//! and can be cancelled through a [`CancelToken`]; a cancelled run returns a
//! [`Report`] flagged as such and keeps the output written so far.

mod config;
mod convert;
mod error;
mod extract;
pub mod file;
mod format;
mod parallel;
mod progress;
mod quality;
mod record;
mod split;

#[cfg(test)]
mod fixtures;

pub use config::{Setting, Settings};
pub use convert::Converter;
pub use error::{ConfigError, Error, ExtensionError, IntoSeqopsError, ReadError, Result, WriteError};
pub use extract::{
    BatchBuffer, DemuxOutputs, DemuxTarget, Extractor, ExtractorJob, ExtractorJobBuilder,
    InputUnit, OutputPair, QuerySet, RecordPair, Sinks, FLUSH_THRESHOLD,
};
pub use file::{AlignmentReader, InputSource, SequenceReader, SequenceWriter};
pub use format::{FileFormat, FileKind, COMPRESSION_EXTENSIONS};
pub use parallel::{process_parallel, resolve_threads, ParallelProcessor, UnitFailure, UnitSequencer};
pub use progress::{
    has_to_update_progress, CancelToken, ProgressCallback, ProgressReporter, Report,
    PROGRESS_INTERVAL,
};
pub use quality::{shift_quality, QualityEncoding, QualityShift, DEFAULT_QUALITY_SCORE};
pub use record::{AlignmentRecord, SequenceRecord, FLAG_REVERSE};
pub use split::{SplitLimit, Splitter};
