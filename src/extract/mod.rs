//! Query-based extraction and demultiplexing
//!
//! Each input (or mate pair) is a work unit handled by one worker. Workers
//! match records against the [`QuerySet`], collect hits in a private
//! [`BatchBuffer`] and flush it into the shared [`Sinks`] under a short lock.
//! With a single output, workers take turns in input order so that the file
//! lists the hits of each input after those of the inputs before it.

mod buffer;
mod job;
mod output;
mod query;

pub use buffer::{BatchBuffer, RecordPair, FLUSH_THRESHOLD};
pub use job::{ExtractorJob, ExtractorJobBuilder, InputUnit};
pub use output::{DemuxOutputs, DemuxTarget, OutputPair, Sinks};
pub use query::QuerySet;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::{error, log, warn};
use parking_lot::Mutex;

use crate::{
    error::{ConfigError, ReadError, Result},
    file::{naming, resolve_format, SequenceReader},
    parallel::{process_parallel, ParallelProcessor, UnitSequencer},
    progress::{
        has_to_update_progress, verbosity, CancelToken, ProgressCallback, ProgressReporter,
        Report, PROGRESS_INTERVAL,
    },
    Error, FileFormat, FileKind, QualityEncoding, SequenceRecord,
};

/// Suffix of the default output name
const OUTPUT_SUFFIX: &str = "-extracted";

/// Readers of one opened work unit, taken by the worker that processes it
type OpenUnit = Mutex<Option<(SequenceReader, Option<SequenceReader>)>>;

/// Run-wide counters shared by all workers
#[derive(Debug, Default)]
struct Counters {
    scanned: AtomicU64,
    extracted: AtomicU64,
    bytes: AtomicU64,
}

/// State shared by every worker of a run
struct Context<'p> {
    queries: QuerySet,
    sinks: Sinks,
    counters: Counters,
    progress: Mutex<ProgressReporter<'p>>,
    /// Write turns in input order, single output only
    sequencer: Option<UnitSequencer>,
    cancel: CancelToken,
    total_bytes: u64,
    demultiplex: bool,
    illumina_r2_barcodes: bool,
    trim_length: usize,
}

/// Selects records matching a set of queries
///
/// # Example
///
/// ```no_run
/// use seqops::{Extractor, ExtractorJob};
///
/// let job = ExtractorJob::builder()
///     .input("reads.fq")
///     .queries(["read_17", "read_42"])
///     .build()?;
/// let report = Extractor::new(job).run()?;
/// println!("{} records extracted", report.records_written);
/// # Ok::<(), seqops::Error>(())
/// ```
pub struct Extractor {
    job: ExtractorJob,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
}
impl Extractor {
    #[must_use]
    pub fn new(job: ExtractorJob) -> Self {
        Self {
            job,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn job(&self) -> &ExtractorJob {
        &self.job
    }

    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: FnMut(f32) -> bool + Send + 'static,
    {
        self.progress = Some(Box::new(callback));
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the extraction, logging the outcome; `true` on success or cancellation
    pub fn process(&mut self) -> bool {
        match self.run() {
            Ok(_) => true,
            Err(err) if err.is_empty_result() => {
                error!("Extraction finished without output: {err}");
                false
            }
            Err(err) => {
                error!("Extraction failed: {err}");
                false
            }
        }
    }

    pub fn run(&mut self) -> Result<Report> {
        let start = Instant::now();
        let verbose = self.job.settings().verbose();
        let queries = QuerySet::new(
            self.job.queries().iter().cloned(),
            self.job.search_in_data(),
            self.job.wildcard(),
        )?;

        let (units, formats) = self.open_units()?;
        let total_bytes = units
            .iter()
            .filter_map(|unit| {
                unit.lock().as_ref().map(|(first, second)| {
                    first.length() + second.as_ref().map_or(0, SequenceReader::length)
                })
            })
            .sum();
        let output_format = self.output_format(formats[0])?;
        let sinks = self.create_sinks(output_format)?;

        log!(
            verbosity(verbose),
            "Extracting {} queries from {} input unit(s)",
            queries.len(),
            units.len()
        );

        let context = Context {
            queries,
            sinks,
            counters: Counters::default(),
            progress: Mutex::new(ProgressReporter::new(
                self.progress.as_mut(),
                self.cancel.clone(),
            )),
            sequencer: (!self.job.demultiplex()).then(UnitSequencer::new),
            cancel: self.cancel.clone(),
            total_bytes,
            demultiplex: self.job.demultiplex(),
            illumina_r2_barcodes: self.job.illumina_r2_barcodes(),
            trim_length: self.job.trim_length(),
        };

        let processor = ExtractProcessor::new(&context);
        let failures = process_parallel(&units, &processor, self.job.threads(), &self.cancel)?;
        for failure in &failures {
            warn!(
                "Skipped the rest of {}: {}",
                self.job.inputs()[failure.index].first.display(),
                failure.error
            );
        }

        let outputs = context.sinks.finish()?;
        let scanned = context.counters.scanned.load(Ordering::Relaxed);
        let extracted = context.counters.extracted.load(Ordering::Relaxed);
        let cancelled = self.cancel.is_cancelled();

        if !cancelled {
            if extracted == 0 {
                return Err(match failures.into_iter().next() {
                    Some(failure) => failure.error,
                    None => Error::NoMatches(context.queries.len()),
                });
            }
            context.progress.lock().finish();
        }

        let report = Report {
            records_read: scanned,
            records_written: extracted,
            outputs,
            cancelled,
            elapsed: start.elapsed(),
        };
        report.log_summary("Extraction", verbose);
        Ok(report)
    }

    /// Opens and validates every input, returning the units and their formats
    fn open_units(&self) -> Result<(Vec<OpenUnit>, Vec<FileFormat>)> {
        let declared = if self.job.solexa_variant() {
            Some(FileFormat::Fastq(QualityEncoding::Solexa))
        } else {
            self.job.settings().input_format()?
        };

        let open = |path: &PathBuf| -> Result<SequenceReader> {
            let format = resolve_format(path, declared)?;
            if format.kind() != FileKind::Sequence {
                return Err(ReadError::NotASequenceFile(path.clone()).into());
            }
            let mut reader = SequenceReader::open(path, format)?;
            if !reader.is_valid()? {
                return Err(ReadError::InvalidFormat {
                    path: path.clone(),
                    format: format.to_string(),
                }
                .into());
            }
            Ok(reader)
        };

        let mut units = Vec::with_capacity(self.job.inputs().len());
        let mut formats = Vec::with_capacity(self.job.inputs().len());
        for unit in self.job.inputs() {
            let first = open(&unit.first)?;
            let second = unit.second.as_ref().map(&open).transpose()?;
            formats.push(first.format());
            units.push(Mutex::new(Some((first, second))));
        }
        Ok((units, formats))
    }

    /// The declared output format, or the format of the first input
    fn output_format(&self, first_input: FileFormat) -> Result<FileFormat> {
        match self.job.settings().output_format()? {
            Some(format) if format.kind() == FileKind::Sequence => Ok(format),
            Some(format) => Err(ConfigError::UnsupportedOutputFormat(format.to_string()).into()),
            None => Ok(first_input),
        }
    }

    fn create_sinks(&self, format: FileFormat) -> Result<Sinks> {
        let first_input = &self.job.inputs()[0].first;
        if self.job.demultiplex() {
            let target = match self.job.output() {
                Some(output) => DemuxTarget::from_output(output),
                None => DemuxTarget::Prefix {
                    parent: output::parent_dir(first_input),
                    stem: format!("{}{OUTPUT_SUFFIX}", naming::file_stem(first_input)),
                },
            };
            target.check_writable()?;
            Ok(Sinks::Demux(DemuxOutputs::new(target, format, self.job.paired())))
        } else {
            let path = match self.job.output() {
                Some(output) => output.to_path_buf(),
                None => naming::derived_output_path(first_input, OUTPUT_SUFFIX, format),
            };
            let pair = OutputPair::create(&path, format, self.job.paired())?;
            Ok(Sinks::Single(Mutex::new(pair)))
        }
    }
}

/// Per-worker extraction state
#[derive(Clone)]
struct ExtractProcessor<'a, 'p> {
    context: &'a Context<'p>,
    buffer: BatchBuffer,
    /// Unit being processed
    unit: usize,
    /// The unit already holds the single output's write turn
    has_turn: bool,
    tid: Option<usize>,
}
impl<'a, 'p> ExtractProcessor<'a, 'p> {
    fn new(context: &'a Context<'p>) -> Self {
        Self {
            context,
            buffer: BatchBuffer::new(),
            unit: 0,
            has_turn: false,
            tid: None,
        }
    }

    /// Destination key of a record (pair), `None` if it is dropped
    ///
    /// Without demultiplexing every hit shares the empty key so that the
    /// buffer keeps input order.
    fn match_key(&self, first: &SequenceRecord, second: Option<&SequenceRecord>) -> Option<&'a str> {
        let context: &'a Context<'p> = self.context;
        let queries = &context.queries;
        let index = match second {
            Some(mate) if self.context.illumina_r2_barcodes => queries.find(mate)?,
            Some(mate) => {
                let index = queries.find(first)?;
                queries.is_match(index, mate).then_some(index)?
            }
            None => queries.find(first)?,
        };
        if context.demultiplex {
            Some(queries.query(index))
        } else {
            Some("")
        }
    }

    /// Writes the buffered hits, waiting for the unit's turn on a single output
    ///
    /// Hits of a unit cancelled while waiting are discarded.
    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let context = self.context;
        if let Some(sequencer) = context.sequencer.as_ref().filter(|_| !self.has_turn) {
            if !sequencer.wait_turn(self.unit, &context.cancel) {
                let dropped = self.buffer.clear() as u64;
                context.counters.extracted.fetch_sub(dropped, Ordering::Relaxed);
                return Ok(());
            }
            self.has_turn = true;
        }
        for (key, batch) in self.buffer.drain() {
            context.sinks.write_batch(&key, &batch)?;
        }
        Ok(())
    }

    /// Publishes consumed bytes and reports progress at checkpoints
    ///
    /// Returns `true` once the run has been cancelled.
    fn checkpoint(&self, local_count: u64, consumed: u64, reported: &mut u64) -> bool {
        let context = self.context;
        let scanned = context.counters.scanned.fetch_add(1, Ordering::Relaxed) + 1;
        let global_checkpoint = has_to_update_progress(scanned);
        if !global_checkpoint && local_count % PROGRESS_INTERVAL != 0 {
            return false;
        }

        let bytes = context
            .counters
            .bytes
            .fetch_add(consumed - *reported, Ordering::Relaxed)
            + (consumed - *reported);
        *reported = consumed;

        if global_checkpoint {
            context.progress.lock().update(bytes, context.total_bytes)
        } else {
            context.cancel.is_cancelled()
        }
    }
}
impl ParallelProcessor for ExtractProcessor<'_, '_> {
    type Unit = OpenUnit;

    fn process_unit(&mut self, index: usize, unit: &OpenUnit) -> Result<()> {
        self.unit = index;
        self.has_turn = false;
        let Some((mut first_reader, mut second_reader)) = unit.lock().take() else {
            return Ok(());
        };
        let position = |first: &SequenceReader, second: &Option<SequenceReader>| {
            first.position() + second.as_ref().map_or(0, SequenceReader::position)
        };
        let mut local_count = 0u64;
        let mut reported = 0u64;

        loop {
            let Some(mut first) = first_reader.read()? else {
                if let Some(mate) = second_reader.as_mut() {
                    if mate.read()?.is_some() {
                        return Err(ReadError::MateExhausted(first_reader.path().to_path_buf()).into());
                    }
                }
                break;
            };
            let mut second = match second_reader.as_mut() {
                Some(mate) => Some(
                    mate.read()?
                        .ok_or_else(|| ReadError::MateExhausted(mate.path().to_path_buf()))?,
                ),
                None => None,
            };
            local_count += 1;

            if let Some(key) = self.match_key(&first, second.as_ref()) {
                if self.context.trim_length > 0 {
                    first.trim(self.context.trim_length);
                    if let Some(mate) = second.as_mut() {
                        mate.trim(self.context.trim_length);
                    }
                }
                self.buffer.push(key, (first, second));
                self.context.counters.extracted.fetch_add(1, Ordering::Relaxed);
                if self.buffer.is_full() {
                    self.flush()?;
                }
            }

            let consumed = position(&first_reader, &second_reader);
            if self.checkpoint(local_count, consumed, &mut reported) {
                return Ok(());
            }
        }

        let length = first_reader.length() + second_reader.as_ref().map_or(0, SequenceReader::length);
        self.context
            .counters
            .bytes
            .fetch_add(length.saturating_sub(reported), Ordering::Relaxed);
        Ok(())
    }

    fn on_batch_complete(&mut self) -> Result<()> {
        let flushed = self.flush();
        if let Some(sequencer) = &self.context.sequencer {
            sequencer.complete(self.unit);
        }
        flushed
    }

    fn set_tid(&mut self, tid: usize) {
        self.tid = Some(tid);
    }

    fn get_tid(&self) -> Option<usize> {
        self.tid
    }
}

#[cfg(test)]
mod testing {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::fixtures::{random_records, read_records, write_records};
    use crate::ReadError;

    fn names(path: &Path) -> Result<Vec<String>> {
        Ok(read_records(path)?
            .iter()
            .map(|record| record.name().to_string())
            .collect())
    }

    fn record(name: &str, sequence: &[u8]) -> SequenceRecord {
        SequenceRecord::new(name, sequence.to_vec()).with_quality(vec![b'I'; sequence.len()])
    }

    #[test]
    fn test_extract_by_name_keeps_input_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("reads.fq");
        write_records(&input, &random_records(100, "r", 1))?;

        let job = ExtractorJob::builder()
            .input(&input)
            .queries(["r_99", "r_3", "r_42", "absent"])
            .threads(1)
            .build()?;
        let report = Extractor::new(job).run()?;

        let output = dir.path().join("reads-extracted.fastq");
        assert_eq!(report.records_read, 100);
        assert_eq!(report.records_written, 3);
        assert_eq!(report.outputs, vec![output.clone()]);
        assert_eq!(names(&output)?, ["r_3", "r_42", "r_99"]);
        Ok(())
    }

    #[test]
    fn test_demultiplex_by_content() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("reads.fq");
        write_records(
            &input,
            &[
                record("a", b"AAAACCCC"),
                record("b", b"GGGGTTTT"),
                record("c", b"AAAATTTT"),
                record("d", b"CCCCCCCC"),
            ],
        )?;
        let out = dir.path().join("demux");
        fs::create_dir(&out)?;

        let job = ExtractorJob::builder()
            .input(&input)
            .output(&out)
            .queries(["AAAA", "TTTT"])
            .search_in_data(true)
            .demultiplex(true)
            .threads(1)
            .build()?;
        let report = Extractor::new(job).run()?;

        assert_eq!(report.records_written, 3);
        assert_eq!(
            report.outputs,
            vec![out.join("AAAA.fastq"), out.join("TTTT.fastq")]
        );
        assert_eq!(names(&out.join("AAAA.fastq"))?, ["a", "c"]);
        assert_eq!(names(&out.join("TTTT.fastq"))?, ["b"]);
        Ok(())
    }

    #[test]
    fn test_demultiplex_into_missing_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("reads.fq");
        write_records(&input, &random_records(10, "r", 2))?;

        let job = ExtractorJob::builder()
            .input(&input)
            .output(dir.path().join("missing/sample.fq"))
            .query("r_1")
            .demultiplex(true)
            .build()?;
        assert!(matches!(
            Extractor::new(job).run(),
            Err(Error::WriteError(crate::WriteError::DirectoryNotWritable(_)))
        ));
        Ok(())
    }

    #[test]
    fn test_paired_extraction_writes_both_mates() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let r1 = dir.path().join("lane_R1.fq");
        let r2 = dir.path().join("lane_R2.fq");
        write_records(&r1, &random_records(50, "p", 3))?;
        write_records(&r2, &random_records(50, "p", 4))?;

        let output = dir.path().join("pairs.fq");
        let job = ExtractorJob::builder()
            .paired_input(&r1, &r2)
            .output(&output)
            .queries(["p_5", "p_1"])
            .trim_length(20)
            .build()?;
        let report = Extractor::new(job).run()?;

        assert_eq!(report.records_read, 50);
        assert_eq!(report.records_written, 2);
        assert_eq!(report.outputs.len(), 2);
        for path in &report.outputs {
            let records = read_records(path)?;
            assert_eq!(
                records.iter().map(SequenceRecord::name).collect::<Vec<_>>(),
                ["p_1", "p_5"]
            );
            assert!(records.iter().all(|r| r.sequence().len() == 20));
        }
        Ok(())
    }

    #[test]
    fn test_mate_length_mismatch() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let r1 = dir.path().join("lane_R1.fq");
        let r2 = dir.path().join("lane_R2.fq");
        write_records(&r1, &random_records(10, "p", 5))?;
        write_records(&r2, &random_records(5, "p", 6))?;

        let job = ExtractorJob::builder()
            .paired_input(&r1, &r2)
            .query("p_8")
            .build()?;
        assert!(matches!(
            Extractor::new(job).run(),
            Err(Error::ReadError(ReadError::MateExhausted(_)))
        ));
        Ok(())
    }

    #[test]
    fn test_no_matches() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("reads.fa");
        write_records(&input, &random_records(20, "r", 7))?;

        let job = ExtractorJob::builder().input(&input).query("nothing").build()?;
        let mut extractor = Extractor::new(job);
        let err = extractor.run().unwrap_err();
        assert!(matches!(err, Error::NoMatches(1)));
        assert!(!extractor.process());
        Ok(())
    }

    #[test]
    fn test_many_inputs_many_workers() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut job = ExtractorJob::builder()
            .query("*")
            .search_in_data(true)
            .wildcard(true)
            .output(dir.path().join("all.fq"))
            .threads(4);
        for (i, seed) in (10..16).enumerate() {
            let input = dir.path().join(format!("part{i}.fq"));
            write_records(&input, &random_records(1500, &format!("s{i}"), seed))?;
            job = job.input(input);
        }
        let report = Extractor::new(job.build()?).run()?;

        assert_eq!(report.records_read, 9000);
        assert_eq!(report.records_written, 9000);
        let mut extracted = names(&dir.path().join("all.fq"))?;
        extracted.sort_unstable();
        extracted.dedup();
        assert_eq!(extracted.len(), 9000);
        Ok(())
    }

    #[test]
    fn test_progress_and_cancellation() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("reads.fq");
        write_records(&input, &random_records(3000, "r", 8))?;
        let job = ExtractorJob::builder()
            .input(&input)
            .query("r_*")
            .wildcard(true)
            .threads(1)
            .build()?;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut extractor = Extractor::new(job.clone());
        extractor.set_progress_callback(move |p| {
            sink.lock().push(p);
            false
        });
        let report = extractor.run()?;
        assert_eq!(report.records_written, 3000);
        {
            let seen = seen.lock();
            assert_eq!(seen.len(), 3);
            assert!(seen.windows(2).all(|w| w[0] <= w[1]));
            assert!((seen[2] - 100.0).abs() < f32::EPSILON);
        }

        let mut cancelled = Extractor::new(job);
        cancelled.set_progress_callback(|_| true);
        let report = cancelled.run()?;
        assert!(report.cancelled);
        assert_eq!(report.records_written, 1024);
        assert_eq!(read_records(&report.outputs[0])?.len(), 1024);
        Ok(())
    }

    #[test]
    fn test_single_output_keeps_input_order_across_workers() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("all.fq");
        let mut job = ExtractorJob::builder()
            .query("*")
            .search_in_data(true)
            .wildcard(true)
            .output(&output)
            .threads(4);
        let mut expected = Vec::new();
        for i in 0..4 {
            let input = dir.path().join(format!("part{i}.fq"));
            let prefix = format!("s{i}");
            write_records(&input, &random_records(3000, &prefix, 20 + i))?;
            expected.extend((0..3000).map(|n| format!("{prefix}_{n}")));
            job = job.input(input);
        }
        let report = Extractor::new(job.build()?).run()?;

        assert_eq!(report.records_written, 12000);
        assert_eq!(names(&output)?, expected);
        Ok(())
    }

    #[test]
    fn test_illumina_r2_barcodes_route_by_mate() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let r1 = dir.path().join("lane_R1.fq");
        let r2 = dir.path().join("lane_R2.fq");
        let firsts: Vec<_> = (0..6).map(|i| record(&format!("p_{i}"), b"ACGTACGT")).collect();
        let mates: Vec<_> = (0..6)
            .map(|i| {
                let barcode = if i % 2 == 0 { "ACGTAC" } else { "TTTTTT" };
                record(&format!("p_{i}"), b"TTGGCCAA").with_description(format!("2:N:0:{barcode}"))
            })
            .collect();
        write_records(&r1, &firsts)?;
        write_records(&r2, &mates)?;
        let out = dir.path().join("demux");
        fs::create_dir(&out)?;

        let builder = ExtractorJob::builder()
            .paired_input(&r1, &r2)
            .output(&out)
            .query("ACGTAC")
            .demultiplex(true);
        let report = Extractor::new(builder.clone().illumina_r2_barcodes(true).build()?).run()?;

        assert_eq!(report.records_written, 3);
        assert_eq!(
            report.outputs,
            vec![out.join("ACGTAC_R1.fastq"), out.join("ACGTAC_R2.fastq")]
        );
        for path in &report.outputs {
            assert_eq!(names(path)?, ["p_0", "p_2", "p_4"]);
        }

        // read 1 carries no barcode
        assert!(matches!(
            Extractor::new(builder.build()?).run(),
            Err(Error::NoMatches(1))
        ));
        Ok(())
    }

    #[test]
    fn test_pair_dropped_when_one_mate_misses() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let r1 = dir.path().join("lane_R1.fq");
        let r2 = dir.path().join("lane_R2.fq");
        write_records(
            &r1,
            &[
                record("a", b"GATTACAA"),
                record("b", b"GATTACAA"),
                record("c", b"CCCCCCC"),
            ],
        )?;
        write_records(
            &r2,
            &[
                record("a", b"TTTTTTT"),
                record("b", b"AGATTACA"),
                record("c", b"GATTACA"),
            ],
        )?;

        let job = ExtractorJob::builder()
            .paired_input(&r1, &r2)
            .output(dir.path().join("hits.fq"))
            .query("GATTACA")
            .search_in_data(true)
            .build()?;
        let report = Extractor::new(job).run()?;

        assert_eq!(report.records_read, 3);
        assert_eq!(report.records_written, 1);
        assert_eq!(report.outputs.len(), 2);
        for path in &report.outputs {
            assert_eq!(names(path)?, ["b"]);
        }
        Ok(())
    }

    #[test]
    fn test_inputs_sharing_a_key_share_a_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let x = dir.path().join("x.fq");
        let y = dir.path().join("y.fq");
        write_records(&x, &[record("x_0", b"AAAACC"), record("x_1", b"CCAAAA")])?;
        write_records(&y, &[record("y_0", b"GAAAAG"), record("y_1", b"CCCCCC")])?;
        let out = dir.path().join("demux");
        fs::create_dir(&out)?;

        let job = ExtractorJob::builder()
            .input(&x)
            .input(&y)
            .output(&out)
            .query("AAAA")
            .search_in_data(true)
            .demultiplex(true)
            .threads(2)
            .build()?;
        let report = Extractor::new(job).run()?;

        assert_eq!(report.records_written, 3);
        assert_eq!(report.outputs, vec![out.join("AAAA.fastq")]);
        let mut extracted = names(&out.join("AAAA.fastq"))?;
        extracted.sort_unstable();
        assert_eq!(extracted, ["x_0", "x_1", "y_0"]);
        Ok(())
    }

    #[test]
    fn test_keys_with_the_same_file_name_stay_apart() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("reads.fq");
        write_records(&input, &[record("AA_AA", b"CCCC"), record("r1", b"AAGAA")])?;
        let out = dir.path().join("demux");
        fs::create_dir(&out)?;

        let job = ExtractorJob::builder()
            .input(&input)
            .output(&out)
            .queries(["AA_AA", "AA*AA"])
            .search_in_data(true)
            .wildcard(true)
            .demultiplex(true)
            .threads(1)
            .build()?;
        let report = Extractor::new(job).run()?;

        assert_eq!(report.records_written, 2);
        assert_eq!(
            report.outputs,
            vec![out.join("AA_AA.fastq"), out.join("AA_AA_2.fastq")]
        );
        assert_eq!(names(&out.join("AA_AA.fastq"))?, ["AA_AA"]);
        assert_eq!(names(&out.join("AA_AA_2.fastq"))?, ["r1"]);
        Ok(())
    }

    #[test]
    fn test_progress_callback_kept_across_runs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("reads.fq");
        write_records(&input, &random_records(3000, "r", 9))?;
        let job = ExtractorJob::builder()
            .input(&input)
            .query("r_*")
            .wildcard(true)
            .threads(1)
            .build()?;

        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();
        let mut extractor = Extractor::new(job);
        extractor.set_progress_callback(move |_| {
            *counter.lock() += 1;
            false
        });
        extractor.run()?;
        assert_eq!(*calls.lock(), 3);
        assert!(extractor.process());
        assert_eq!(*calls.lock(), 6);
        Ok(())
    }
}
