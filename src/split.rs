//! Splitting one sequence file into bounded pieces

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, log};

use crate::{
    error::{ConfigError, ReadError, Result},
    file::{naming, resolve_format, SequenceReader},
    progress::{
        has_to_update_progress, verbosity, CancelToken, ProgressCallback, ProgressReporter, Report,
    },
    Error, FileFormat, SequenceWriter, Setting, Settings,
};

/// Suffix of the default output base name
const OUTPUT_SUFFIX: &str = "-split";

/// The bound applied to every output piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitLimit {
    /// At most this many records per output
    Records(u64),
    /// Exactly this many outputs (fewer if there are fewer records)
    Files(u64),
    /// At most this many bytes per output, unless a single record is larger
    Bytes(u64),
}
impl SplitLimit {
    /// Reads the single configured limit out of the settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let candidates: [(Setting, fn(u64) -> Self); 3] = [
            (Setting::RecordLimit, Self::Records),
            (Setting::FileLimit, Self::Files),
            (Setting::SizeLimit, Self::Bytes),
        ];
        let mut found = Vec::with_capacity(1);
        for (setting, limit) in candidates {
            if let Some(value) = settings.parse::<u64>(setting)? {
                found.push((setting, limit(value)));
            }
        }
        match found.as_slice() {
            [] => Err(ConfigError::MissingSetting("record-limit | file-limit | size-limit").into()),
            [(_, limit)] => limit.validated(),
            many => {
                let keys: Vec<&str> = many.iter().map(|(setting, _)| setting.key()).collect();
                Err(ConfigError::AmbiguousSplitLimit(keys.join(", ")).into())
            }
        }
    }

    #[must_use]
    pub fn value(self) -> u64 {
        match self {
            Self::Records(n) | Self::Files(n) | Self::Bytes(n) => n,
        }
    }

    fn validated(self) -> Result<Self> {
        if self.value() == 0 {
            Err(ConfigError::ZeroLimit.into())
        } else {
            Ok(self)
        }
    }
}
impl fmt::Display for SplitLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Records(n) => write!(f, "{n} records per file"),
            Self::Files(n) => write!(f, "{n} files"),
            Self::Bytes(n) => write!(f, "{n} bytes per file"),
        }
    }
}

/// When to start a new output, resolved once the record count is known
#[derive(Debug, Clone, Copy)]
enum Rollover {
    Records(u64),
    /// `per` records in each file except the last one, which takes the rest
    Even { per: u64, files: u64 },
    Bytes(u64),
}
impl Rollover {
    /// Whether `next` bytes must go to a new file, given the current file state
    fn is_full(self, index: u64, records: u64, bytes: u64, next: u64) -> bool {
        match self {
            Self::Records(limit) => records >= limit,
            Self::Even { per, files } => index < files && records >= per,
            Self::Bytes(limit) => records > 0 && bytes + next > limit,
        }
    }
}

/// Splits a sequence file into numbered outputs `<base>_1.<ext>`, `<base>_2.<ext>`, ...
///
/// # Example
///
/// ```no_run
/// use seqops::{SplitLimit, Splitter, Settings};
///
/// let mut splitter = Splitter::new("reads.fq", None, SplitLimit::Records(1_000_000), &Settings::new())?;
/// let report = splitter.run()?;
/// println!("wrote {} files", report.outputs.len());
/// # Ok::<(), seqops::Error>(())
/// ```
pub struct Splitter {
    input: PathBuf,
    base: PathBuf,
    format: FileFormat,
    limit: SplitLimit,
    verbose: bool,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
}
impl Splitter {
    pub fn new<P: AsRef<Path>>(
        input: P,
        output: Option<&Path>,
        limit: SplitLimit,
        settings: &Settings,
    ) -> Result<Self> {
        let input = input.as_ref().to_path_buf();
        let limit = limit.validated()?;
        let format = resolve_format(&input, settings.input_format()?)?;
        let base = match output {
            Some(path) => path.to_path_buf(),
            None => naming::derived_output_path(&input, OUTPUT_SUFFIX, format),
        };
        Ok(Self {
            input,
            base,
            format,
            limit,
            verbose: settings.verbose(),
            progress: None,
            cancel: CancelToken::new(),
        })
    }

    /// Builds a splitter whose limit comes from `record-limit`, `file-limit` or `size-limit`
    pub fn from_settings<P: AsRef<Path>>(input: P, output: Option<&Path>, settings: &Settings) -> Result<Self> {
        Self::new(input, output, SplitLimit::from_settings(settings)?, settings)
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

    #[must_use]
    pub fn limit(&self) -> SplitLimit {
        self.limit
    }

    /// Path of the `index`-th output (one-based)
    #[must_use]
    pub fn output_path(&self, index: u64) -> PathBuf {
        naming::numbered(&self.base, index as usize)
    }

    /// Runs the split, logging the outcome; `true` on success or cancellation
    pub fn process(&mut self) -> bool {
        match self.run() {
            Ok(_) => true,
            Err(err) => {
                error!("Splitting {} failed: {err}", self.input.display());
                false
            }
        }
    }

    pub fn run(&mut self) -> Result<Report> {
        let start = Instant::now();
        let mut reader = self.open_input()?;
        let rollover = match self.limit {
            SplitLimit::Records(n) => Rollover::Records(n),
            SplitLimit::Bytes(n) => Rollover::Bytes(n),
            SplitLimit::Files(files) => {
                let total = self.count_records()?;
                if total == 0 {
                    return Err(Error::EmptyInput);
                }
                Rollover::Even {
                    per: (total / files).max(1),
                    files: files.min(total),
                }
            }
        };
        log!(
            verbosity(self.verbose),
            "Splitting {} into {}",
            self.input.display(),
            self.limit
        );

        let total = reader.length();
        let mut reporter = ProgressReporter::new(self.progress.as_mut(), self.cancel.clone());
        let mut outputs = Vec::new();
        let mut writer: Option<SequenceWriter> = None;
        let mut in_file = 0u64;
        let mut count = 0u64;
        let mut written = 0u64;
        let mut cancelled = false;

        while let Some(record) = reader.read()? {
            let next = record.encoded_len(self.format) as u64;
            let rollover_due = match writer.as_ref() {
                None => true,
                Some(current) => {
                    rollover.is_full(outputs.len() as u64, in_file, current.bytes_written(), next)
                }
            };
            if rollover_due {
                if let Some(mut full) = writer.take() {
                    full.finish()?;
                    written += full.records_written();
                }
                let path = naming::numbered(&self.base, outputs.len() + 1);
                writer = Some(SequenceWriter::create(&path, self.format)?);
                outputs.push(path);
                in_file = 0;
            }
            if let Some(current) = writer.as_mut() {
                current.write(&record)?;
            }
            in_file += 1;
            count += 1;

            if has_to_update_progress(count) && reporter.update(reader.position(), total) {
                cancelled = true;
                break;
            }
        }
        if let Some(mut last) = writer.take() {
            last.finish()?;
            written += last.records_written();
        }

        if !cancelled {
            if count == 0 {
                return Err(Error::EmptyInput);
            }
            reporter.finish();
        }

        let report = Report {
            records_read: count,
            records_written: written,
            outputs,
            cancelled,
            elapsed: start.elapsed(),
        };
        report.log_summary("Split", self.verbose);
        Ok(report)
    }

    fn open_input(&self) -> Result<SequenceReader> {
        let mut reader = SequenceReader::open(&self.input, self.format)?;
        if !reader.is_valid()? {
            return Err(ReadError::InvalidFormat {
                path: self.input.clone(),
                format: self.format.to_string(),
            }
            .into());
        }
        Ok(reader)
    }

    /// Streaming pre-pass counting the records of the input
    fn count_records(&self) -> Result<u64> {
        let mut reader = SequenceReader::open(&self.input, self.format)?;
        while reader.read()?.is_some() {}
        Ok(reader.records_read())
    }
}
