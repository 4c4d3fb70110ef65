//! Merging and format conversion
//!
//! The [`Converter`] concatenates any number of sequence and alignment inputs
//! into a single FASTA or FASTQ output, remapping quality strings when the
//! input and output encodings differ.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, log};

use crate::{
    error::{ConfigError, ReadError, Result},
    file::{naming, InputSource},
    progress::{
        has_to_update_progress, verbosity, CancelToken, ProgressCallback, ProgressReporter, Report,
    },
    Error, FileFormat, FileKind, QualityEncoding, QualityShift, SequenceWriter, Setting, Settings,
};

/// Suffix of the default output name
const OUTPUT_SUFFIX: &str = "-converted";

/// Merges inputs into one output file
///
/// Sequence inputs are written first, then alignment inputs, each group in the
/// order given.
///
/// # Example
///
/// ```no_run
/// use seqops::{Converter, Setting, Settings};
///
/// let settings = Settings::new()
///     .with(Setting::InputFormat, "fastq-illumina")
///     .with(Setting::OutputFormat, "fastq-sanger");
/// let mut converter = Converter::new(&["old_run.fq"], None, &settings)?;
/// let report = converter.run()?;
/// println!("{} records written", report.records_written);
/// # Ok::<(), seqops::Error>(())
/// ```
pub struct Converter {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    input_format: Option<FileFormat>,
    output_format: FileFormat,
    fastq_conversion: bool,
    verbose: bool,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
}
impl Converter {
    /// Validates the configuration; no file is touched here
    pub fn new<P: AsRef<Path>>(inputs: &[P], output: Option<&Path>, settings: &Settings) -> Result<Self> {
        if inputs.is_empty() {
            return Err(ConfigError::NoInputs.into());
        }
        let output_format = settings
            .output_format()?
            .ok_or(ConfigError::MissingSetting(Setting::OutputFormat.key()))?;
        if output_format.kind() != FileKind::Sequence {
            return Err(ConfigError::UnsupportedOutputFormat(output_format.to_string()).into());
        }
        let input_format = settings.input_format()?;
        let fastq_conversion = match (input_format, output_format) {
            (Some(FileFormat::Fastq(from)), FileFormat::Fastq(to)) => from != to,
            _ => false,
        };

        let inputs: Vec<PathBuf> = inputs.iter().map(|p| p.as_ref().to_path_buf()).collect();
        let output = match output {
            Some(path) => path.to_path_buf(),
            None => naming::derived_output_path(&inputs[0], OUTPUT_SUFFIX, output_format),
        };

        Ok(Self {
            inputs,
            output,
            input_format,
            output_format,
            fastq_conversion,
            verbose: settings.verbose(),
            progress: None,
            cancel: CancelToken::new(),
        })
    }

    /// Installs the progress hook; returning `true` from it cancels the run
    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: FnMut(f32) -> bool + Send + 'static,
    {
        self.progress = Some(Box::new(callback));
    }

    /// A handle that cancels the run from another thread
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Whether FASTQ qualities are remapped between the declared encodings
    #[must_use]
    pub fn fastq_conversion(&self) -> bool {
        self.fastq_conversion
    }

    /// Runs the conversion, logging the outcome; `true` on success or cancellation
    pub fn process(&mut self) -> bool {
        match self.run() {
            Ok(_) => true,
            Err(err) => {
                error!("Conversion into {} failed: {err}", self.output.display());
                false
            }
        }
    }

    /// Runs the conversion
    pub fn run(&mut self) -> Result<Report> {
        let start = Instant::now();
        let sources = self.open_inputs()?;
        let total: u64 = sources.iter().map(InputSource::length).sum();

        log!(
            verbosity(self.verbose),
            "Converting {} input file(s) into {} ({})",
            sources.len(),
            self.output.display(),
            self.output_format
        );

        let shifts: Vec<Option<QualityShift>> =
            sources.iter().map(|source| self.quality_shift(source)).collect();
        let mut writer = SequenceWriter::create(&self.output, self.output_format)?;
        let mut reporter = ProgressReporter::new(self.progress.as_mut(), self.cancel.clone());
        let mut count = 0u64;
        let mut finished_bytes = 0u64;
        let mut cancelled = false;

        'sources: for (mut source, shift) in sources.into_iter().zip(shifts) {
            while let Some(mut record) = source.read_record()? {
                if let Some(shift) = shift.as_ref() {
                    record.shift_quality(shift);
                }
                writer.write(&record)?;
                count += 1;

                if has_to_update_progress(count)
                    && reporter.update(finished_bytes + source.position(), total)
                {
                    cancelled = true;
                    break 'sources;
                }
            }
            finished_bytes += source.length();
        }
        writer.finish()?;

        if !cancelled {
            if count == 0 {
                return Err(Error::EmptyInput);
            }
            reporter.finish();
        }

        let report = Report {
            records_read: count,
            records_written: writer.records_written(),
            outputs: vec![self.output.clone()],
            cancelled,
            elapsed: start.elapsed(),
        };
        report.log_summary("Conversion", self.verbose);
        Ok(report)
    }

    /// Opens and validates every input, sequence sources first
    fn open_inputs(&self) -> Result<Vec<InputSource>> {
        let mut sequences = Vec::new();
        let mut alignments = Vec::new();
        for path in &self.inputs {
            let mut source = InputSource::open(path, self.input_format)?;
            if !source.is_valid()? {
                return Err(ReadError::InvalidFormat {
                    path: path.clone(),
                    format: source.format().to_string(),
                }
                .into());
            }
            match source.kind() {
                FileKind::Sequence => sequences.push(source),
                FileKind::Alignment => alignments.push(source),
            }
        }
        sequences.extend(alignments);
        Ok(sequences)
    }

    /// Quality remapping for the records of `source`, if any
    fn quality_shift(&self, source: &InputSource) -> Option<QualityShift> {
        let to = self.output_format.quality_encoding()?;
        let from = match source.kind() {
            FileKind::Alignment => QualityEncoding::Sanger,
            FileKind::Sequence if self.fastq_conversion => source.quality_encoding()?,
            FileKind::Sequence => return None,
        };
        QualityShift::between(from, to)
    }
}
