use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    error::{ConfigError, ReadError, Result},
    Setting, Settings,
};

/// One unit of extraction work: an input and, in paired mode, its mate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputUnit {
    pub first: PathBuf,
    pub second: Option<PathBuf>,
}
impl InputUnit {
    pub fn single<P: AsRef<Path>>(path: P) -> Self {
        Self {
            first: path.as_ref().to_path_buf(),
            second: None,
        }
    }

    pub fn paired<P: AsRef<Path>>(first: P, second: P) -> Self {
        Self {
            first: first.as_ref().to_path_buf(),
            second: Some(second.as_ref().to_path_buf()),
        }
    }
}

/// Immutable description of an extraction run
///
/// Build it with [`ExtractorJob::builder`] or from named settings with
/// [`ExtractorJob::from_settings`].
///
/// # Example
///
/// ```
/// use seqops::ExtractorJob;
///
/// let job = ExtractorJob::builder()
///     .paired_input("lane1_R1.fq", "lane1_R2.fq")
///     .queries(["ACGTAC", "TTGACC"])
///     .demultiplex(true)
///     .build()?;
///
/// assert!(job.paired());
/// assert_eq!(job.queries().len(), 2);
/// # Ok::<(), seqops::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExtractorJob {
    inputs: Vec<InputUnit>,
    output: Option<PathBuf>,
    queries: Vec<String>,
    search_in_data: bool,
    wildcard: bool,
    demultiplex: bool,
    paired: bool,
    illumina_r2_barcodes: bool,
    solexa_variant: bool,
    trim_length: usize,
    threads: usize,
    settings: Settings,
}
impl ExtractorJob {
    #[must_use]
    pub fn builder() -> ExtractorJobBuilder {
        ExtractorJobBuilder::default()
    }

    /// Builds a job from flat input paths and named settings
    ///
    /// In paired mode consecutive inputs form mate pairs: `[a_R1, a_R2, b_R1, b_R2]`.
    pub fn from_settings<P: AsRef<Path>>(
        inputs: &[P],
        output: Option<&Path>,
        settings: &Settings,
    ) -> Result<Self> {
        let paired = settings.flag(Setting::Paired)?;
        let mut builder = Self::builder()
            .search_in_data(settings.flag(Setting::SearchInData)?)
            .wildcard(settings.flag(Setting::Wildcard)?)
            .demultiplex(settings.flag(Setting::Demultiplex)?)
            .illumina_r2_barcodes(settings.flag(Setting::IlluminaR2Barcodes)?)
            .solexa_variant(settings.flag(Setting::SolexaVariant)?)
            .trim_length(settings.parse(Setting::TrimLength)?.unwrap_or(0))
            .threads(settings.threads()?)
            .settings(settings.clone());

        if paired {
            if inputs.len() % 2 != 0 {
                return Err(ConfigError::UnpairedInputs(inputs.len()).into());
            }
            for mates in inputs.chunks_exact(2) {
                builder = builder.paired_input(&mates[0], &mates[1]);
            }
        } else {
            for input in inputs {
                builder = builder.input(input);
            }
        }

        if let Some(queries) = settings.get(Setting::Queries) {
            builder = builder.queries(split_queries(queries));
        }
        if let Some(path) = settings.get(Setting::QueriesFile) {
            builder = builder.queries(read_queries_file(Path::new(path))?);
        }
        if let Some(output) = output {
            builder = builder.output(output);
        }
        builder.build()
    }

    #[must_use]
    pub fn inputs(&self) -> &[InputUnit] {
        &self.inputs
    }

    #[must_use]
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    #[must_use]
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    #[must_use]
    pub fn search_in_data(&self) -> bool {
        self.search_in_data
    }

    #[must_use]
    pub fn wildcard(&self) -> bool {
        self.wildcard
    }

    #[must_use]
    pub fn demultiplex(&self) -> bool {
        self.demultiplex
    }

    #[must_use]
    pub fn paired(&self) -> bool {
        self.paired
    }

    #[must_use]
    pub fn illumina_r2_barcodes(&self) -> bool {
        self.illumina_r2_barcodes
    }

    #[must_use]
    pub fn solexa_variant(&self) -> bool {
        self.solexa_variant
    }

    /// Maximum length of extracted sequences, 0 meaning untrimmed
    #[must_use]
    pub fn trim_length(&self) -> usize {
        self.trim_length
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// Splits a `queries` setting on commas and newlines
fn split_queries(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads one query per line, ignoring blank lines and `#` comments
fn read_queries_file(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|source| ReadError::CannotOpen {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Builder for [`ExtractorJob`]
#[derive(Debug, Clone, Default)]
pub struct ExtractorJobBuilder {
    inputs: Vec<InputUnit>,
    output: Option<PathBuf>,
    queries: Vec<String>,
    search_in_data: bool,
    wildcard: bool,
    demultiplex: bool,
    paired: bool,
    illumina_r2_barcodes: bool,
    solexa_variant: bool,
    trim_length: usize,
    threads: usize,
    settings: Settings,
}
impl ExtractorJobBuilder {
    #[must_use]
    pub fn input<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inputs.push(InputUnit::single(path));
        self
    }

    /// Adds a mate pair; this switches the job to paired mode
    #[must_use]
    pub fn paired_input<P: AsRef<Path>>(mut self, first: P, second: P) -> Self {
        self.inputs.push(InputUnit::paired(first, second));
        self.paired = true;
        self
    }

    #[must_use]
    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.queries.push(query.into());
        self
    }

    #[must_use]
    pub fn queries<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queries.extend(queries.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn search_in_data(mut self, search_in_data: bool) -> Self {
        self.search_in_data = search_in_data;
        self
    }

    #[must_use]
    pub fn wildcard(mut self, wildcard: bool) -> Self {
        self.wildcard = wildcard;
        self
    }

    #[must_use]
    pub fn demultiplex(mut self, demultiplex: bool) -> Self {
        self.demultiplex = demultiplex;
        self
    }

    #[must_use]
    pub fn paired(mut self, paired: bool) -> Self {
        self.paired = paired;
        self
    }

    #[must_use]
    pub fn illumina_r2_barcodes(mut self, illumina_r2_barcodes: bool) -> Self {
        self.illumina_r2_barcodes = illumina_r2_barcodes;
        self
    }

    #[must_use]
    pub fn solexa_variant(mut self, solexa_variant: bool) -> Self {
        self.solexa_variant = solexa_variant;
        self
    }

    #[must_use]
    pub fn trim_length(mut self, trim_length: usize) -> Self {
        self.trim_length = trim_length;
        self
    }

    /// Number of worker threads (0 = all cores)
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<ExtractorJob> {
        if self.inputs.is_empty() {
            return Err(ConfigError::NoInputs.into());
        }
        if self.queries.iter().all(String::is_empty) {
            return Err(ConfigError::NoQueries.into());
        }
        if self.paired {
            if let Some(unit) = self.inputs.iter().find(|unit| unit.second.is_none()) {
                return Err(ConfigError::MissingMate(unit.first.clone()).into());
            }
        }
        Ok(ExtractorJob {
            inputs: self.inputs,
            output: self.output,
            queries: self.queries,
            search_in_data: self.search_in_data,
            wildcard: self.wildcard,
            demultiplex: self.demultiplex,
            paired: self.paired,
            illumina_r2_barcodes: self.illumina_r2_barcodes,
            solexa_variant: self.solexa_variant,
            trim_length: self.trim_length,
            threads: self.threads,
            settings: self.settings,
        })
    }
}
