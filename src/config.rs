//! Named settings consumed by the engines
//!
//! [`Settings`] stands in for the command-line flags of a front end: a flat map
//! from a known [`Setting`] key to its raw string value. Engines read what they
//! need through typed getters, and an absent setting is always an explicit
//! `None` or a [`ConfigError::MissingSetting`], never undefined behavior.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::{
    error::{ConfigError, Result},
    FileFormat,
};

/// Every setting key understood by the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// Declared format of the inputs, e.g. `fastq-illumina`
    InputFormat,
    /// Requested format of the output, e.g. `fastq-sanger`
    OutputFormat,
    /// Log banners and summaries at `info` level
    Verbose,
    /// Number of worker threads (0 = all cores)
    Threads,
    /// Extraction queries separated by commas or newlines
    Queries,
    /// File holding one extraction query per line
    QueriesFile,
    /// Match queries against sequence content instead of record names
    SearchInData,
    /// Allow `*` wildcards and substring matches in queries
    Wildcard,
    /// Write one output per matched query
    Demultiplex,
    /// Treat consecutive inputs as read-1 / read-2 mates
    Paired,
    /// Maximum sequence length of extracted records
    TrimLength,
    /// Illumina barcodes are found in read-2 headers
    IlluminaR2Barcodes,
    /// Inputs use Solexa quality scores
    SolexaVariant,
    /// Maximum records per split output
    RecordLimit,
    /// Number of split outputs
    FileLimit,
    /// Maximum bytes per split output
    SizeLimit,
}
impl Setting {
    pub const ALL: [Setting; 16] = [
        Self::InputFormat,
        Self::OutputFormat,
        Self::Verbose,
        Self::Threads,
        Self::Queries,
        Self::QueriesFile,
        Self::SearchInData,
        Self::Wildcard,
        Self::Demultiplex,
        Self::Paired,
        Self::TrimLength,
        Self::IlluminaR2Barcodes,
        Self::SolexaVariant,
        Self::RecordLimit,
        Self::FileLimit,
        Self::SizeLimit,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::InputFormat => "input-format",
            Self::OutputFormat => "output-format",
            Self::Verbose => "verbose",
            Self::Threads => "threads",
            Self::Queries => "queries",
            Self::QueriesFile => "queries-file",
            Self::SearchInData => "search-in-data",
            Self::Wildcard => "wildcard",
            Self::Demultiplex => "demultiplex",
            Self::Paired => "paired",
            Self::TrimLength => "trim-length",
            Self::IlluminaR2Barcodes => "illumina-r2-barcodes",
            Self::SolexaVariant => "solexa",
            Self::RecordLimit => "record-limit",
            Self::FileLimit => "file-limit",
            Self::SizeLimit => "size-limit",
        }
    }
}
impl FromStr for Setting {
    type Err = ConfigError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = s.trim_start_matches('-');
        Self::ALL
            .into_iter()
            .find(|setting| setting.key() == key)
            .ok_or_else(|| ConfigError::UnknownSetting(s.to_string()))
    }
}
impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Accessor over named configuration values
///
/// # Example
///
/// ```
/// use seqops::{Setting, Settings};
///
/// let settings = Settings::new()
///     .with(Setting::OutputFormat, "fastq-illumina")
///     .with(Setting::Verbose, "true");
///
/// assert!(settings.verbose());
/// assert_eq!(settings.get(Setting::OutputFormat), Some("fastq-illumina"));
/// assert!(settings.get(Setting::InputFormat).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<Setting, String>,
}
impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds settings from raw `(key, value)` pairs, rejecting unknown keys
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Self::new();
        for (key, value) in pairs {
            let setting: Setting = key.as_ref().parse()?;
            settings.set(setting, value);
        }
        Ok(settings)
    }

    /// Sets a value and returns the settings (builder style)
    #[must_use]
    pub fn with(mut self, setting: Setting, value: impl Into<String>) -> Self {
        self.set(setting, value);
        self
    }

    pub fn set(&mut self, setting: Setting, value: impl Into<String>) {
        self.values.insert(setting, value.into());
    }

    pub fn unset(&mut self, setting: Setting) {
        self.values.remove(&setting);
    }

    #[must_use]
    pub fn contains(&self, setting: Setting) -> bool {
        self.values.contains_key(&setting)
    }

    /// Raw value of a setting, `None` if it was never supplied
    #[must_use]
    pub fn get(&self, setting: Setting) -> Option<&str> {
        self.values.get(&setting).map(String::as_str)
    }

    /// Raw value of a setting that must be present
    pub fn require(&self, setting: Setting) -> Result<&str> {
        self.get(setting)
            .ok_or_else(|| ConfigError::MissingSetting(setting.key()).into())
    }

    /// Parses a setting into `T`, `None` if it was never supplied
    pub fn parse<T: FromStr>(&self, setting: Setting) -> Result<Option<T>> {
        let Some(value) = self.get(setting) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(setting, value))
    }

    /// Interprets a boolean flag; an absent flag is `false`
    pub fn flag(&self, setting: Setting) -> Result<bool> {
        let Some(value) = self.get(setting) else {
            return Ok(false);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(invalid(setting, value)),
        }
    }

    /// Whether banners and summaries are logged at `info` level
    ///
    /// An unparsable value is treated as quiet.
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.flag(Setting::Verbose).unwrap_or(false)
    }

    /// Number of worker threads, 0 meaning "all available cores"
    pub fn threads(&self) -> Result<usize> {
        Ok(self.parse(Setting::Threads)?.unwrap_or(0))
    }

    /// The declared input format, if any
    pub fn input_format(&self) -> Result<Option<FileFormat>> {
        self.format(Setting::InputFormat)
    }

    /// The declared output format, if any
    pub fn output_format(&self) -> Result<Option<FileFormat>> {
        self.format(Setting::OutputFormat)
    }

    fn format(&self, setting: Setting) -> Result<Option<FileFormat>> {
        match self.get(setting) {
            Some(name) => Ok(Some(name.trim().parse()?)),
            None => Ok(None),
        }
    }
}

fn invalid(setting: Setting, value: &str) -> crate::Error {
    ConfigError::InvalidSetting {
        key: setting.key(),
        value: value.to_string(),
    }
    .into()
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{Error, QualityEncoding};

    #[test]
    fn test_setting_keys_roundtrip() -> Result<()> {
        for setting in Setting::ALL {
            assert_eq!(setting.key().parse::<Setting>()?, setting);
        }
        assert_eq!("--output-format".parse::<Setting>()?, Setting::OutputFormat);
        assert!("not-a-setting".parse::<Setting>().is_err());
        Ok(())
    }

    #[test]
    fn test_require_missing() {
        let settings = Settings::new();
        let err = settings.require(Setting::OutputFormat).unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigError(ConfigError::MissingSetting("output-format"))
        ));
    }

    #[test]
    fn test_flags() -> Result<()> {
        let settings = Settings::new()
            .with(Setting::Wildcard, "")
            .with(Setting::Paired, "no")
            .with(Setting::Demultiplex, "YES")
            .with(Setting::SearchInData, "maybe");
        assert!(settings.flag(Setting::Wildcard)?);
        assert!(!settings.flag(Setting::Paired)?);
        assert!(settings.flag(Setting::Demultiplex)?);
        assert!(!settings.flag(Setting::SolexaVariant)?);
        assert!(settings.flag(Setting::SearchInData).is_err());
        Ok(())
    }

    #[test]
    fn test_parse_numbers() -> Result<()> {
        let settings = Settings::new()
            .with(Setting::TrimLength, " 50 ")
            .with(Setting::RecordLimit, "ten");
        assert_eq!(settings.parse::<usize>(Setting::TrimLength)?, Some(50));
        assert_eq!(settings.parse::<usize>(Setting::FileLimit)?, None);
        assert!(settings.parse::<usize>(Setting::RecordLimit).is_err());
        assert_eq!(settings.threads()?, 0);
        Ok(())
    }

    #[test]
    fn test_formats() -> Result<()> {
        let settings = Settings::new()
            .with(Setting::InputFormat, "fastq-solexa")
            .with(Setting::OutputFormat, "fastq");
        assert_eq!(
            settings.input_format()?,
            Some(FileFormat::Fastq(QualityEncoding::Solexa))
        );
        assert_eq!(
            settings.output_format()?,
            Some(FileFormat::Fastq(QualityEncoding::Sanger))
        );

        let bad = Settings::new().with(Setting::OutputFormat, "genbank");
        assert!(bad.output_format().is_err());
        Ok(())
    }

    #[test]
    fn test_from_pairs() -> Result<()> {
        let settings = Settings::from_pairs([("output-format", "fasta"), ("verbose", "1")])?;
        assert!(settings.verbose());
        assert_eq!(settings.output_format()?, Some(FileFormat::Fasta));
        assert!(Settings::from_pairs([("colour", "blue")]).is_err());
        Ok(())
    }
}
