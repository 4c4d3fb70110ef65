use std::error::Error as StdError;
use std::path::PathBuf;

/// Custom Result type for seqops operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the seqops library, encompassing all possible error cases
/// that can occur while converting, extracting or splitting sequence files.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors related to missing or invalid settings
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Errors that occur while opening or reading input files
    #[error("Error reading file: {0}")]
    ReadError(#[from] ReadError),

    /// Errors that occur while creating or writing output files
    #[error("Error writing file: {0}")]
    WriteError(#[from] WriteError),

    /// Errors related to unrecognized file extensions or format names
    #[error(transparent)]
    ExtensionError(#[from] ExtensionError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// Errors raised while sniffing or opening a compressed input
    #[error("Error with compressed input: {0}")]
    CompressionError(#[from] niffler::Error),

    /// The inputs were read correctly but did not yield a single record
    #[error("Input file was either empty, or it had an incorrect format")]
    EmptyInput,

    /// The inputs were read correctly but no record matched any query
    #[error("No records matched any of the {0} queries")]
    NoMatches(usize),

    /// Generic errors for other unexpected situations
    #[error("Generic error: {0}")]
    GenericError(#[from] Box<dyn StdError + Send + Sync>),
}
impl Error {
    /// Checks if the error describes a run that completed but produced nothing
    ///
    /// Callers that map outcomes to exit codes can use this to tell an empty
    /// result apart from a genuine I/O or configuration failure.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::NoMatches(_))
    }

    /// Checks if the error was raised before any I/O took place
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_) | Self::ExtensionError(_))
    }
}

/// Errors raised by the [`Settings`](crate::Settings) accessor and engine constructors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required setting was never supplied
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A setting was supplied with a value that cannot be interpreted
    #[error("Invalid value for setting {key}: {value}")]
    InvalidSetting { key: &'static str, value: String },

    /// A setting name that the library does not know about
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    /// A format name that is valid but cannot be produced by this operation
    #[error("Format {0} is not supported as an output format")]
    UnsupportedOutputFormat(String),

    /// More than one split limit was configured
    #[error("Exactly one split limit must be set, found: {0}")]
    AmbiguousSplitLimit(String),

    /// A split limit of zero was configured
    #[error("Split limit must be greater than zero")]
    ZeroLimit,

    /// No input paths were given
    #[error("No input files were provided")]
    NoInputs,

    /// Extraction was requested without any query
    #[error("No queries were provided")]
    NoQueries,

    /// Paired mode was requested with an odd number of inputs
    #[error("Paired mode requires an even number of inputs, found {0}")]
    UnpairedInputs(usize),

    /// Paired mode was requested but an input has no mate
    #[error("Paired mode requires a mate for input {0}")]
    MissingMate(PathBuf),
}

/// Errors that can occur while opening or reading sequence and alignment files
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file could not be opened
    #[error("Unable to open {path}: {source}")]
    CannotOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file does not look like the format it was declared as
    #[error("Input file {path} has an invalid format (expected {format})")]
    InvalidFormat { path: PathBuf, format: String },

    /// A record could not be parsed
    ///
    /// `record` is the zero-based index of the offending record
    #[error("Malformed record {record} in {path}: {reason}")]
    MalformedRecord {
        path: PathBuf,
        record: u64,
        reason: String,
    },

    /// A format that is recognized but cannot be read by this library
    #[error("Reading {0} files is not supported")]
    UnsupportedFormat(String),

    /// An operation that only accepts sequence files was given another kind
    #[error("Expected a sequence file, found {0}")]
    NotASequenceFile(PathBuf),

    /// One mate of a paired input ended before the other
    #[error("Mate files ended at different records: {0} ran out first")]
    MateExhausted(PathBuf),
}

/// Errors that can occur while creating or writing output files
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// The output file could not be created
    #[error("Can't create output file {path}: {source}")]
    CannotCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The directory that should hold demultiplexed outputs is not writable
    #[error("Output directory {0} is not writable")]
    DirectoryNotWritable(PathBuf),
}

#[derive(thiserror::Error, Debug)]
pub enum ExtensionError {
    /// When the extension is not supported
    #[error("Unsupported extension in path: {0}")]
    UnsupportedExtension(String),

    /// When a format name is not supported
    #[error("Unknown format name: {0}")]
    UnknownFormat(String),
}

/// Trait for converting arbitrary errors into `Error`
pub trait IntoSeqopsError {
    fn into_seqops_error(self) -> Error;
}

// Implement conversion for Box<dyn Error>
impl<E> IntoSeqopsError for E
where
    E: StdError + Send + Sync + 'static,
{
    fn into_seqops_error(self) -> Error {
        Error::GenericError(Box::new(self))
    }
}
