//! Error handling for caster.
//! Defines the error type and result alias used by every stage of the pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, rendering, parsing or materializing
/// a caster document.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic I/O failure, such as writing the interpolated document to stdout.
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Invalid request or command line configuration.
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// The template path given on the request does not exist.
    #[error("Template '{path}' does not exist.")]
    SourceNotFoundError { path: PathBuf },

    /// The template directory has no `.caster.(yml|yaml|json)` file.
    #[error("Template folder '{directory}' is missing a .caster.(yml|yaml|json) file.")]
    SourceMissingCasterFileError { directory: PathBuf },

    /// The template directory has more than one caster file.
    #[error("Template folder '{directory}' contains more than one caster file: {}.", .candidates.join(", "))]
    SourceAmbiguousError {
        directory: PathBuf,
        candidates: Vec<String>,
    },

    /// A `--var-file` could not be read.
    #[error("Cannot read variable file '{path}': {source}.")]
    VariableFileReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A `--var-file` is not a key/value document.
    #[error("Cannot decode variable file '{path}': {source}.")]
    VariableFileDecodeError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Template parsing or execution failed, possibly inside a composed file.
    #[error("Template error: {source}.")]
    TemplateError {
        /// Name of the template that failed (the caster file or a composed file).
        name: String,
        /// Line in `name` where the failure occurred, when known.
        line: Option<usize>,
        #[source]
        source: minijinja::Error,
    },

    /// The caster file extension is neither YAML nor JSON.
    #[error("Unsupported document format '{extension}', expected yml, yaml or json.")]
    UnsupportedFormatError { extension: String },

    /// The rendered YAML document does not match the caster document shape.
    #[error("Cannot decode YAML document: {0}.")]
    YamlDecodeError(#[source] serde_yaml::Error),

    /// The parsed document could not be written back as YAML.
    #[error("Cannot encode document as YAML: {0}.")]
    YamlEncodeError(#[source] serde_yaml::Error),

    /// The rendered JSON document does not match the caster document shape.
    #[error("Cannot decode JSON document: {0}.")]
    JsonDecodeError(#[source] serde_json::Error),

    /// A storage operation failed while materializing the tree.
    #[error("Storage error at '{path}': {source}.")]
    StorageError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wraps a storage failure with the path it happened at.
    pub fn storage<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Error::StorageError { path: path.into(), source }
    }
}

impl From<minijinja::Error> for Error {
    fn from(source: minijinja::Error) -> Self {
        Error::TemplateError {
            name: source.name().unwrap_or_default().to_string(),
            line: source.line(),
            source,
        }
    }
}

/// Convenience type alias for Results with caster's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error with its causes and exits.
///
/// # Behavior
/// Prints the error and every `source()` below it to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    std::process::exit(1);
}
