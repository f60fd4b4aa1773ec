use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type CleanResult<T> = Result<T, CleanError>;

/// Error type returned by the cleaning pipeline.
///
/// Configuration problems are *not* reported through this type: they come back as
/// [`crate::config::ValidationIssue`]s inside [`crate::pipeline::PipelineResult::Rejected`].
/// Everything here is fatal for the run that produced it.
#[derive(Debug, Error)]
pub enum CleanError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Workbook read error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "excel")]
    /// Workbook write error (feature-gated behind `excel`).
    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    /// CSV read/write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration document could not be parsed or deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid glob pattern when expanding a batch.
    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// `input_path` or `output_path` missing at execution time.
    #[error("{field} is required to apply operations")]
    MissingPath { field: &'static str },

    /// An operation kind outside the known set reached the executor.
    #[error("Unsupported operation type: {op_type}")]
    UnsupportedOperation { op_type: String },

    /// `date_format` with `errors: raise` met values it could not parse.
    #[error("date_format encountered unparsable values in column '{column}' at rows {rows:?}")]
    DateParse { column: String, rows: Vec<usize> },

    /// A spreadsheet column token contained something other than ASCII letters.
    #[error("Invalid excel column: {token}")]
    InvalidColumnLetter { token: String },

    /// A `regex_replace` pattern failed to compile.
    #[error("invalid regex pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A `regex_replace` replacement template is malformed or names a missing group.
    #[error("invalid replacement '{replacement}': {message}")]
    InvalidReplacement { replacement: String, message: String },

    /// A `date_format` output format is not valid strftime.
    #[error("invalid date output format '{format}'")]
    InvalidDateFormat { format: String },

    /// Storage format could not be determined or is not enabled.
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },

    /// The workbook cannot be represented in the target format.
    #[error("layout error: {message}")]
    Layout { message: String },

    /// The batch worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Two pipelines in one batch would write the same destination.
    #[error("duplicate output path in batch: {}", path.display())]
    DuplicateOutput { path: PathBuf },
}

impl From<tempfile::PersistError> for CleanError {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Io(err.error)
    }
}
