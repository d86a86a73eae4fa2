//! Error types for loading, trimming and exporting absorbance data.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// File name does not follow the scan naming convention.
    /// Recovered by the loader: the file is skipped.
    #[error("malformed scan file name: {0}")]
    MalformedFilename(String),

    /// File body has no usable data rows.
    /// Recovered by the loader: the file is skipped.
    #[error("malformed scan file body: {0}")]
    MalformedBody(String),

    /// Two different run ids in one load. The load is aborted.
    #[error("more than one run id found: {first} and {second}")]
    RunIdConflict { first: String, second: String },

    #[error("no scan files found in {}", .0.display())]
    EmptyDataset(PathBuf),

    #[error("no integral profiles to export")]
    NoIntegralData,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
