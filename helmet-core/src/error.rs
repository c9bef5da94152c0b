use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("required input file not found: {0}")]
    MissingInput(String),
    #[error("{}:{line}: {message}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("raster error: {0}")]
    RasterError(String),
    #[error("height job failed: {0}")]
    HeightError(String),
    #[error("zones already split: {0}")]
    AlreadySplit(String),
    #[error("conflicting options: {0}")]
    ConflictingOptions(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidData(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::NetworkError(e.to_string())
    }
}

impl Error {
    /// Parse error pointing at a concrete line of an input file.
    pub(crate) fn parse(file: &std::path::Path, line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            file: file.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}
