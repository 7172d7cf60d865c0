//! Errors
//!
//! Custom error types used throughout the `id3tree` crate.
use thiserror::Error;

/// Errors that can occur while inducing, encoding or persisting a tree.
#[derive(Debug, Error)]
pub enum Id3Error {
    /// The design matrix and the label vector disagree on the number of rows.
    #[error("Shape mismatch: the design matrix has {0} rows, but {1} labels were provided.")]
    ShapeMismatch(usize, usize),
    /// There are no rows to learn from.
    #[error("Unable to fit on an empty data set.")]
    EmptyInput,
    /// A feature or label code is not an integer.
    #[error("Invalid code {value} found in {location}, codes must be finite integers.")]
    InvalidCode { value: f64, location: String },
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// The nodes and edges matrices do not describe a valid tree.
    #[error("Malformed tree matrices: {0}")]
    MalformedTree(String),
    /// Unable to write a matrix or model to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read a matrix or model from file.
    #[error("Unable to read from file: {0}")]
    UnableToRead(String),
    /// The worker pool could not be created.
    #[error("Unable to build thread pool: {0}")]
    ThreadPool(String),
}
