//! Error types for the check.

use thiserror::Error;

/// Message printed when InfluxDB answers with an empty body.
pub const EMPTY_ANSWER: &str =
    "Received empty answer! This happens when the query does not match any data.";

/// Errors raised while validating the command line into a [crate::config::Config].
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("--fieldcon is required when more than one --field is given")]
    MissingFieldCombinator,

    #[error("invalid tag '{0}', expected KEY=VALUE")]
    InvalidTag(String),

    #[error("tag '{0}' given more than once")]
    DuplicateTag(String),

    #[error("invalid period '{0}', expected a duration literal like 5m or 1h30m")]
    InvalidPeriod(String),

    #[error("invalid aggregate function '{0}'")]
    InvalidAggregate(String),

    #[error("{name} threshold must be a finite number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Everything that can go wrong after startup. Each variant ends up as an UNKNOWN status line.
#[derive(Error, Debug)]
pub enum CheckError {
    /// The request failed; the payload is the raw diagnostic text.
    #[error("{0}")]
    Transport(String),

    #[error("{}", EMPTY_ANSWER)]
    EmptyResponse,

    #[error("malformed CSV in response: {0}")]
    MalformedCsv(#[from] csv::Error),

    /// InfluxDB answered with an error table instead of data.
    #[error("query failed: {0}")]
    Query(String),

    #[error("response has no header row")]
    MissingHeader,

    #[error("response is missing the {0} column")]
    MissingColumn(&'static str),

    #[error("response row {row} has no cell for {column}")]
    MissingCell { row: usize, column: &'static str },

    #[error("response contains no data rows")]
    NoData,

    #[error("cannot parse value '{value}' in row {row} as a number")]
    InvalidNumber { row: usize, value: String },
}

/// Result type for check operations.
pub type Result<T> = std::result::Result<T, CheckError>;
