//! Error types for the drugload uploaders.
//!
//! - [`ParseError`] - Reading resolved records from disk
//! - [`InputContractError`] - A raw record is missing a required field
//! - [`MalformedEntryError`] - A SIDER side-effect entry cannot be ranked
//! - [`TransformError`] - Either of the two above, raised by a transform
//! - [`ConfigError`] - Invalid environment overrides
//! - [`PipelineError`] - Top-level upload run errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::fmt;
use thiserror::Error;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors while reading resolved records.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Content could not be decoded with the detected encoding.
    #[error("Failed to decode input as {encoding}: {message}")]
    Encoding { encoding: String, message: String },

    /// Malformed JSON record.
    #[error("Invalid JSON at line {line}, column {column}: {message}")]
    Json {
        line: usize,
        column: usize,
        message: String,
    },

    /// Malformed delimited text.
    #[error("Invalid delimited text: {0}")]
    Delimited(#[from] csv::Error),

    /// A JSON document that is not an object where a record was expected.
    #[error("Record {index} is not a JSON object")]
    NotAnObject { index: usize },

    /// Empty input.
    #[error("Input is empty")]
    EmptyInput,

    /// No header row in delimited text.
    #[error("No headers found in delimited input")]
    NoHeaders,
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Io => ParseError::Io(err.into()),
            _ => ParseError::Json {
                line: err.line(),
                column: err.column(),
                message: err.to_string(),
            },
        }
    }
}

// =============================================================================
// Input Contract Errors
// =============================================================================

/// What is wrong with a required field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractProblem {
    /// The field is absent or null.
    Missing,
    /// The field is present with an unexpected JSON type.
    WrongType { expected: &'static str },
}

impl fmt::Display for ContractProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractProblem::Missing => write!(f, "missing"),
            ContractProblem::WrongType { expected } => write!(f, "expected {}", expected),
        }
    }
}

/// A raw record violates the upstream contract (required field missing or mistyped).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Record {index}: field '{field}' {problem}")]
pub struct InputContractError {
    /// 0-based position of the record in the input sequence.
    pub index: usize,
    pub field: &'static str,
    pub problem: ContractProblem,
}

impl InputContractError {
    pub fn missing(index: usize, field: &'static str) -> Self {
        Self {
            index,
            field,
            problem: ContractProblem::Missing,
        }
    }

    pub fn wrong_type(index: usize, field: &'static str, expected: &'static str) -> Self {
        Self {
            index,
            field,
            problem: ContractProblem::WrongType { expected },
        }
    }
}

// =============================================================================
// SIDER Entry Errors
// =============================================================================

/// Why a side-effect entry has no sort key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryDefect {
    #[error("entry is not an object")]
    NotAnObject,

    #[error("missing side_effect.frequency")]
    MissingFrequency,

    #[error("missing side_effect.name")]
    MissingName,

    #[error("unrecognized frequency '{0}'")]
    UnknownFrequency(String),
}

/// A SIDER side-effect entry that cannot be ranked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Document '{id}': side-effect entry {entry}: {defect}")]
pub struct MalformedEntryError {
    /// `_id` of the parent document.
    pub id: String,
    /// Position of the entry in the unsorted input list.
    pub entry: usize,
    pub defect: EntryDefect,
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors raised by the NDC and SIDER transforms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error(transparent)]
    InputContract(#[from] InputContractError),

    #[error(transparent)]
    MalformedEntry(#[from] MalformedEntryError),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({message})")]
    InvalidValue {
        var: &'static str,
        value: String,
        message: String,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level upload run errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_upload`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Audit file error: {0}")]
    Audit(#[from] csv::Error),
}

impl From<InputContractError> for PipelineError {
    fn from(err: InputContractError) -> Self {
        PipelineError::Transform(err.into())
    }
}

impl From<MalformedEntryError> for PipelineError {
    fn from(err: MalformedEntryError) -> Self {
        PipelineError::Transform(err.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for upload runs.
pub type PipelineResult<T> = Result<T, PipelineError>;
