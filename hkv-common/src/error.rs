//! # Error Types
//!
//! Purpose: Give façade callers one error vocabulary regardless of which
//! driver executed the command.
//!
//! ## Design Principles
//! 1. **Uniform Failure Signal**: Driver failures of any origin arrive as
//!    `ClientError::DataAccess`; the driver's own error type never escapes.
//! 2. **Fail Fast**: Argument problems are reported before anything is sent.
//! 3. **Cloneable**: Errors carry owned strings so pipelined results can be
//!    stored and handed out later.

use thiserror::Error;

/// Result type returned by every façade operation.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type returned by converters.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Failure raised while mapping a raw driver value into a domain type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The raw value did not have the shape the converter expects.
    #[error("expected {expected}, got {actual}")]
    UnexpectedShape {
        expected: &'static str,
        actual: String,
    },
    /// A textual value could not be decoded as UTF-8.
    #[error("invalid utf-8 in {0}")]
    InvalidUtf8(&'static str),
    /// A numeric value could not be parsed or was out of range.
    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

/// Errors surfaced by the client façade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A required argument was missing or malformed; nothing was dispatched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The command failed inside the driver (I/O, timeout, server error...).
    #[error("data access failure: {message}")]
    DataAccess { message: String },
    /// The raw result could not be converted into the requested type.
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),
    /// A pipelined result was read before the pipeline was closed.
    #[error("result is not available before the pipeline is closed")]
    NotFlushed,
    /// The pipeline holding this result was discarded.
    #[error("pipeline was discarded before the result was resolved")]
    PipelineDiscarded,
    /// The pipelined result was already taken through another read.
    #[error("pipelined result was already taken")]
    ResultTaken,
    /// `open_pipeline` was called while a pipeline is already open.
    #[error("pipeline is already open")]
    PipelineAlreadyOpen,
    /// Some pipelined commands failed; each handle holds its own outcome.
    #[error("{failed} of {total} pipelined commands failed")]
    Pipeline { failed: usize, total: usize },
    /// Client configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Builds an `InvalidArgument` error from a message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ClientError::InvalidArgument(message.into())
    }

    /// Builds the uniform driver failure from any displayable cause.
    pub fn data_access(cause: impl std::fmt::Display) -> Self {
        ClientError::DataAccess {
            message: cause.to_string(),
        }
    }
}
