use client::ClientError;
use thiserror::Error;

/// A response that did not meet an expectation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct AssertionError {
    pub message: String,
}

impl AssertionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type AssertResult = Result<(), AssertionError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Assertion failed: {0}")]
    Assertion(#[from] AssertionError),

    #[error("Precondition not met: {message}")]
    Precondition { message: String },

    #[error("Suite not found: {name}")]
    SuiteNotFound { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

impl HarnessError {
    pub fn precondition(message: impl Into<String>) -> Self {
        HarnessError::Precondition {
            message: message.into(),
        }
    }

    /// Errors that mean the case could not run, as opposed to a failed check.
    pub fn is_skip(&self) -> bool {
        match self {
            HarnessError::Precondition { .. } => true,
            HarnessError::Client(e) => e.is_unavailable(),
            _ => false,
        }
    }
}
