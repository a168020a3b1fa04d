use serde::{Deserialize, Serialize};
use std::fmt;

pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
pub const MISSING_FIELD: &str = "MISSING_FIELD";
pub const DECOMPOSITION_PARSE_FAILED: &str = "DECOMPOSITION_PARSE_FAILED";
pub const RETRIEVAL_UNAVAILABLE: &str = "RETRIEVAL_UNAVAILABLE";
pub const JUDGMENT_PARSE_FAILED: &str = "JUDGMENT_PARSE_FAILED";
pub const JUDGMENT_UNAVAILABLE: &str = "JUDGMENT_UNAVAILABLE";
pub const UNKNOWN_DOCUMENT: &str = "UNKNOWN_DOCUMENT";

/// Single structured error shape shared by the core, AI and CLI layers.
///
/// `code` is a stable machine-readable identifier; `retryable` marks transient
/// failures (network, timeouts) that callers may recover from locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(INVALID_ARGUMENT, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.code == INVALID_ARGUMENT
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(d) = self.details.as_deref() {
            write!(f, " ({d})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
