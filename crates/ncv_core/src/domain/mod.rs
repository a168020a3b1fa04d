use serde::{Deserialize, Serialize};

/// A source novel. Immutable once loaded; `document_id` is the identity used by
/// retrieval filters (the file stem when loaded from a corpus directory).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub document_id: String,
    pub text: String,
}

impl Document {
    pub fn new(document_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            text: text.into(),
        }
    }
}

/// One row of batch input: a backstory to check against a named source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackstoryRecord {
    pub story_id: String,
    pub backstory: String,
    pub document_id: String,
}

/// Story-level verdict. Serialized as the binary label used in batch output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Inconsistent,
    Consistent,
}

impl Prediction {
    pub fn label(self) -> u8 {
        match self {
            Prediction::Inconsistent => 0,
            Prediction::Consistent => 1,
        }
    }
}

/// One row of batch output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictionRow {
    pub story_id: String,
    pub prediction: Prediction,
    pub rationale: String,
}

/// Non-fatal problem surfaced during ingest or batch processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
