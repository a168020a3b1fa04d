use serde::{Deserialize, Serialize};

/// A bounded, overlapping span of one document. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub ordinal: u32,
    pub text: String,
    pub text_sha256: String,
    /// `[start, end)` in characters of the source document.
    pub char_range: [u32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceHit {
    pub chunk_id: String,
    pub document_id: String,
    pub ordinal: Option<u32>,
    /// Similarity (higher is closer). Remote services may not report one.
    pub score: Option<f32>,
    pub text: String,
}

/// Ranked chunks retrieved for one claim, most similar first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub hits: Vec<EvidenceHit>,
}

impl Evidence {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|h| h.text.as_str())
    }
}
