use std::sync::Arc;

use ncv_core::error::{AppError, RETRIEVAL_UNAVAILABLE};
use sha2::{Digest, Sha256};

use crate::embeddings::Embedder;
use crate::evidence::{Evidence, EvidenceHit, IndexHandle};

pub mod remote;
pub mod similarity;

pub use remote::{RemoteHit, RemoteIndexClient};

/// Where evidence comes from. Chosen once when the pipeline is built.
pub enum RetrievalBackend {
    /// Embed the claim and query the in-process index.
    Local {
        index: Arc<IndexHandle>,
        embedder: Arc<dyn Embedder>,
    },
    /// Delegate to an index query service.
    Remote(RemoteIndexClient),
}

pub struct EvidenceRetriever {
    backend: RetrievalBackend,
}

impl EvidenceRetriever {
    pub fn new(backend: RetrievalBackend) -> Self {
        Self { backend }
    }

    pub fn local(index: Arc<IndexHandle>, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(RetrievalBackend::Local { index, embedder })
    }

    pub fn remote(client: RemoteIndexClient) -> Self {
        Self::new(RetrievalBackend::Remote(client))
    }

    /// Whether the current index holds `document_id`. `None` when the backend is a
    /// remote service, which cannot be asked.
    pub fn knows_document(&self, document_id: &str) -> Option<bool> {
        match &self.backend {
            RetrievalBackend::Local { index, .. } => Some(index.snapshot().has_document(document_id)),
            RetrievalBackend::Remote(_) => None,
        }
    }

    /// Top-`k` chunks for `claim`, most similar first, restricted to
    /// `document_filter` when given.
    ///
    /// Only `INVALID_ARGUMENT` is returned as an error. Any embedding, index or
    /// transport failure yields empty evidence so the verifier can apply benefit
    /// of doubt.
    pub fn retrieve(&self, claim: &str, k: i64, document_filter: Option<&str>) -> Result<Evidence, AppError> {
        if k <= 0 {
            return Err(AppError::invalid_argument("k must be positive").with_details(format!("k={k}")));
        }
        match self.search(claim, k, document_filter) {
            Ok(evidence) => Ok(evidence),
            Err(e) if e.is_invalid_argument() => Err(e),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    claim,
                    filter = document_filter.unwrap_or(""),
                    "evidence retrieval unavailable; continuing with empty evidence"
                );
                Ok(Evidence::default())
            }
        }
    }

    fn search(&self, claim: &str, k: i64, document_filter: Option<&str>) -> Result<Evidence, AppError> {
        match &self.backend {
            RetrievalBackend::Local { index, embedder } => {
                let qv = embedder.embed(claim).map_err(|e| {
                    AppError::new(RETRIEVAL_UNAVAILABLE, "Failed to embed claim")
                        .with_details(e.to_string())
                        .with_retryable(e.retryable)
                })?;
                let snapshot = index.snapshot();
                let hits = snapshot.query(&qv, k, document_filter)?;
                Ok(Evidence {
                    hits: hits
                        .into_iter()
                        .map(|h| EvidenceHit {
                            chunk_id: h.chunk.chunk_id,
                            document_id: h.chunk.document_id,
                            ordinal: Some(h.chunk.ordinal),
                            score: Some(h.score),
                            text: h.chunk.text,
                        })
                        .collect(),
                })
            }
            RetrievalBackend::Remote(client) => {
                let hits = client.query(claim, k, document_filter)?;
                Ok(Evidence {
                    hits: hits
                        .into_iter()
                        .take(usize::try_from(k).unwrap_or(usize::MAX))
                        .map(|h| EvidenceHit {
                            chunk_id: hex::encode(Sha256::digest(h.text.as_bytes())),
                            document_id: h.document_id(),
                            ordinal: h.metadata.get("ordinal").and_then(|v| v.as_u64()).map(|v| v as u32),
                            score: h.metadata.get("score").and_then(|v| v.as_f64()).map(|v| v as f32),
                            text: h.text,
                        })
                        .collect(),
                })
            }
        }
    }
}
