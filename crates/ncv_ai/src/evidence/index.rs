use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use ncv_core::domain::Document;
use ncv_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::chunking::{chunk_document, ChunkParams};
use super::model::Chunk;
use crate::embeddings::Embedder;
use crate::retrieve::similarity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStatus {
    pub dims: u32,
    pub chunk_count: u32,
    pub document_count: u32,
    pub embedding_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
    #[serde(skip)]
    norm: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Exact cosine-similarity index over chunk embeddings.
///
/// Every entry's vector has exactly `dims` components. Results are ordered by
/// descending score with ties broken by insertion order; a linear scan keeps this
/// exact for novel-sized corpora.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    dims: usize,
    embedding_model: Option<String>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn build(dims: usize, entries: Vec<(Vec<f32>, Chunk)>) -> Result<Self, AppError> {
        if dims == 0 {
            return Err(AppError::invalid_argument("Index dims must be positive"));
        }
        let mut out = Vec::with_capacity(entries.len());
        for (vector, chunk) in entries {
            validate_vector(&vector, dims).map_err(|e| {
                let details = format!("chunk_id={}; {}", chunk.chunk_id, e.details.unwrap_or_default());
                AppError::invalid_argument(e.message).with_details(details)
            })?;
            let norm = similarity::l2_norm(&vector);
            out.push(IndexEntry { chunk, vector, norm });
        }
        Ok(Self {
            dims,
            embedding_model: None,
            entries: out,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Whether any chunk belongs to `document_id` (exact match, as the query filter uses).
    pub fn has_document(&self, document_id: &str) -> bool {
        self.entries.iter().any(|e| e.chunk.document_id == document_id)
    }

    pub fn status(&self) -> IndexStatus {
        let documents = self
            .entries
            .iter()
            .map(|e| e.chunk.document_id.as_str())
            .collect::<BTreeSet<_>>();
        IndexStatus {
            dims: self.dims as u32,
            chunk_count: self.entries.len() as u32,
            document_count: documents.len() as u32,
            embedding_model: self.embedding_model.clone(),
        }
    }

    /// Top-`k` chunks by cosine similarity. `document_filter` restricts candidates
    /// before ranking, so a filtered query still returns up to `k` hits.
    pub fn query(
        &self,
        vector: &[f32],
        k: i64,
        document_filter: Option<&str>,
    ) -> Result<Vec<IndexHit>, AppError> {
        if k <= 0 {
            return Err(AppError::invalid_argument("k must be positive").with_details(format!("k={k}")));
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if vector.len() != self.dims {
            return Err(
                AppError::invalid_argument("Query vector dims do not match index dims")
                    .with_details(format!("index_dims={}; query_dims={}", self.dims, vector.len())),
            );
        }

        let qnorm = similarity::l2_norm(vector);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| document_filter.map_or(true, |d| e.chunk.document_id == d))
            .map(|(i, e)| (i, similarity::cosine_similarity(vector, &e.vector, qnorm, e.norm)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(usize::try_from(k).unwrap_or(usize::MAX));

        Ok(scored
            .into_iter()
            .map(|(i, score)| IndexHit {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::new("INDEX_SAVE_FAILED", "Failed to create index directory")
                    .with_details(format!("path={}; err={}", parent.display(), e))
            })?;
        }
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_vec(self).map_err(|e| {
            AppError::new("INDEX_SAVE_FAILED", "Failed to encode index").with_details(e.to_string())
        })?;
        fs::write(&tmp, json).map_err(|e| {
            AppError::new("INDEX_SAVE_FAILED", "Failed to write index")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            AppError::new("INDEX_SAVE_FAILED", "Failed to finalize index write")
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
        })?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let bytes = fs::read(path).map_err(|e| {
            AppError::new("INDEX_NOT_FOUND", "Failed to read index")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let mut index: VectorIndex = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new("INDEX_CORRUPT", "Failed to decode index")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        if index.dims == 0 {
            return Err(AppError::new("INDEX_CORRUPT", "Index dims must be positive"));
        }
        for entry in index.entries.iter_mut() {
            validate_vector(&entry.vector, index.dims).map_err(|e| {
                AppError::new("INDEX_CORRUPT", e.message).with_details(format!(
                    "chunk_id={}; {}",
                    entry.chunk.chunk_id,
                    e.details.unwrap_or_default()
                ))
            })?;
            entry.norm = similarity::l2_norm(&entry.vector);
        }
        Ok(index)
    }
}

fn validate_vector(vector: &[f32], dims: usize) -> Result<(), AppError> {
    if vector.len() != dims {
        return Err(AppError::invalid_argument("Vector dims do not match index dims")
            .with_details(format!("expected={dims}; got={}", vector.len())));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(AppError::invalid_argument("Vector contains non-finite values"));
    }
    Ok(())
}

/// Shared, read-mostly handle to the current index.
///
/// Builders construct a complete `VectorIndex` off to the side and `publish` it in
/// one swap; queriers take a `snapshot` and never observe a partial build.
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<VectorIndex>>,
}

impl IndexHandle {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn publish(&self, index: VectorIndex) {
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        *guard = Arc::new(index);
    }

    pub fn snapshot(&self) -> Arc<VectorIndex> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&*guard)
    }
}

/// Chunk and embed every document into a fresh index.
///
/// Documents are processed in document-id order, so insertion order (and therefore
/// tie-breaking) is `(document_id, ordinal)` regardless of input order.
pub fn build_index(
    documents: &[Document],
    embedder: &dyn Embedder,
    params: ChunkParams,
) -> Result<VectorIndex, AppError> {
    if documents.is_empty() {
        return Err(AppError::invalid_argument("Cannot build an index from an empty document set"));
    }

    let mut docs = documents.iter().collect::<Vec<_>>();
    docs.sort_by(|a, b| a.document_id.cmp(&b.document_id));
    if let Some(pair) = docs.windows(2).find(|w| w[0].document_id == w[1].document_id) {
        return Err(AppError::invalid_argument("Duplicate document id in corpus")
            .with_details(format!("document_id={}", pair[0].document_id)));
    }

    let mut entries: Vec<(Vec<f32>, Chunk)> = Vec::new();
    let mut dims: Option<usize> = None;

    for doc in docs {
        let chunks = chunk_document(doc, params);
        tracing::debug!(document_id = %doc.document_id, chunks = chunks.len(), "chunked document");

        for chunk in chunks {
            let v = embedder.embed(&chunk.text).map_err(|e| {
                AppError::new("INDEX_BUILD_FAILED", "Failed to compute embeddings")
                    .with_details(format!("chunk_id={}; err={}", chunk.chunk_id, e))
                    .with_retryable(e.retryable)
            })?;
            match dims {
                Some(d) if d != v.len() => {
                    return Err(AppError::new(
                        "INDEX_BUILD_FAILED",
                        "Embedding dimension mismatch across chunks",
                    )
                    .with_details(format!(
                        "expected={}; got={}; chunk_id={}",
                        d,
                        v.len(),
                        chunk.chunk_id
                    )));
                }
                Some(_) => {}
                None => dims = Some(v.len()),
            }
            entries.push((v, chunk));
        }
    }

    let Some(dims) = dims else {
        return Err(AppError::invalid_argument("Documents contain no text to index"));
    };
    let index = VectorIndex::build(dims, entries)?.with_model(embedder.model_id());
    let st = index.status();
    tracing::info!(
        documents = st.document_count,
        chunks = st.chunk_count,
        dims = st.dims,
        model = embedder.model_id(),
        "built vector index"
    );
    Ok(index)
}
