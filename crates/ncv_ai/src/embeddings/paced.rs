use std::sync::Arc;

use ncv_core::error::AppError;

use super::Embedder;
use crate::pacing::Pacer;

/// Embedding calls paced against the same clock as generation calls.
pub struct PacedEmbedder<E> {
    inner: E,
    pacer: Arc<Pacer>,
}

impl<E: Embedder> PacedEmbedder<E> {
    pub fn new(inner: E, pacer: Arc<Pacer>) -> Self {
        Self { inner, pacer }
    }
}

impl<E: Embedder> Embedder for PacedEmbedder<E> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        self.pacer.wait_turn();
        self.inner.embed(input)
    }
}
