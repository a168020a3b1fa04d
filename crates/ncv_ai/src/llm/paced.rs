use std::sync::Arc;

use ncv_core::error::AppError;

use super::Llm;
use crate::pacing::Pacer;

/// Generation calls wait their turn on a shared [`Pacer`] before reaching the model.
pub struct PacedLlm<L> {
    inner: L,
    pacer: Arc<Pacer>,
}

impl<L: Llm> PacedLlm<L> {
    pub fn new(inner: L, pacer: Arc<Pacer>) -> Self {
        Self { inner, pacer }
    }
}

impl<L: Llm> Llm for PacedLlm<L> {
    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        self.pacer.wait_turn();
        self.inner.generate(prompt)
    }
}
