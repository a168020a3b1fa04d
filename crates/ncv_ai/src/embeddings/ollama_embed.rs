use ncv_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::ollama::OllamaClient;

const EMBEDDINGS_FAILED: &str = "EMBEDDINGS_FAILED";
const MAX_INPUT_CHARS: usize = 12_000;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        // Cut on a char boundary; chunks are far below this.
        let prompt = match input.char_indices().nth(MAX_INPUT_CHARS) {
            Some((cut, _)) => &input[..cut],
            None => input,
        };
        let req = EmbeddingsRequest {
            model: &self.model,
            prompt,
        };
        let out: EmbeddingsResponse = self.client.post_json("/api/embeddings", &req, EMBEDDINGS_FAILED)?;
        if out.embedding.is_empty() {
            return Err(AppError::new(EMBEDDINGS_FAILED, "Embeddings response was empty")
                .with_details(format!("model={}", self.model)));
        }
        Ok(out.embedding)
    }
}
