use ncv_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Llm;
use crate::ollama::OllamaClient;

const GENERATE_FAILED: &str = "LLM_GENERATE_FAILED";

/// Non-streaming `/api/generate` against a loopback Ollama.
#[derive(Debug, Clone)]
pub struct OllamaLlm {
    client: OllamaClient,
    model: String,
}

impl OllamaLlm {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl Llm for OllamaLlm {
    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let req = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let out: GenerateResponse = self.client.post_json("/api/generate", &req, GENERATE_FAILED)?;
        if out.response.trim().is_empty() {
            return Err(AppError::new(GENERATE_FAILED, "Model returned an empty response")
                .with_details(format!("model={}", self.model)));
        }
        Ok(out.response)
    }
}
