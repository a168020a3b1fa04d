use ncv_core::error::AppError;

/// External natural-language capability used for claim decomposition and judgment.
pub trait Llm: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, AppError>;
}

pub mod ollama_llm;
pub mod paced;

pub use ollama_llm::OllamaLlm;
pub use paced::PacedLlm;

/// Strip a surrounding Markdown code fence (```` ``` ```` or ```` ```json ````) from model output.
pub fn strip_code_fences(raw: &str) -> &str {
    let t = raw.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
