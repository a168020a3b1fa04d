use ncv_core::error::AppError;

/// Maps text to a fixed-dimension vector. Implementations are constructed once
/// and shared by handle; they hold no hidden global state.
pub trait Embedder: Send + Sync {
    /// Identifier recorded in index status (model name or provider label).
    fn model_id(&self) -> &str;
    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError>;
}

pub mod hashing;
pub mod ollama_embed;
pub mod paced;

pub use hashing::HashingEmbedder;
pub use ollama_embed::OllamaEmbedder;
pub use paced::PacedEmbedder;
