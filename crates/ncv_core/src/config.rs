//! Pipeline configuration.
//!
//! Merges built-in defaults, an optional TOML file and `NCV_*` environment
//! variables (use `__` for nesting, e.g. `NCV_RETRIEVAL__TOP_K=4`).

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const ENV_PREFIX: &str = "NCV_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub decomposer: DecomposerConfig,
    pub verifier: VerifierConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub batch: BatchConfig,
}

/// Window sizes are measured in characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 800,
            overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceScope {
    /// Only search chunks of the record's own source document.
    #[default]
    Document,
    /// Search the whole indexed corpus.
    Corpus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: i64,
    pub scope: EvidenceScope,
    /// When set, evidence comes from a remote index query service instead of the local index.
    pub remote_url: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            scope: EvidenceScope::Document,
            remote_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecomposerStrategy {
    #[default]
    RuleBased,
    ExternalJudge,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DecomposerConfig {
    pub strategy: DecomposerStrategy,
    /// Sentences at or below this many characters are dropped as filler.
    pub min_claim_chars: usize,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            strategy: DecomposerStrategy::RuleBased,
            min_claim_chars: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerifierStrategy {
    #[default]
    OverlapScoring,
    ExternalJudge,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifierConfig {
    pub strategy: VerifierStrategy,
    /// A chunk counts as a support hit when it shares strictly more tokens than this.
    pub overlap_threshold: usize,
    pub min_support_hits: usize,
    /// Upper bound on evidence text sent to the judge per claim.
    pub max_evidence_chars: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            strategy: VerifierStrategy::OverlapScoring,
            overlap_threshold: 3,
            min_support_hits: 2,
            max_evidence_chars: 6000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
    /// Fixed delay enforced between successive calls to the language model. 0 disables pacing.
    pub pacing_millis: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            embedding_model: "all-minilm".to_string(),
            timeout_secs: 10,
            pacing_millis: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    #[default]
    Hashing,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    /// Dimension of the offline hashing embedder. Ollama models report their own.
    pub dims: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Hashing,
            dims: 384,
        }
    }
}

/// Column headers of the batch input CSV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchConfig {
    pub id_column: String,
    pub backstory_column: String,
    pub document_column: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            id_column: "id".to_string(),
            backstory_column: "backstory".to_string(),
            document_column: "book_name".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(p) = path {
            if !p.is_file() {
                return Err(AppError::new("CONFIG_NOT_FOUND", "Config file not found")
                    .with_details(format!("path={}", p.display())));
            }
            figment = figment.merge(Toml::file(p));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: AppConfig = figment.extract().map_err(|e| {
            AppError::new("CONFIG_INVALID", "Failed to load configuration").with_details(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.chunking.max_chars == 0 {
            return Err(AppError::new("CONFIG_INVALID", "chunking.max_chars must be positive"));
        }
        if self.chunking.overlap >= self.chunking.max_chars {
            return Err(
                AppError::new("CONFIG_INVALID", "chunking.overlap must be smaller than max_chars")
                    .with_details(format!(
                        "overlap={}; max_chars={}",
                        self.chunking.overlap, self.chunking.max_chars
                    )),
            );
        }
        if self.retrieval.top_k <= 0 {
            return Err(AppError::new("CONFIG_INVALID", "retrieval.top_k must be positive")
                .with_details(format!("top_k={}", self.retrieval.top_k)));
        }
        if self.embedding.dims == 0 {
            return Err(AppError::new("CONFIG_INVALID", "embedding.dims must be positive"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(AppError::new("CONFIG_INVALID", "llm.timeout_secs must be positive"));
        }
        Ok(())
    }
}
