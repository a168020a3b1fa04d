use std::sync::Arc;
use std::time::Duration;

use ncv_core::config::{
    AppConfig, DecomposerStrategy, EmbeddingProviderKind, EvidenceScope, VerifierStrategy,
};
use ncv_core::domain::{BackstoryRecord, Prediction, ValidationWarning};
use ncv_core::error::{AppError, UNKNOWN_DOCUMENT};
use serde::{Deserialize, Serialize};

use crate::aggregate::{ClaimAnalysis, StoryAggregator, StoryResult};
use crate::decompose::{Claim, ClaimDecomposer};
use crate::embeddings::{Embedder, HashingEmbedder, OllamaEmbedder, PacedEmbedder};
use crate::evidence::IndexHandle;
use crate::llm::{Llm, OllamaLlm, PacedLlm};
use crate::ollama::OllamaClient;
use crate::pacing::Pacer;
use crate::retrieve::{EvidenceRetriever, RemoteIndexClient};
use crate::verify::ClaimVerifier;

/// Externally provided capabilities, constructed once and injected into the checker.
#[derive(Clone)]
pub struct Capabilities {
    pub embedder: Arc<dyn Embedder>,
    pub llm: Option<Arc<dyn Llm>>,
    /// Shared by every external call: model generation, Ollama embeddings and
    /// remote index queries.
    pub pacer: Arc<Pacer>,
}

impl Capabilities {
    /// Build the configured embedder, and the language model when either strategy
    /// needs one. External providers are paced on one shared clock.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(cfg.llm.timeout_secs);
        let pacer = Arc::new(Pacer::new(Duration::from_millis(cfg.llm.pacing_millis)));
        let embedder: Arc<dyn Embedder> = match cfg.embedding.provider {
            EmbeddingProviderKind::Hashing => Arc::new(HashingEmbedder::new(cfg.embedding.dims)?),
            EmbeddingProviderKind::Ollama => Arc::new(PacedEmbedder::new(
                OllamaEmbedder::new(
                    OllamaClient::new(&cfg.llm.base_url, timeout)?,
                    cfg.llm.embedding_model.clone(),
                ),
                Arc::clone(&pacer),
            )),
        };

        let needs_llm = cfg.decomposer.strategy == DecomposerStrategy::ExternalJudge
            || cfg.verifier.strategy == VerifierStrategy::ExternalJudge;
        let llm: Option<Arc<dyn Llm>> = if needs_llm {
            let client = OllamaClient::new(&cfg.llm.base_url, timeout)?;
            Some(Arc::new(PacedLlm::new(
                OllamaLlm::new(client, cfg.llm.model.clone()),
                Arc::clone(&pacer),
            )))
        } else {
            None
        };

        Ok(Self { embedder, llm, pacer })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<StoryResult>,
    /// Stories whose evaluation failed and were reported with benefit of doubt.
    pub failed: usize,
    pub warnings: Vec<ValidationWarning>,
}

/// Decompose → retrieve → verify → aggregate, with strategies fixed at construction.
pub struct ConsistencyChecker {
    decomposer: ClaimDecomposer,
    retriever: EvidenceRetriever,
    verifier: ClaimVerifier,
    aggregator: StoryAggregator,
    top_k: i64,
    scope: EvidenceScope,
}

impl ConsistencyChecker {
    pub fn new(
        decomposer: ClaimDecomposer,
        retriever: EvidenceRetriever,
        verifier: ClaimVerifier,
        top_k: i64,
        scope: EvidenceScope,
    ) -> Result<Self, AppError> {
        if top_k <= 0 {
            return Err(AppError::invalid_argument("top_k must be positive").with_details(format!("top_k={top_k}")));
        }
        let aggregator = StoryAggregator::new(verifier.short_circuits());
        Ok(Self {
            decomposer,
            retriever,
            verifier,
            aggregator,
            top_k,
            scope,
        })
    }

    /// Wire strategies from config. `index` is required unless a remote index
    /// service is configured.
    pub fn from_config(
        cfg: &AppConfig,
        caps: &Capabilities,
        index: Option<Arc<IndexHandle>>,
    ) -> Result<Self, AppError> {
        let decomposer = decomposer_from_config(cfg, caps)?;
        let verifier = verifier_from_config(cfg, caps)?;

        let retriever = match (&cfg.retrieval.remote_url, index) {
            (Some(url), _) => EvidenceRetriever::remote(
                RemoteIndexClient::new(url, Duration::from_secs(cfg.llm.timeout_secs))?
                    .with_pacer(Arc::clone(&caps.pacer)),
            ),
            (None, Some(index)) => EvidenceRetriever::local(index, Arc::clone(&caps.embedder)),
            (None, None) => {
                return Err(AppError::new(
                    "CONFIG_INVALID",
                    "No vector index loaded and no remote index service configured",
                ))
            }
        };

        Self::new(decomposer, retriever, verifier, cfg.retrieval.top_k, cfg.retrieval.scope)
    }

    pub fn decompose(&self, backstory: &str) -> Vec<Claim> {
        self.decomposer.decompose(backstory)
    }

    /// Fails with `UNKNOWN_DOCUMENT` when document scope points at a document the
    /// local index does not hold.
    pub fn check_story(&self, record: &BackstoryRecord) -> Result<StoryResult, AppError> {
        let filter = match self.scope {
            EvidenceScope::Document => Some(record.document_id.as_str()),
            EvidenceScope::Corpus => None,
        };
        if let Some(document_id) = filter {
            if self.retriever.knows_document(document_id) == Some(false) {
                return Err(AppError::new(UNKNOWN_DOCUMENT, "Record references a document that is not indexed")
                    .with_details(format!("document_id={document_id}")));
            }
        }

        let claims = self.decompose(&record.backstory);
        tracing::debug!(story_id = %record.story_id, claims = claims.len(), "decomposed backstory");

        let result = self.aggregator.evaluate(&record.story_id, claims, |claim| {
            let evidence = self.retriever.retrieve(&claim.text, self.top_k, filter)?;
            let verdict = self.verifier.verify(&claim, &evidence);
            tracing::debug!(
                story_id = %record.story_id,
                claim = claim.ordinal,
                evidence = evidence.len(),
                status = verdict.status(),
                "verified claim"
            );
            Ok(ClaimAnalysis {
                claim,
                verdict,
                evidence,
            })
        })?;

        tracing::info!(
            story_id = %result.story_id,
            prediction = result.prediction.label(),
            claims = result.claims_total,
            evaluated = result.analyses.len(),
            "checked story"
        );
        Ok(result)
    }

    /// Check every record. A failing story never stops the batch: it is reported as
    /// consistent (benefit of doubt) with the error as its rationale, plus a warning.
    pub fn run_batch(&self, records: &[BackstoryRecord]) -> BatchOutcome {
        let mut results = Vec::with_capacity(records.len());
        let mut warnings = Vec::new();
        let mut failed = 0usize;

        for record in records {
            match self.check_story(record) {
                Ok(r) => results.push(r),
                Err(e) => {
                    failed += 1;
                    let warning = if e.code == UNKNOWN_DOCUMENT {
                        tracing::warn!(
                            story_id = %record.story_id,
                            document_id = %record.document_id,
                            "record references an unindexed document"
                        );
                        ValidationWarning::new(UNKNOWN_DOCUMENT, "Record references a document that is not indexed")
                    } else {
                        tracing::error!(story_id = %record.story_id, error = %e, "story evaluation failed");
                        ValidationWarning::new("STORY_EVALUATION_FAILED", "Story could not be evaluated")
                    };
                    warnings.push(warning.with_details(format!("story_id={}; err={}", record.story_id, e)));
                    results.push(StoryResult {
                        story_id: record.story_id.clone(),
                        prediction: Prediction::Consistent,
                        rationale: format!("Evaluation failed: {e}"),
                        claims_total: 0,
                        short_circuited: false,
                        analyses: Vec::new(),
                    });
                }
            }
        }

        BatchOutcome {
            results,
            failed,
            warnings,
        }
    }
}

fn require_llm(caps: &Capabilities, component: &str) -> Result<Arc<dyn Llm>, AppError> {
    caps.llm.clone().ok_or_else(|| {
        AppError::new("CONFIG_INVALID", "External judge strategy requires a language model")
            .with_details(format!("component={component}"))
    })
}

pub fn decomposer_from_config(cfg: &AppConfig, caps: &Capabilities) -> Result<ClaimDecomposer, AppError> {
    Ok(match cfg.decomposer.strategy {
        DecomposerStrategy::RuleBased => ClaimDecomposer::RuleBased {
            min_chars: cfg.decomposer.min_claim_chars,
        },
        DecomposerStrategy::ExternalJudge => ClaimDecomposer::ExternalJudge {
            llm: require_llm(caps, "decomposer")?,
        },
    })
}

pub fn verifier_from_config(cfg: &AppConfig, caps: &Capabilities) -> Result<ClaimVerifier, AppError> {
    Ok(match cfg.verifier.strategy {
        VerifierStrategy::OverlapScoring => ClaimVerifier::OverlapScoring {
            threshold: cfg.verifier.overlap_threshold,
            min_support_hits: cfg.verifier.min_support_hits,
        },
        VerifierStrategy::ExternalJudge => ClaimVerifier::ExternalJudge {
            llm: require_llm(caps, "verifier")?,
            max_evidence_chars: cfg.verifier.max_evidence_chars,
        },
    })
}
