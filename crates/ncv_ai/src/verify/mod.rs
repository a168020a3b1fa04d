use std::sync::Arc;

use ncv_core::error::{AppError, JUDGMENT_PARSE_FAILED, JUDGMENT_UNAVAILABLE};
use serde::{Deserialize, Serialize};

use crate::decompose::Claim;
use crate::evidence::Evidence;
use crate::llm::{strip_code_fences, Llm};
use crate::tokenize::word_set;

mod prompts;

/// Binary judge output: label 0 means the evidence explicitly contradicts the claim,
/// label 1 means it supports the claim or is silent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Judgment {
    pub label: u8,
    pub rationale: String,
    pub excerpt: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Retrieval found nothing (or was unavailable).
    NoEvidence,
    /// The judge answered but the response could not be parsed.
    UnparsableJudgment,
    /// The judge could not be reached.
    JudgeUnavailable,
}

/// Outcome for a single claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Supported { support_hits: usize },
    /// Exactly one supporting passage: a narrative constraint violation, not trusted.
    WeaklySupported { support_hits: usize },
    Contradicted { support_hits: usize },
    Judged(Judgment),
    /// Not judged; counts as support (benefit of doubt).
    Skipped { reason: SkipReason },
}

impl Verdict {
    pub fn is_contradiction(&self) -> bool {
        match self {
            Verdict::Supported { .. } | Verdict::Skipped { .. } => false,
            Verdict::WeaklySupported { .. } | Verdict::Contradicted { .. } => true,
            Verdict::Judged(j) => j.label == 0,
        }
    }

    pub fn signals_support(&self) -> bool {
        !self.is_contradiction()
    }

    pub fn status(&self) -> &'static str {
        match self {
            Verdict::Supported { .. } => "Supported",
            Verdict::WeaklySupported { .. } => "Narrative Constraint Violation",
            Verdict::Contradicted { .. } => "Contradicted",
            Verdict::Judged(j) if j.label == 0 => "Contradicted",
            Verdict::Judged(_) => "Supported",
            Verdict::Skipped { .. } => "Skipped",
        }
    }
}

pub enum ClaimVerifier {
    /// Lexical proxy: count evidence chunks sharing more than `threshold` tokens with
    /// the claim. `>= min_support_hits` supports, exactly one is weak, none contradicts.
    OverlapScoring {
        threshold: usize,
        min_support_hits: usize,
    },
    /// Ask the model for a structured binary judgment.
    ExternalJudge {
        llm: Arc<dyn Llm>,
        max_evidence_chars: usize,
    },
}

impl ClaimVerifier {
    /// Whether the story loop must stop at the first contradiction.
    pub fn short_circuits(&self) -> bool {
        matches!(self, ClaimVerifier::ExternalJudge { .. })
    }

    /// Never fails: missing evidence and unusable judge responses become `Skipped`.
    pub fn verify(&self, claim: &Claim, evidence: &Evidence) -> Verdict {
        if evidence.is_empty() {
            tracing::debug!(claim = %claim.text, "no evidence; skipping claim");
            return Verdict::Skipped {
                reason: SkipReason::NoEvidence,
            };
        }

        match self {
            ClaimVerifier::OverlapScoring {
                threshold,
                min_support_hits,
            } => {
                let support_hits = count_support_hits(&claim.text, evidence, *threshold);
                if support_hits >= *min_support_hits {
                    Verdict::Supported { support_hits }
                } else if support_hits >= 1 {
                    Verdict::WeaklySupported { support_hits }
                } else {
                    Verdict::Contradicted { support_hits }
                }
            }
            ClaimVerifier::ExternalJudge {
                llm,
                max_evidence_chars,
            } => {
                let prompt = prompts::judgment_prompt(
                    &claim.text,
                    &build_evidence_blocks(evidence, *max_evidence_chars),
                );
                let raw = match llm.generate(&prompt) {
                    Ok(raw) => raw,
                    Err(e) => {
                        let e = AppError::new(JUDGMENT_UNAVAILABLE, "Judge call failed")
                            .with_details(e.to_string())
                            .with_retryable(e.retryable);
                        tracing::warn!(error = %e, claim = %claim.text, "judge unavailable; giving claim benefit of doubt");
                        return Verdict::Skipped {
                            reason: SkipReason::JudgeUnavailable,
                        };
                    }
                };
                match parse_judgment(&raw) {
                    Ok(j) => Verdict::Judged(j),
                    Err(e) => {
                        tracing::warn!(error = %e, claim = %claim.text, "unparsable judgment; giving claim benefit of doubt");
                        Verdict::Skipped {
                            reason: SkipReason::UnparsableJudgment,
                        }
                    }
                }
            }
        }
    }
}

/// Number of evidence chunks sharing strictly more than `threshold` distinct tokens with the claim.
pub fn count_support_hits(claim: &str, evidence: &Evidence, threshold: usize) -> usize {
    let claim_tokens = word_set(claim);
    evidence
        .texts()
        .filter(|text| word_set(text).intersection(&claim_tokens).count() > threshold)
        .count()
}

/// Concatenate evidence passages in rank order until `max_chars` would be exceeded.
/// The top passage is always included.
fn build_evidence_blocks(evidence: &Evidence, max_chars: usize) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut used = 0usize;
    for (i, hit) in evidence.hits.iter().enumerate() {
        let block = format!("[passage {}] document={}\n{}", i + 1, hit.document_id, hit.text.trim());
        let len = block.chars().count();
        if !blocks.is_empty() && used + len > max_chars {
            break;
        }
        used += len;
        blocks.push(block);
    }
    blocks.join("\n\n---\n\n")
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    label: serde_json::Value,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
}

/// Parse `{label: 0|1, rationale, excerpt}`. The label may be a number or a numeric string.
pub fn parse_judgment(raw: &str) -> Result<Judgment, AppError> {
    let body = strip_code_fences(raw);
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(AppError::new(JUDGMENT_PARSE_FAILED, "Response has no JSON object")
                .with_details(raw.chars().take(200).collect::<String>()))
        }
    };
    let parsed: RawJudgment = serde_json::from_str(json).map_err(|e| {
        AppError::new(JUDGMENT_PARSE_FAILED, "Response is not a judgment object").with_details(e.to_string())
    })?;

    let label = match &parsed.label {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        serde_json::Value::Bool(b) => Some(u64::from(*b)),
        _ => None,
    };
    let label = match label {
        Some(0) => 0u8,
        Some(1) => 1u8,
        _ => {
            return Err(AppError::new(JUDGMENT_PARSE_FAILED, "Judgment label must be 0 or 1")
                .with_details(format!("label={}", parsed.label)))
        }
    };

    Ok(Judgment {
        label,
        rationale: parsed.rationale.unwrap_or_default().trim().to_string(),
        excerpt: parsed
            .excerpt
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    })
}
