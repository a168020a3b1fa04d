use std::sync::Arc;

use ncv_core::error::{AppError, DECOMPOSITION_PARSE_FAILED};
use serde::{Deserialize, Serialize};

use crate::llm::{strip_code_fences, Llm};

mod prompts;

/// An atomic statement extracted from a backstory. `ordinal` is decomposition order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claim {
    pub ordinal: u32,
    pub text: String,
}

/// Backstory → ordered claims.
///
/// Both strategies return at least one claim for any input with non-whitespace
/// text, falling back to the backstory exactly as given as a single claim.
pub enum ClaimDecomposer {
    /// Split on `.`, `?` and `!`, keeping fragments longer than `min_chars` characters.
    RuleBased { min_chars: usize },
    /// Ask the model for a JSON list of atomic facts.
    ExternalJudge { llm: Arc<dyn Llm> },
}

impl ClaimDecomposer {
    pub fn decompose(&self, backstory: &str) -> Vec<Claim> {
        let whole = backstory.trim();
        if whole.is_empty() {
            return Vec::new();
        }

        let texts = match self {
            ClaimDecomposer::RuleBased { min_chars } => split_sentences(whole, *min_chars),
            ClaimDecomposer::ExternalJudge { llm } => {
                let parsed = llm
                    .generate(&prompts::decomposition_prompt(whole))
                    .and_then(|raw| parse_claim_list(&raw));
                match parsed {
                    Ok(claims) => claims,
                    Err(e) => {
                        tracing::warn!(error = %e, "claim decomposition failed; using whole backstory as one claim");
                        Vec::new()
                    }
                }
            }
        };

        let texts = if texts.is_empty() {
            vec![backstory.to_string()]
        } else {
            texts
        };
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Claim {
                ordinal: i as u32,
                text,
            })
            .collect()
    }
}

pub fn split_sentences(text: &str, min_chars: usize) -> Vec<String> {
    text.split(['.', '?', '!'])
        .map(str::trim)
        .filter(|s| s.chars().count() > min_chars)
        .map(str::to_string)
        .collect()
}

/// Parse a model response expected to hold a JSON array of strings, optionally in a
/// code fence or surrounded by prose. Blank entries are dropped.
pub fn parse_claim_list(raw: &str) -> Result<Vec<String>, AppError> {
    let body = strip_code_fences(raw);
    let json = match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(AppError::new(DECOMPOSITION_PARSE_FAILED, "Response has no JSON array")
                .with_details(preview(raw)))
        }
    };
    let items: Vec<String> = serde_json::from_str(json).map_err(|e| {
        AppError::new(DECOMPOSITION_PARSE_FAILED, "Response is not a JSON list of strings")
            .with_details(format!("err={e}; response={}", preview(raw)))
    })?;
    let claims = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    if claims.is_empty() {
        return Err(AppError::new(DECOMPOSITION_PARSE_FAILED, "Response listed no claims"));
    }
    Ok(claims)
}

fn preview(raw: &str) -> String {
    raw.chars().take(200).collect()
}
