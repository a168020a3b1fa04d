use std::ops::ControlFlow;

use ncv_core::domain::{Prediction, PredictionRow};
use ncv_core::error::AppError;
use ncv_core::report::NO_CONTRADICTION_RATIONALE;
use serde::{Deserialize, Serialize};

use crate::decompose::Claim;
use crate::evidence::Evidence;
use crate::verify::Verdict;

const EXCERPT_MAX_CHARS: usize = 280;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimAnalysis {
    pub claim: Claim,
    pub verdict: Verdict,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryResult {
    pub story_id: String,
    pub prediction: Prediction,
    pub rationale: String,
    /// Claims produced by decomposition; `analyses` may be shorter after a short-circuit.
    pub claims_total: usize,
    pub short_circuited: bool,
    pub analyses: Vec<ClaimAnalysis>,
}

impl StoryResult {
    pub fn first_contradiction(&self) -> Option<&ClaimAnalysis> {
        self.analyses.iter().find(|a| a.verdict.is_contradiction())
    }

    pub fn to_row(&self) -> PredictionRow {
        PredictionRow {
            story_id: self.story_id.clone(),
            prediction: self.prediction,
            rationale: self.rationale.clone(),
        }
    }
}

/// Folds per-claim verdicts into a story verdict with AND semantics.
///
/// With `short_circuit` set, evaluation stops at the first contradictory claim and
/// later claims are never analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryAggregator {
    short_circuit: bool,
}

impl StoryAggregator {
    pub fn new(short_circuit: bool) -> Self {
        Self { short_circuit }
    }

    pub fn short_circuit(&self) -> bool {
        self.short_circuit
    }

    /// Analyze `claims` in order and aggregate. An error from `analyze` aborts the story.
    pub fn evaluate<F>(&self, story_id: &str, claims: Vec<Claim>, mut analyze: F) -> Result<StoryResult, AppError>
    where
        F: FnMut(Claim) -> Result<ClaimAnalysis, AppError>,
    {
        let claims_total = claims.len();
        let folded = claims.into_iter().try_fold(Vec::with_capacity(claims_total), |mut acc, claim| {
            let analysis = match analyze(claim) {
                Ok(a) => a,
                Err(e) => return ControlFlow::Break(Err(e)),
            };
            let stop = self.short_circuit && analysis.verdict.is_contradiction();
            acc.push(analysis);
            if stop {
                ControlFlow::Break(Ok(acc))
            } else {
                ControlFlow::Continue(acc)
            }
        });

        let analyses = match folded {
            ControlFlow::Continue(acc) | ControlFlow::Break(Ok(acc)) => acc,
            ControlFlow::Break(Err(e)) => return Err(e),
        };
        Ok(self.aggregate(story_id, analyses, claims_total))
    }

    /// `Inconsistent` iff any analysis is contradictory; the rationale cites the
    /// earliest contradiction in claim order.
    pub fn aggregate(&self, story_id: &str, analyses: Vec<ClaimAnalysis>, claims_total: usize) -> StoryResult {
        let first = analyses.iter().find(|a| a.verdict.is_contradiction());
        let (prediction, rationale) = match first {
            Some(a) => (Prediction::Inconsistent, contradiction_rationale(a)),
            None => (Prediction::Consistent, NO_CONTRADICTION_RATIONALE.to_string()),
        };
        StoryResult {
            story_id: story_id.to_string(),
            prediction,
            rationale,
            claims_total,
            short_circuited: analyses.len() < claims_total,
            analyses,
        }
    }
}

fn contradiction_rationale(a: &ClaimAnalysis) -> String {
    let (rationale, excerpt) = match &a.verdict {
        Verdict::Judged(j) => {
            let rationale = if j.rationale.is_empty() {
                format!("Claim \"{}\" is contradicted by the novel", a.claim.text)
            } else {
                j.rationale.clone()
            };
            (rationale, j.excerpt.clone())
        }
        other => {
            let hits = match other {
                Verdict::WeaklySupported { support_hits } | Verdict::Contradicted { support_hits } => *support_hits,
                _ => 0,
            };
            let rationale = format!(
                "{}: claim \"{}\" matched {} of {} retrieved passages",
                other.status(),
                a.claim.text,
                hits,
                a.evidence.len()
            );
            (rationale, a.evidence.texts().next().map(snippet))
        }
    };
    match excerpt {
        Some(ex) => format!("{rationale} | Excerpt: \"{ex}\""),
        None => rationale,
    }
}

fn snippet(text: &str) -> String {
    let t = text.trim();
    match t.char_indices().nth(EXCERPT_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &t[..cut]),
        None => t.to_string(),
    }
}
