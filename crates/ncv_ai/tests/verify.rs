use std::sync::{Arc, Mutex};

use ncv_ai::decompose::Claim;
use ncv_ai::evidence::{Evidence, EvidenceHit};
use ncv_ai::llm::Llm;
use ncv_ai::verify::{count_support_hits, parse_judgment, ClaimVerifier, Judgment, SkipReason, Verdict};
use ncv_core::error::AppError;
use pretty_assertions::assert_eq;

struct RecordingLlm {
    out: Result<String, AppError>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    fn new(out: Result<&str, AppError>) -> Arc<Self> {
        Arc::new(Self {
            out: out.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl Llm for RecordingLlm {
    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.out.clone()
    }
}

fn claim(text: &str) -> Claim {
    Claim {
        ordinal: 0,
        text: text.to_string(),
    }
}

fn evidence(texts: &[&str]) -> Evidence {
    Evidence {
        hits: texts
            .iter()
            .enumerate()
            .map(|(i, t)| EvidenceHit {
                chunk_id: format!("c{i}"),
                document_id: "novel".to_string(),
                ordinal: Some(i as u32),
                score: Some(1.0 - i as f32 * 0.1),
                text: t.to_string(),
            })
            .collect(),
    }
}

fn overlap() -> ClaimVerifier {
    ClaimVerifier::OverlapScoring {
        threshold: 3,
        min_support_hits: 2,
    }
}

fn judge(llm: Arc<RecordingLlm>) -> ClaimVerifier {
    ClaimVerifier::ExternalJudge {
        llm,
        max_evidence_chars: 6000,
    }
}

const BORN: &str = "He was born in Paris in 1800";

#[test]
fn two_overlapping_passages_support_the_claim() {
    let ev = evidence(&[
        "He was born in Paris in 1800 to a poor family.",
        "Born in Paris, he was the son of a sailor.",
    ]);
    assert_eq!(count_support_hits(BORN, &ev, 3), 2);
    let v = overlap().verify(&claim(BORN), &ev);
    assert_eq!(v, Verdict::Supported { support_hits: 2 });
    assert!(!v.is_contradiction());
    assert_eq!(v.status(), "Supported");
}

#[test]
fn single_overlapping_passage_is_a_weak_violation() {
    let ev = evidence(&["He was born in Paris in 1800 to a poor family.", "The weather was cold."]);
    let v = overlap().verify(&claim(BORN), &ev);
    assert_eq!(v, Verdict::WeaklySupported { support_hits: 1 });
    assert!(v.is_contradiction());
    assert_eq!(v.status(), "Narrative Constraint Violation");
}

#[test]
fn unrelated_passages_contradict() {
    let ev = evidence(&["The weather was cold.", "Ships left the harbour at dawn."]);
    let v = overlap().verify(&claim(BORN), &ev);
    assert_eq!(v, Verdict::Contradicted { support_hits: 0 });
    assert!(v.is_contradiction());
}

#[test]
fn overlap_needs_strictly_more_than_threshold_tokens() {
    // Shares exactly {born, in, paris}: three tokens, not more than three.
    let ev = evidence(&["born in Paris"]);
    assert_eq!(count_support_hits(BORN, &ev, 3), 0);
    assert_eq!(count_support_hits(BORN, &ev, 2), 1);
    // Case does not matter and repeated words count once.
    let ev = evidence(&["PARIS Paris paris BORN in He"]);
    assert_eq!(count_support_hits(BORN, &ev, 3), 1);
    // Attached punctuation makes a different word.
    let ev = evidence(&["PARIS! Paris, BORN (in) He"]);
    assert_eq!(count_support_hits(BORN, &ev, 3), 0);
}

#[test]
fn punctuated_claim_words_do_not_match_bare_ones() {
    let punctuated = "Born in Paris, 1800, poor.";
    let ev = evidence(&["born in paris 1800 poor", "born in paris 1800 poor"]);
    // Only {born, in} are shared.
    assert_eq!(count_support_hits(punctuated, &ev, 3), 0);
    assert_eq!(
        overlap().verify(&claim(punctuated), &ev),
        Verdict::Contradicted { support_hits: 0 }
    );
}

#[test]
fn short_birth_claim_is_supported_by_two_passages() {
    let born = "He was born in Paris";
    let ev = evidence(&[
        "He was born in Paris in 1800 to a poor family.",
        "It is said he was born in Paris in 1800 to a poor family.",
    ]);
    // Each passage shares {he, was, born, in, paris} with the claim.
    assert_eq!(count_support_hits(born, &ev, 3), 2);
    assert_eq!(overlap().verify(&claim(born), &ev), Verdict::Supported { support_hits: 2 });
}

#[test]
fn empty_evidence_is_skipped_for_both_strategies() {
    let skipped = Verdict::Skipped {
        reason: SkipReason::NoEvidence,
    };
    assert_eq!(overlap().verify(&claim(BORN), &Evidence::default()), skipped);

    let llm = RecordingLlm::new(Ok(r#"{"label": 0, "rationale": "x"}"#));
    assert_eq!(judge(llm.clone()).verify(&claim(BORN), &Evidence::default()), skipped);
    assert_eq!(llm.calls(), 0);
    assert!(!skipped.is_contradiction());
}

#[test]
fn judge_sees_claim_and_ranked_passages() {
    let llm = RecordingLlm::new(Ok(
        r#"```json
{"label": 0, "rationale": "The novel places his birth in Marseille.", "excerpt": "born at Marseille"}
```"#,
    ));
    let ev = evidence(&["He was born at Marseille in 1796.", "He went to sea young."]);
    let v = judge(llm.clone()).verify(&claim(BORN), &ev);
    assert_eq!(
        v,
        Verdict::Judged(Judgment {
            label: 0,
            rationale: "The novel places his birth in Marseille.".to_string(),
            excerpt: Some("born at Marseille".to_string()),
        })
    );
    assert!(v.is_contradiction());

    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let p = &prompts[0];
    assert!(p.contains(BORN));
    let first = p.find("He was born at Marseille in 1796.").expect("first passage");
    let second = p.find("He went to sea young.").expect("second passage");
    assert!(first < second);
}

#[test]
fn judge_evidence_is_bounded_but_keeps_top_passage() {
    let long = "x".repeat(500);
    let llm = RecordingLlm::new(Ok(r#"{"label": 1, "rationale": "silent"}"#));
    let verifier = ClaimVerifier::ExternalJudge {
        llm: llm.clone(),
        max_evidence_chars: 100,
    };
    let ev = evidence(&[long.as_str(), "second passage text"]);
    let v = verifier.verify(&claim(BORN), &ev);
    assert!(!v.is_contradiction());

    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[0].contains(&long));
    assert!(!prompts[0].contains("second passage text"));
}

#[test]
fn judge_failures_give_benefit_of_doubt() {
    let ev = evidence(&["He was born at Marseille."]);

    let unavailable = RecordingLlm::new(Err(AppError::new("LLM_UNAVAILABLE", "down").with_retryable(true)));
    assert_eq!(
        judge(unavailable).verify(&claim(BORN), &ev),
        Verdict::Skipped {
            reason: SkipReason::JudgeUnavailable
        }
    );

    let garbled = RecordingLlm::new(Ok("I think it is probably fine."));
    assert_eq!(
        judge(garbled).verify(&claim(BORN), &ev),
        Verdict::Skipped {
            reason: SkipReason::UnparsableJudgment
        }
    );
}

#[test]
fn parses_label_variants() {
    assert_eq!(parse_judgment(r#"{"label": "0", "rationale": " r "}"#).unwrap().label, 0);
    assert_eq!(parse_judgment(r#"{"label": true}"#).unwrap().label, 1);

    let j = parse_judgment(r#"Answer: {"label": 1, "rationale": "ok", "excerpt": "  "} thanks"#).unwrap();
    assert_eq!(
        j,
        Judgment {
            label: 1,
            rationale: "ok".to_string(),
            excerpt: None,
        }
    );

    for raw in [r#"{"label": 2}"#, r#"{"label": "maybe"}"#, r#"{"rationale": "no label"}"#, "{", "none"] {
        let err = parse_judgment(raw).expect_err(raw);
        assert_eq!(err.code, "JUDGMENT_PARSE_FAILED", "raw={raw}");
    }
}

#[test]
fn only_the_judge_short_circuits() {
    assert!(!overlap().short_circuits());
    assert!(judge(RecordingLlm::new(Ok("{}"))).short_circuits());
}
