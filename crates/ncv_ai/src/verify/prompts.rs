pub fn judgment_prompt(claim: &str, evidence_blocks: &str) -> String {
    format!(
        r#"You are checking one claim from a character backstory against passages from the source novel.

Rules (non-negotiable):
1) Use ONLY the passages below. Do not rely on outside knowledge of the novel.
2) Answer label 0 ONLY if a passage explicitly contradicts the claim.
3) If the passages support the claim, or say nothing about it, answer label 1.
4) When answering 0, quote the contradicting sentence verbatim as the excerpt.

Claim:
{claim}

Passages:
{evidence_blocks}

Output:
- Return ONLY a JSON object: {{"label": 0 or 1, "rationale": "<one sentence>", "excerpt": "<verbatim quote or empty>"}}
"#
    )
}
