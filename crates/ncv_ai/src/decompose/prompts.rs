pub fn decomposition_prompt(backstory: &str) -> String {
    format!(
        r#"You are extracting checkable facts from a character backstory.

Rules (non-negotiable):
1) Return 3-5 atomic facts. Each fact states exactly one thing about the character.
2) Each fact must be verifiable against the text of a novel (events, places, relationships, traits).
3) Do not add facts that are not stated in the backstory. Do not merge facts.
4) Skip filler and opinions that cannot be checked.

Backstory:
{backstory}

Output:
- Return ONLY a JSON array of strings, e.g. ["fact one", "fact two"].
- No commentary before or after the array.
"#
    )
}
