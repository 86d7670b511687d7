//! Content-policy prompt sanitization.
//!
//! Generative planners phrase scenes in dramatic language ("family
//! conflict", "dad lying") that image providers' content filters reject.
//! This pass rewrites a narrow deny-list of phrases into neutral
//! paraphrases. It is NOT general content moderation; the policy is an
//! ordered data table so it can be audited and extended without touching
//! pipeline logic.

/// Ordered substitution rules, longest/most-specific first.
/// Matching is case-insensitive; replacements are applied in table order.
static SANITIZE_RULES: &[(&str, &str)] = &[
    // Family conflict
    ("family conflict", "family discussion"),
    ("family fight", "family disagreement"),
    ("dad lying", "father having a private talk"),
    ("mom lying", "mother having a private talk"),
    ("lying to", "keeping a secret from"),
    // Violence
    ("violently", "intensely"),
    ("violent", "intense"),
    ("violence", "dramatic tension"),
    ("fighting", "arguing heatedly"),
    ("fight", "heated argument"),
    ("murdered", "confronted"),
    ("murder", "confrontation"),
    ("killed", "confronted"),
    ("kill", "confront"),
    // Theft
    ("stealing", "quietly taking"),
    ("stolen", "missing"),
    ("steal", "take"),
    ("theft", "missing belongings"),
    ("robbed", "left without"),
    ("robbery", "sudden loss"),
    // Betrayal
    ("betrayal", "broken trust"),
    ("betrayed", "let down"),
    ("betray", "let down"),
    ("revenge", "settling differences"),
];

/// Replace every case-insensitive occurrence of `pattern` in `text`.
/// ASCII-only lowering keeps byte offsets aligned with the original.
fn replace_case_insensitive(text: &str, pattern: &str, replacement: &str) -> String {
    let lower_text = text.to_ascii_lowercase();
    let lower_pattern = pattern.to_ascii_lowercase();

    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(offset) = lower_text[cursor..].find(&lower_pattern) {
        let start = cursor + offset;
        result.push_str(&text[cursor..start]);
        result.push_str(replacement);
        cursor = start + pattern.len();
    }
    result.push_str(&text[cursor..]);
    result
}

/// Apply the sanitization table to a prompt.
pub fn sanitize_prompt(prompt: &str) -> String {
    let mut text = prompt.to_string();
    for (pattern, replacement) in SANITIZE_RULES {
        if text.to_ascii_lowercase().contains(pattern) {
            text = replace_case_insensitive(&text, pattern, replacement);
        }
    }
    text
}
