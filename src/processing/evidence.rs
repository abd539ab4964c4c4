//! Evidence extraction: resume sentences that share keywords with a job description

use std::collections::HashSet;

/// Maximum number of sentences returned as evidence
pub const MAX_EVIDENCE_SENTENCES: usize = 3;

/// Keywords shorter than this many characters (plus one) are ignored
const MIN_KEYWORD_LEN: usize = 3;

/// Lowercased whitespace-separated words of `job_text` longer than three characters
pub fn job_keywords(job_text: &str) -> HashSet<String> {
    job_text
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > MIN_KEYWORD_LEN)
        .map(str::to_string)
        .collect()
}

/// Pick the first sentences of `candidate_text` that mention a job keyword.
///
/// Sentences are split on `.`; a sentence is relevant when any keyword is a
/// case-insensitive substring of it. Up to three relevant sentences are
/// returned, trimmed and joined by `". "`. No overlap yields an empty string.
pub fn extract_evidence(candidate_text: &str, job_text: &str) -> String {
    let keywords = job_keywords(job_text);
    if keywords.is_empty() {
        return String::new();
    }

    let sentences: Vec<&str> = candidate_text
        .split('.')
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            keywords.iter().any(|keyword| lower.contains(keyword.as_str()))
        })
        .map(str::trim)
        .take(MAX_EVIDENCE_SENTENCES)
        .collect();

    sentences.join(". ").trim().to_string()
}
