//! Requirement extraction and gap analysis against matched evidence

use aho_corasick::AhoCorasick;

/// Phrases that mark a job-description line as a hiring requirement
pub const REQUIREMENT_TRIGGERS: [&str; 5] = ["required", "must have", "should have", "experience", "skills"];

/// Maximum number of unmet requirements reported per query
pub const MAX_MISSING_REQUIREMENTS: usize = 5;

/// Lines of this many characters or fewer are headers or noise
const MIN_REQUIREMENT_LEN: usize = 10;

pub struct RequirementAnalyzer {
    triggers: AhoCorasick,
}

impl Default for RequirementAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl RequirementAnalyzer {
    pub fn new() -> Self {
        let triggers = AhoCorasick::new(REQUIREMENT_TRIGGERS).expect("Invalid requirement trigger patterns");
        Self { triggers }
    }

    /// Trimmed lines of `job_text` that mention a trigger phrase and are
    /// longer than ten characters, in document order
    pub fn extract_requirements(&self, job_text: &str) -> Vec<String> {
        job_text
            .lines()
            .map(str::trim)
            .filter(|line| self.triggers.is_match(&line.to_lowercase()))
            .filter(|line| line.chars().count() > MIN_REQUIREMENT_LEN)
            .map(str::to_string)
            .collect()
    }

    /// Requirements none of whose words occur anywhere in the combined,
    /// lowercased evidence. A single overlapping word counts as satisfied.
    pub fn missing_requirements<S: AsRef<str>>(&self, job_text: &str, evidence_texts: &[S]) -> Vec<String> {
        let corpus = evidence_texts
            .iter()
            .map(|text| text.as_ref())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        self.extract_requirements(job_text)
            .into_iter()
            .filter(|requirement| {
                let lower = requirement.to_lowercase();
                let words: Vec<&str> = lower.split_whitespace().collect();
                // an empty word list would be vacuously missing
                !words.is_empty() && !words.iter().any(|word| corpus.contains(word))
            })
            .take(MAX_MISSING_REQUIREMENTS)
            .collect()
    }
}
