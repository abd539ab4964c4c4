//! PII redaction: entity-model pass when available, regex passes always

use crate::config::Config;
use crate::processing::ner::{BertEntityRecognizer, Entity, EntityRecognizer};
use log::{info, warn};
use regex::Regex;
use std::sync::Arc;

/// Placeholder substituted for every redacted substring
pub const REDACTION_TOKEN: &str = "[REDACTED]";

/// Chosen once at startup
#[derive(Clone)]
pub enum RedactionStrategy {
    ModelBacked(Arc<dyn EntityRecognizer>),
    RegexOnly,
}

impl std::fmt::Debug for RedactionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedactionStrategy::ModelBacked(_) => f.write_str("ModelBacked"),
            RedactionStrategy::RegexOnly => f.write_str("RegexOnly"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PiiRedactor {
    strategy: RedactionStrategy,
    email_regex: Regex,
    phone_regex: Regex,
    name_regex: Regex,
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::regex_only()
    }
}

impl PiiRedactor {
    pub fn new(strategy: RedactionStrategy) -> Self {
        let email_regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
            .expect("Invalid email regex");

        // 3-3-4 digits, each separator optional and either '-' or '.'
        let phone_regex = Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b")
            .expect("Invalid phone regex");

        let name_regex = Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b")
            .expect("Invalid name regex");

        Self {
            strategy,
            email_regex,
            phone_regex,
            name_regex,
        }
    }

    pub fn regex_only() -> Self {
        Self::new(RedactionStrategy::RegexOnly)
    }

    pub fn with_recognizer(recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self::new(RedactionStrategy::ModelBacked(recognizer))
    }

    /// Try the configured entity model; any load failure selects regex-only
    pub async fn from_config(config: &Config) -> Self {
        let Some(repo) = config.entity_model() else {
            info!("Entity model disabled, using regex-only PII redaction");
            return Self::regex_only();
        };

        match BertEntityRecognizer::load(repo, &config.models.models_dir).await {
            Ok(recognizer) => Self::with_recognizer(Arc::new(recognizer)),
            Err(e) => {
                warn!("Entity model {} unavailable, falling back to regex-only PII redaction: {}", repo, e);
                Self::regex_only()
            }
        }
    }

    pub fn is_model_backed(&self) -> bool {
        matches!(self.strategy, RedactionStrategy::ModelBacked(_))
    }

    pub fn strategy(&self) -> &RedactionStrategy {
        &self.strategy
    }

    /// Replace personally identifying substrings with [`REDACTION_TOKEN`].
    ///
    /// Model-backed: entity surfaces first, then the email and phone passes.
    /// Regex-only: email, phone, then the "First Last" name heuristic.
    /// An entity-model failure on this input degrades to the regex-only passes.
    pub fn redact(&self, text: &str) -> String {
        match &self.strategy {
            RedactionStrategy::ModelBacked(recognizer) => match recognizer.recognize(text) {
                Ok(entities) => {
                    let redacted = replace_entities(text, entities);
                    self.redact_contacts(&redacted)
                }
                Err(e) => {
                    warn!("Entity recognition failed, using regex-only redaction: {}", e);
                    self.redact_with_patterns(text)
                }
            },
            RedactionStrategy::RegexOnly => self.redact_with_patterns(text),
        }
    }

    fn redact_contacts(&self, text: &str) -> String {
        let text = self.email_regex.replace_all(text, REDACTION_TOKEN);
        self.phone_regex.replace_all(&text, REDACTION_TOKEN).into_owned()
    }

    fn redact_with_patterns(&self, text: &str) -> String {
        let text = self.redact_contacts(text);
        self.name_regex.replace_all(&text, REDACTION_TOKEN).into_owned()
    }
}

/// Literal replacement of every occurrence of each PII entity surface
fn replace_entities(text: &str, entities: Vec<Entity>) -> String {
    let mut surfaces: Vec<String> = entities
        .into_iter()
        .filter(|e| e.kind.is_pii())
        .map(|e| e.text)
        .filter(|t| !t.trim().is_empty())
        .collect();

    // Longest first so "Mary Ann Smith" goes before a bare "Mary"
    surfaces.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    surfaces.dedup();

    let mut redacted = text.to_string();
    for surface in surfaces {
        redacted = redacted.replace(&surface, REDACTION_TOKEN);
    }
    redacted
}
