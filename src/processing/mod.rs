//! Text processing: PII redaction, embeddings, evidence and requirement analysis

pub mod embeddings;
pub mod evidence;
pub mod ner;
pub mod redaction;
pub mod requirements;

pub use embeddings::{Embedder, EmbeddingVector, SentenceEncoder, EMBEDDING_DIM};
pub use redaction::{PiiRedactor, RedactionStrategy, REDACTION_TOKEN};
pub use requirements::RequirementAnalyzer;
