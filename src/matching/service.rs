//! Matching service: document pipeline, candidate ranking and text search

use crate::config::Config;
use crate::error::{MatcherError, Result};
use crate::input::archive::{self, EntryFailure};
use crate::input::file_detector::FileType;
use crate::input::manager::InputManager;
use crate::processing::embeddings::{Embedder, EmbeddingVector, SentenceEncoder};
use crate::processing::evidence::extract_evidence;
use crate::processing::redaction::PiiRedactor;
use crate::processing::requirements::RequirementAnalyzer;
use crate::store::{JobId, JobRecord, NewResume, OwnerId, ResumeId, ResumeStore, StoredResume};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Output of the extraction → redaction → embedding pipeline for one document
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    pub filename: String,
    pub content_text: String,
    pub redacted_text: String,
    pub embedding: EmbeddingVector,
}

/// Per-entry outcome of an archive upload, in archive order
#[derive(Debug, Default, Serialize)]
pub struct ArchiveReport {
    pub processed: Vec<ProcessedDocument>,
    pub failures: Vec<EntryFailure>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateMatch {
    pub resume_id: ResumeId,
    pub filename: String,
    pub similarity_score: f32,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub job_id: JobId,
    pub matches: Vec<CandidateMatch>,
    pub missing_requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub resume_id: ResumeId,
    pub filename: String,
    pub content: String,
    pub similarity_score: f32,
}

#[derive(Debug, Default, Serialize)]
pub struct UploadReport {
    pub stored: Vec<StoredResume>,
    pub failures: Vec<EntryFailure>,
}

/// Holds the shared models and the storage handle. Build once at startup and
/// share behind an `Arc`; every method takes `&self`.
pub struct MatchingService<S> {
    input: InputManager,
    redactor: PiiRedactor,
    embedder: Arc<dyn Embedder>,
    requirements: RequirementAnalyzer,
    store: S,
}

impl<S: ResumeStore> MatchingService<S> {
    pub fn new(embedder: Arc<dyn Embedder>, redactor: PiiRedactor, store: S) -> Self {
        info!(
            "Matching service ready: embeddings from {}, {:?} redaction",
            embedder.model_name(),
            redactor.strategy()
        );

        Self {
            input: InputManager::new(),
            redactor,
            embedder,
            requirements: RequirementAnalyzer::new(),
            store,
        }
    }

    /// Load models named in `config`. A missing embedding model is fatal; a
    /// missing entity model only downgrades redaction to regex-only.
    pub async fn from_config(config: &Config, store: S) -> Result<Self> {
        config.ensure_models_dir()?;

        let embedder = SentenceEncoder::load(
            &config.models.embedding_model,
            &config.models.models_dir,
            config.models.max_sequence_length,
        )
        .await?;
        let redactor = PiiRedactor::from_config(config).await;

        Ok(Self::new(Arc::new(embedder), redactor, store))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn redactor(&self) -> &PiiRedactor {
        &self.redactor
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Extract, redact and embed a single PDF or DOCX
    pub fn process_document(&self, filename: &str, bytes: &[u8]) -> Result<ProcessedDocument> {
        let start_time = Instant::now();

        let content_text = self.input.extract_text(filename, bytes)?;
        let redacted_text = self.redactor.redact(&content_text);
        let embedding = self.embedder.embed(&redacted_text)?;

        debug!(
            "Processed {} ({} chars) in {:.2?}",
            filename,
            content_text.len(),
            start_time.elapsed()
        );

        Ok(ProcessedDocument {
            filename: filename.to_string(),
            content_text,
            redacted_text,
            embedding,
        })
    }

    /// Process every PDF/DOCX entry of a ZIP archive independently.
    ///
    /// Only an unreadable archive fails the call. Entries are processed in
    /// archive order; a failing entry is logged, recorded in `failures` and
    /// left out of `processed`.
    pub fn process_archive(&self, bytes: &[u8]) -> Result<ArchiveReport> {
        let expanded = archive::expand(bytes)?;

        let mut report = ArchiveReport {
            processed: Vec::with_capacity(expanded.entries.len()),
            failures: expanded.unreadable,
            skipped: expanded.skipped,
        };

        for entry in expanded.entries {
            match self.process_document(&entry.name, &entry.bytes) {
                Ok(document) => report.processed.push(document),
                Err(e) => {
                    warn!("Dropping archive entry {}: {}", entry.name, e);
                    report.failures.push(EntryFailure {
                        filename: entry.name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Archive processed: {} documents, {} failed, {} skipped",
            report.processed.len(),
            report.failures.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Process one uploaded file (a document or a ZIP of documents) and persist the results
    pub async fn upload(&self, owner_id: OwnerId, filename: &str, bytes: &[u8]) -> Result<UploadReport> {
        let (documents, failures) = if FileType::from_filename(filename) == FileType::Zip {
            let report = self.process_archive(bytes)?;
            (report.processed, report.failures)
        } else {
            (vec![self.process_document(filename, bytes)?], Vec::new())
        };

        let mut stored = Vec::with_capacity(documents.len());
        for document in documents {
            stored.push(self.persist(owner_id, document).await?);
        }

        Ok(UploadReport { stored, failures })
    }

    /// Upload several files at once. A file that cannot be processed is
    /// reported in `failures`; the others are still persisted.
    pub async fn upload_batch(&self, owner_id: OwnerId, files: Vec<(String, Vec<u8>)>) -> Result<UploadReport> {
        if files.is_empty() {
            return Err(MatcherError::InvalidInput("No files provided".to_string()));
        }

        let mut report = UploadReport::default();
        for (filename, bytes) in files {
            match self.upload(owner_id, &filename, &bytes).await {
                Ok(upload) => {
                    report.stored.extend(upload.stored);
                    report.failures.extend(upload.failures);
                }
                Err(e @ MatcherError::Store(_)) => return Err(e),
                Err(e) => {
                    warn!("Skipping upload {}: {}", filename, e);
                    report.failures.push(EntryFailure {
                        filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    async fn persist(&self, owner_id: OwnerId, document: ProcessedDocument) -> Result<StoredResume> {
        self.store
            .store_resume(NewResume {
                filename: document.filename,
                content_text: document.content_text,
                redacted_text: document.redacted_text,
                embedding: Some(document.embedding),
                owner_id,
            })
            .await
    }

    /// Embed a job description and persist it
    pub async fn create_job(&self, title: &str, description_text: &str) -> Result<JobRecord> {
        let embedding = self.embedder.embed(description_text)?;
        self.store.store_job(title, description_text, Some(embedding)).await
    }

    /// Rank stored resumes against a job, with evidence and unmet requirements
    pub async fn rank_candidates(&self, job_id: JobId, top_n: usize) -> Result<MatchResult> {
        let job = self.store.get_job(job_id).await?;
        let embedding = job
            .embedding
            .as_ref()
            .ok_or(MatcherError::NoEmbeddingForJob(job_id))?;

        let neighbors = self.store.knn_query(embedding, top_n).await?;

        let matches: Vec<CandidateMatch> = neighbors
            .into_iter()
            .map(|neighbor| CandidateMatch {
                resume_id: neighbor.id,
                filename: neighbor.filename,
                similarity_score: 1.0 - neighbor.distance,
                evidence: extract_evidence(&neighbor.redacted_text, &job.description_text),
            })
            .collect();

        let evidence: Vec<&str> = matches.iter().map(|m| m.evidence.as_str()).collect();
        let missing_requirements = self
            .requirements
            .missing_requirements(&job.description_text, &evidence);

        debug!(
            "Job {}: {} matches, {} missing requirements",
            job_id,
            matches.len(),
            missing_requirements.len()
        );

        Ok(MatchResult {
            job_id,
            matches,
            missing_requirements,
        })
    }

    /// Resumes most similar to free text, most similar first
    pub async fn search_text(&self, query_text: &str, k: usize) -> Result<Vec<SearchHit>> {
        let embedding = self.embedder.embed(query_text)?;
        let neighbors = self.store.knn_query(&embedding, k).await?;

        debug!("Search returned {} hits for k={}", neighbors.len(), k);

        Ok(neighbors
            .into_iter()
            .map(|neighbor| SearchHit {
                resume_id: neighbor.id,
                filename: neighbor.filename,
                content: neighbor.redacted_text,
                similarity_score: 1.0 - neighbor.distance,
            })
            .collect())
    }
}
