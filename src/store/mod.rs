//! Storage collaborator contract
//!
//! The matching pipeline never owns persistence. It hands processed resumes
//! and jobs to a [`ResumeStore`] and asks it for nearest neighbours by cosine
//! distance. [`InMemoryStore`] is a brute-force implementation for the CLI
//! and tests; production deployments back the trait with a vector-capable
//! database, binding [`EmbeddingVector`] through its native vector parameter.

pub mod memory;

use crate::error::Result;
use crate::processing::embeddings::EmbeddingVector;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;

pub use memory::InMemoryStore;

pub type ResumeId = i64;
pub type JobId = i64;
pub type OwnerId = i64;

#[derive(Debug, Clone)]
pub struct NewResume {
    pub filename: String,
    pub content_text: String,
    pub redacted_text: String,
    pub embedding: Option<EmbeddingVector>,
    pub owner_id: OwnerId,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredResume {
    pub id: ResumeId,
    pub filename: String,
    pub content_text: String,
    pub redacted_text: String,
    pub owner_id: OwnerId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub title: String,
    pub description_text: String,
    pub embedding: Option<EmbeddingVector>,
    pub created_at: DateTime<Utc>,
}

/// One k-NN hit over the resume table
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: ResumeId,
    pub filename: String,
    pub redacted_text: String,
    /// Cosine distance, expected in `[0, 2]`
    pub distance: f32,
}

pub trait ResumeStore: Send + Sync {
    fn store_resume(&self, resume: NewResume) -> impl Future<Output = Result<StoredResume>> + Send;

    fn get_resume(&self, id: ResumeId) -> impl Future<Output = Result<Option<StoredResume>>> + Send;

    fn store_job(
        &self,
        title: &str,
        description_text: &str,
        embedding: Option<EmbeddingVector>,
    ) -> impl Future<Output = Result<JobRecord>> + Send;

    /// Fails with `JobNotFound` when no such job exists
    fn get_job(&self, id: JobId) -> impl Future<Output = Result<JobRecord>> + Send;

    /// Up to `k` resumes with a stored embedding, ascending by cosine distance
    fn knn_query(&self, vector: &EmbeddingVector, k: usize) -> impl Future<Output = Result<Vec<Neighbor>>> + Send;
}
