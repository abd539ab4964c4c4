//! Brute-force in-process store

use crate::error::{MatcherError, Result};
use crate::processing::embeddings::EmbeddingVector;
use crate::store::{JobId, JobRecord, Neighbor, NewResume, ResumeId, ResumeStore, StoredResume};
use chrono::Utc;
use log::debug;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    resumes: Vec<(StoredResume, Option<EmbeddingVector>)>,
    jobs: Vec<JobRecord>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resume_count(&self) -> usize {
        self.tables.read().await.resumes.len()
    }
}

impl ResumeStore for InMemoryStore {
    async fn store_resume(&self, resume: NewResume) -> Result<StoredResume> {
        let mut tables = self.tables.write().await;
        let stored = StoredResume {
            id: tables.resumes.len() as ResumeId + 1,
            filename: resume.filename,
            content_text: resume.content_text,
            redacted_text: resume.redacted_text,
            owner_id: resume.owner_id,
            created_at: Utc::now(),
        };
        tables.resumes.push((stored.clone(), resume.embedding));
        Ok(stored)
    }

    async fn get_resume(&self, id: ResumeId) -> Result<Option<StoredResume>> {
        let tables = self.tables.read().await;
        Ok(tables
            .resumes
            .iter()
            .find(|(resume, _)| resume.id == id)
            .map(|(resume, _)| resume.clone()))
    }

    async fn store_job(
        &self,
        title: &str,
        description_text: &str,
        embedding: Option<EmbeddingVector>,
    ) -> Result<JobRecord> {
        let mut tables = self.tables.write().await;
        let job = JobRecord {
            id: tables.jobs.len() as JobId + 1,
            title: title.to_string(),
            description_text: description_text.to_string(),
            embedding,
            created_at: Utc::now(),
        };
        tables.jobs.push(job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: JobId) -> Result<JobRecord> {
        let tables = self.tables.read().await;
        tables
            .jobs
            .iter()
            .find(|job| job.id == id)
            .cloned()
            .ok_or(MatcherError::JobNotFound(id))
    }

    async fn knn_query(&self, vector: &EmbeddingVector, k: usize) -> Result<Vec<Neighbor>> {
        let tables = self.tables.read().await;

        let mut neighbors: Vec<Neighbor> = tables
            .resumes
            .iter()
            .filter_map(|(resume, embedding)| {
                embedding.as_ref().map(|embedding| Neighbor {
                    id: resume.id,
                    filename: resume.filename.clone(),
                    redacted_text: resume.redacted_text.clone(),
                    distance: embedding.cosine_distance(vector),
                })
            })
            .collect();

        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        neighbors.truncate(k);

        debug!("k-NN query returned {} of {} resumes", neighbors.len(), tables.resumes.len());
        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::embeddings::EMBEDDING_DIM;

    fn axis(index: usize, weight: f32) -> EmbeddingVector {
        let mut values = vec![0.0; EMBEDDING_DIM];
        values[0] = 1.0;
        values[index] = weight;
        EmbeddingVector::try_from(values).unwrap()
    }

    fn resume(name: &str, embedding: Option<EmbeddingVector>) -> NewResume {
        NewResume {
            filename: name.to_string(),
            content_text: format!("{} content", name),
            redacted_text: format!("{} redacted", name),
            embedding,
            owner_id: 7,
        }
    }

    #[tokio::test]
    async fn test_knn_orders_by_distance_and_skips_unembedded() {
        let store = InMemoryStore::new();
        store.store_resume(resume("far.pdf", Some(axis(1, 3.0)))).await.unwrap();
        store.store_resume(resume("none.pdf", None)).await.unwrap();
        store.store_resume(resume("near.pdf", Some(axis(1, 0.1)))).await.unwrap();
        store.store_resume(resume("mid.pdf", Some(axis(1, 1.0)))).await.unwrap();

        let query = axis(1, 0.0);
        let hits = store.knn_query(&query, 10).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.filename.as_str()).collect();

        assert_eq!(names, vec!["near.pdf", "mid.pdf", "far.pdf"]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

        let top = store.knn_query(&query, 2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert!(store.knn_query(&query, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jobs_roundtrip_and_missing_job() {
        let store = InMemoryStore::new();
        let job = store.store_job("Engineer", "Rust experience required", None).await.unwrap();

        let fetched = store.get_job(job.id).await.unwrap();
        assert_eq!(fetched.title, "Engineer");
        assert!(fetched.embedding.is_none());

        assert!(matches!(store.get_job(999).await, Err(MatcherError::JobNotFound(999))));
    }

    #[tokio::test]
    async fn test_resume_ids_are_sequential() {
        let store = InMemoryStore::new();
        let first = store.store_resume(resume("a.pdf", None)).await.unwrap();
        let second = store.store_resume(resume("b.docx", None)).await.unwrap();

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(store.get_resume(2).await.unwrap().unwrap().filename, "b.docx");
        assert!(store.get_resume(3).await.unwrap().is_none());
        assert_eq!(store.resume_count().await, 2);
    }
}
