//! Candidate matching over the storage collaborator

pub mod service;

pub use service::{
    ArchiveReport, CandidateMatch, MatchResult, MatchingService, ProcessedDocument, SearchHit, UploadReport,
};
