//! Shared fixtures: a deterministic embedder and in-memory document builders

#![allow(dead_code)]

use resume_matcher::processing::{Embedder, EmbeddingVector, PiiRedactor, EMBEDDING_DIM};
use resume_matcher::{InMemoryStore, MatchingService, Result};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;

/// Bag-of-words embedder: every distinct lowercase token gets its own axis
#[derive(Default)]
pub struct VocabularyEmbedder {
    vocabulary: Mutex<HashMap<String, usize>>,
}

impl Embedder for VocabularyEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut values = vec![0.0f32; EMBEDDING_DIM];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
        {
            let next = vocabulary.len();
            let axis = *vocabulary.entry(token).or_insert(next) % EMBEDDING_DIM;
            values[axis] += 1.0;
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        EmbeddingVector::try_from(values)
    }

    fn model_name(&self) -> &str {
        "vocabulary-test-embedder"
    }
}

pub fn service() -> MatchingService<InMemoryStore> {
    MatchingService::new(
        Arc::new(VocabularyEmbedder::default()),
        PiiRedactor::regex_only(),
        InMemoryStore::new(),
    )
}

/// Minimal DOCX package with one `<w:p>` per paragraph
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p.replace('&', "&amp;")))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );
    zip_of(&[("word/document.xml", xml.as_bytes())])
}

pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
