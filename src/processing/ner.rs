//! Optional named-entity recognition for PII detection
//!
//! Runs a BERT token-classification checkpoint (encoder plus a linear
//! `classifier` head) and decodes BIO tags into character spans using the
//! tokenizer's offsets. Inputs longer than the model window are covered
//! through the tokenizer's overflow encodings.

use crate::error::{MatcherError, Result};
use crate::processing::embeddings::{load_bert_config, load_tokenizer, load_weights, resolve_model_files, select_device};
use candle_core::{Device, Module, Tensor, D};
use candle_nn::Linear;
use candle_transformers::models::bert::BertModel;
use log::info;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tokenizers::{Encoding, Tokenizer};

const MAX_WINDOW: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Person,
    Email,
    Phone,
    Other,
}

impl EntityKind {
    /// Categories that count as personally identifying
    pub fn is_pii(self) -> bool {
        !matches!(self, EntityKind::Other)
    }

    fn from_label(label: &str) -> Self {
        match label.to_uppercase().as_str() {
            "PER" | "PERSON" => EntityKind::Person,
            "EMAIL" => EntityKind::Email,
            "PHONE" | "PHONE_NUMBER" => EntityKind::Phone,
            _ => EntityKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    pub text: String,
}

pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>>;
}

/// One `id2label` entry: `B-PER` → begin + Person, `O` → outside
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tag {
    begin: bool,
    kind: Option<EntityKind>,
}

impl Tag {
    fn parse(label: &str) -> Self {
        match label.split_once('-') {
            Some((prefix, name)) => Tag {
                begin: matches!(prefix, "B" | "S" | "U"),
                kind: Some(EntityKind::from_label(name)),
            },
            None if label == "O" => Tag { begin: false, kind: None },
            None => Tag {
                begin: true,
                kind: Some(EntityKind::from_label(label)),
            },
        }
    }
}

fn parse_tags(config_json: &Value) -> Result<Vec<Tag>> {
    let id2label = config_json
        .get("id2label")
        .and_then(Value::as_object)
        .ok_or_else(|| MatcherError::ModelLoading("config.json has no id2label".to_string()))?;

    let mut tags = vec![Tag { begin: false, kind: None }; id2label.len()];
    for (id, label) in id2label {
        let index: usize = id
            .parse()
            .map_err(|_| MatcherError::ModelLoading(format!("Invalid label id: {}", id)))?;
        let label = label
            .as_str()
            .ok_or_else(|| MatcherError::ModelLoading(format!("Label {} is not a string", id)))?;
        let slot = tags
            .get_mut(index)
            .ok_or_else(|| MatcherError::ModelLoading(format!("Label id {} out of range", index)))?;
        *slot = Tag::parse(label);
    }
    Ok(tags)
}

/// Merge per-token tags into entity spans over `text`
fn decode_spans(
    text: &str,
    offsets: &[(usize, usize)],
    special: &[u32],
    predictions: &[u32],
    tags: &[Tag],
) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut current: Option<(EntityKind, usize, usize)> = None;

    for (index, (&(start, end), &prediction)) in offsets.iter().zip(predictions).enumerate() {
        if special.get(index).copied().unwrap_or(0) == 1 {
            continue;
        }
        let tag = tags.get(prediction as usize).copied().unwrap_or(Tag { begin: false, kind: None });

        match (tag.kind, current) {
            (Some(kind), Some((open_kind, open_start, _))) if !tag.begin && kind == open_kind => {
                current = Some((open_kind, open_start, end));
            }
            (Some(kind), _) => {
                if let Some(span) = current.take() {
                    push_span(text, span, &mut entities);
                }
                current = Some((kind, start, end));
            }
            (None, _) => {
                if let Some(span) = current.take() {
                    push_span(text, span, &mut entities);
                }
            }
        }
    }
    if let Some(span) = current {
        push_span(text, span, &mut entities);
    }

    entities
}

fn push_span(text: &str, (kind, start, end): (EntityKind, usize, usize), entities: &mut Vec<Entity>) {
    if let Some(surface) = text.get(start..end) {
        let surface = surface.trim();
        if !surface.is_empty() {
            entities.push(Entity {
                kind,
                text: surface.to_string(),
            });
        }
    }
}

pub struct BertEntityRecognizer {
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    tags: Vec<Tag>,
    device: Device,
}

impl BertEntityRecognizer {
    pub async fn load(repo_or_path: &str, cache_dir: &Path) -> Result<Self> {
        let start_time = Instant::now();
        info!("Loading entity recognition model: {}", repo_or_path);

        let files = resolve_model_files(repo_or_path, cache_dir).await?;
        let config = load_bert_config(&files.config)?;
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&files.config)?)?;
        let tags = parse_tags(&raw)?;

        let tokenizer = load_tokenizer(&files.tokenizer, MAX_WINDOW)?;
        let device = select_device();
        let vb = load_weights(&files.weights, &device)?;

        let model = BertModel::load(vb.pp("bert"), &config)
            .or_else(|_| BertModel::load(vb.clone(), &config))
            .map_err(|e| MatcherError::ModelLoading(format!("Failed to build NER encoder: {}", e)))?;
        let classifier = candle_nn::linear(config.hidden_size, tags.len(), vb.pp("classifier"))
            .map_err(|e| MatcherError::ModelLoading(format!("Failed to load classifier head: {}", e)))?;

        info!(
            "Entity model loaded in {:.2?} ({} labels)",
            start_time.elapsed(),
            tags.len()
        );

        Ok(Self {
            model,
            classifier,
            tokenizer,
            tags,
            device,
        })
    }

    fn predict(&self, encoding: &Encoding) -> Result<Vec<u32>> {
        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let logits = self.classifier.forward(&hidden)?;
        Ok(logits.argmax(D::Minus1)?.squeeze(0)?.to_vec1::<u32>()?)
    }
}

impl EntityRecognizer for BertEntityRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| MatcherError::Embedding(format!("Tokenization failed: {}", e)))?;

        let mut entities = Vec::new();
        for window in std::iter::once(&encoding).chain(encoding.get_overflowing().iter()) {
            let predictions = self.predict(window)?;
            entities.extend(decode_spans(
                text,
                window.get_offsets(),
                window.get_special_tokens_mask(),
                &predictions,
                &self.tags,
            ));
        }
        Ok(entities)
    }
}
