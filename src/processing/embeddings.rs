//! Sentence embeddings with a BERT encoder running on Candle

use crate::error::{MatcherError, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokenizers::{Tokenizer, TruncationParams};

/// Dimensionality of every stored and query embedding. Changing it
/// invalidates all persisted vectors.
pub const EMBEDDING_DIM: usize = 384;

/// A dense vector of exactly [`EMBEDDING_DIM`] components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `1 - cosine_similarity`; a zero vector is treated as orthogonal to everything
    pub fn cosine_distance(&self, other: &EmbeddingVector) -> f32 {
        1.0 - cosine_similarity(&self.0, &other.0)
    }
}

impl TryFrom<Vec<f32>> for EmbeddingVector {
    type Error = MatcherError;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        if values.len() != EMBEDDING_DIM {
            return Err(MatcherError::InvalidEmbedding {
                expected: EMBEDDING_DIM,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }
}

impl From<EmbeddingVector> for Vec<f32> {
    fn from(vector: EmbeddingVector) -> Self {
        vector.0
    }
}

/// Calculate cosine similarity between two equal-length slices
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Text to vector. Implementations are loaded once and shared read-only
/// between concurrent callers.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    fn model_name(&self) -> &str;
}

/// Pick the best available device (GPU if compiled in and present, CPU otherwise)
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Using CUDA GPU for inference");
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            info!("Using Metal GPU for inference");
            return device;
        }
    }

    Device::Cpu
}

/// Files making up a HuggingFace BERT checkpoint
pub(crate) struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// Resolve `repo_or_path` to local files: a directory is used as-is,
/// anything else is treated as a hub repo id and fetched into `cache_dir`.
pub(crate) async fn resolve_model_files(repo_or_path: &str, cache_dir: &Path) -> Result<ModelFiles> {
    let local = Path::new(repo_or_path);
    if local.is_dir() {
        let files = ModelFiles {
            config: local.join("config.json"),
            tokenizer: local.join("tokenizer.json"),
            weights: local.join("model.safetensors"),
        };
        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.exists() {
                return Err(MatcherError::ModelLoading(format!(
                    "Local model folder is missing {}",
                    path.display()
                )));
            }
        }
        return Ok(files);
    }

    let api = hf_hub::api::tokio::ApiBuilder::new()
        .with_cache_dir(cache_dir.to_path_buf())
        .build()
        .map_err(|e| MatcherError::ModelLoading(format!("Failed to initialize HF API: {}", e)))?;
    let repo = api.model(repo_or_path.to_string());

    let fetch = |name: &'static str| {
        let repo = &repo;
        async move {
            repo.get(name).await.map_err(|e| {
                MatcherError::ModelLoading(format!("Failed to fetch {} from {}: {}", name, repo_or_path, e))
            })
        }
    };

    Ok(ModelFiles {
        config: fetch("config.json").await?,
        tokenizer: fetch("tokenizer.json").await?,
        weights: fetch("model.safetensors").await?,
    })
}

pub(crate) fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| MatcherError::ModelLoading(format!("Failed to load tokenizer: {}", e)))?;
    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| MatcherError::ModelLoading(format!("Invalid truncation settings: {}", e)))?;
    Ok(tokenizer)
}

pub(crate) fn load_bert_config(path: &Path) -> Result<BertConfig> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| MatcherError::ModelLoading(format!("Invalid BERT config {}: {}", path.display(), e)))
}

pub(crate) fn load_weights(path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    // Safety: the weights file is not modified while the mapping is alive
    unsafe { VarBuilder::from_mmaped_safetensors(&[path], DTYPE, device) }
        .map_err(|e| MatcherError::ModelLoading(format!("Failed to map {}: {}", path.display(), e)))
}

/// BERT sentence encoder: mean pooling over the attention mask, then L2 normalisation
pub struct SentenceEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
}

impl SentenceEncoder {
    pub async fn load(repo_or_path: &str, cache_dir: &Path, max_sequence_length: usize) -> Result<Self> {
        let start_time = Instant::now();
        info!("Loading embedding model: {}", repo_or_path);

        let files = resolve_model_files(repo_or_path, cache_dir).await?;
        let config = load_bert_config(&files.config)?;
        if config.hidden_size != EMBEDDING_DIM {
            return Err(MatcherError::ModelLoading(format!(
                "{} produces {}-dimensional embeddings, expected {}",
                repo_or_path, config.hidden_size, EMBEDDING_DIM
            )));
        }

        let tokenizer = load_tokenizer(&files.tokenizer, max_sequence_length)?;
        let device = select_device();
        let vb = load_weights(&files.weights, &device)?;
        let model = BertModel::load(vb, &config)
            .map_err(|e| MatcherError::ModelLoading(format!("Failed to build BERT model: {}", e)))?;

        info!("Embedding model loaded in {:.2?}", start_time.elapsed());

        Ok(Self {
            model,
            tokenizer,
            device,
            model_name: repo_or_path.to_string(),
        })
    }
}

impl Embedder for SentenceEncoder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| MatcherError::Embedding(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        // (1, seq, hidden)
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?;
        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norm)?;

        let values = normalized.squeeze(0)?.to_vec1::<f32>()?;
        EmbeddingVector::try_from(values)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
