//! Configuration management for the resume matcher

use crate::error::{MatcherError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub matching: MatchingConfig,
    pub redaction: RedactionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Cache directory handed to the HuggingFace hub client
    pub models_dir: PathBuf,
    pub embedding_model: String,
    pub entity_model: Option<String>,
    pub max_sequence_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub default_top_n: usize,
    pub default_search_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    pub use_entity_model: bool,
}

impl Default for Config {
    fn default() -> Self {
        let models_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".resume-matcher")
            .join("models");

        Self {
            models: ModelConfig {
                models_dir,
                embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
                entity_model: Some("dslim/bert-base-NER".to_string()),
                max_sequence_length: 256,
            },
            matching: MatchingConfig {
                default_top_n: 5,
                default_search_k: 3,
            },
            redaction: RedactionConfig {
                use_entity_model: true,
            },
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| MatcherError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MatcherError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-matcher")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.embedding_model.trim().is_empty() {
            return Err(MatcherError::Configuration(
                "models.embedding_model must not be empty".to_string(),
            ));
        }
        if self.models.max_sequence_length == 0 {
            return Err(MatcherError::Configuration(
                "models.max_sequence_length must be positive".to_string(),
            ));
        }
        if self.matching.default_top_n == 0 || self.matching.default_search_k == 0 {
            return Err(MatcherError::Configuration(
                "matching defaults must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Entity model to try at startup, if redaction is allowed to use one
    pub fn entity_model(&self) -> Option<&str> {
        if self.redaction.use_entity_model {
            self.models.entity_model.as_deref()
        } else {
            None
        }
    }

    pub fn ensure_models_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.models.models_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matching.default_top_n, 5);
        assert_eq!(config.matching.default_search_k, 3);
        assert_eq!(config.entity_model(), Some("dslim/bert-base-NER"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.matching.default_top_n = 9;
        config.redaction.use_entity_model = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.matching.default_top_n, 9);
        assert_eq!(loaded.entity_model(), None);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.matching.default_search_k = 0;
        config.save_to(&path).unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, MatcherError::Configuration(_)));
    }

    #[test]
    fn test_garbage_config_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "models = 3").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(MatcherError::Configuration(_))
        ));
    }
}
