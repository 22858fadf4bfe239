//! Encoder configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use mlm_bias::{Error, Result};

/// Configuration for the reference masked-language encoder
///
/// Field names follow a BERT-style `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Vocabulary size
    pub vocab_size: usize,

    /// Hidden dimension size
    pub hidden_size: usize,

    /// Number of encoder layers
    pub num_hidden_layers: usize,

    /// Number of attention heads
    pub num_attention_heads: usize,

    /// Intermediate size for the MLP
    pub intermediate_size: usize,

    /// Maximum sequence length, including boundary tokens
    #[serde(default = "default_max_position_embeddings")]
    pub max_position_embeddings: usize,

    /// RMS norm epsilon
    #[serde(default = "default_norm_eps")]
    pub norm_eps: f32,
}

fn default_max_position_embeddings() -> usize {
    512
}

fn default_norm_eps() -> f32 {
    1e-6
}

impl EncoderConfig {
    /// Load configuration from a JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// configuration is inconsistent
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a JSON string
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or the configuration is
    /// inconsistent
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every dimension is non-zero and the hidden size splits
    /// evenly across heads.
    ///
    /// # Errors
    /// Returns `Other` describing the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("vocab_size", self.vocab_size),
            ("hidden_size", self.hidden_size),
            ("num_hidden_layers", self.num_hidden_layers),
            ("num_attention_heads", self.num_attention_heads),
            ("intermediate_size", self.intermediate_size),
            ("max_position_embeddings", self.max_position_embeddings),
        ];
        if let Some((name, _)) = dims.iter().find(|(_, v)| *v == 0) {
            return Err(Error::Other(format!("encoder config: {name} must be non-zero")));
        }
        if self.hidden_size % self.num_attention_heads != 0 {
            return Err(Error::Other(format!(
                "encoder config: hidden_size {} is not divisible by {} heads",
                self.hidden_size, self.num_attention_heads
            )));
        }
        Ok(())
    }

    /// Get the head dimension
    #[must_use]
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }
}
