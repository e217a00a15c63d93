use serde::{Deserialize, Serialize};

use super::error::ModelError;

/// Configuration for the sequence encoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    // --- Architecture ---
    pub d_model: usize,      // Dimension of token embeddings and all hidden states
    pub vocab_size: usize,   // Number of unique token ids (id 0 is the padding slot)
    pub seq_length: usize,   // Maximum input sequence length (positional table size)
    pub num_layers: usize,   // Number of stacked encoder blocks
    pub num_heads: usize,    // Parallel attention heads; must divide d_model
    #[serde(default)]
    pub d_ff: Option<usize>, // Feed-forward hidden width; defaults to 2 * d_model

    // --- Regularization ---
    #[serde(default = "default_dropout")]
    pub dropout: f32, // Dropout rate for residual sublayers and the feed-forward hidden state
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f32,

    // --- Masking ---
    #[serde(default)]
    pub causal_mask: bool, // Restrict attention to non-future positions
    #[serde(default)]
    pub enable_padding: bool, // Reserve token id 0 as an all-zero, gradient-blocked row
}

fn default_dropout() -> f32 {
    0.1
}
fn default_layer_norm_eps() -> f32 {
    1e-5
}

impl EncoderConfig {
    /// Feed-forward hidden width, falling back to `2 * d_model`.
    pub fn d_ff(&self) -> usize {
        self.d_ff.unwrap_or(2 * self.d_model)
    }

    /// Checks the configuration once, before any layer is built.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.d_model == 0 {
            return Err(ModelError::ConfigError(
                "d_model must be greater than zero".to_string(),
            ));
        }
        if self.vocab_size == 0 {
            return Err(ModelError::ConfigError(
                "vocab_size must be greater than zero".to_string(),
            ));
        }
        if self.seq_length == 0 {
            return Err(ModelError::ConfigError(
                "seq_length must be greater than zero".to_string(),
            ));
        }
        if self.num_layers == 0 {
            return Err(ModelError::ConfigError(
                "num_layers must be greater than zero".to_string(),
            ));
        }
        if self.num_heads == 0 {
            return Err(ModelError::ConfigError(
                "num_heads must be greater than zero".to_string(),
            ));
        }
        if self.d_model % self.num_heads != 0 {
            return Err(ModelError::ConfigError(format!(
                "d_model {} is not divisible by num_heads {}",
                self.d_model, self.num_heads
            )));
        }
        if self.d_ff() == 0 {
            return Err(ModelError::ConfigError(
                "d_ff must be greater than zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::ConfigError(format!(
                "dropout {} must lie in [0, 1)",
                self.dropout
            )));
        }
        if self.layer_norm_eps <= 0.0 {
            return Err(ModelError::ConfigError(format!(
                "layer_norm_eps {} must be positive",
                self.layer_norm_eps
            )));
        }
        Ok(())
    }
}
