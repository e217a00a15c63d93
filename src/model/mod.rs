//! Sequence encoder model implementation

mod attention;
mod config;
mod encoder;
mod error;
mod layers;
mod positional;

pub use attention::MultiHeadAttention;
pub use config::EncoderConfig;
pub use encoder::{Encoder, EncoderBlock};
pub use error::ModelError;
pub use layers::{Embedding, FeedForward, LayerNorm, Linear};
pub use positional::PositionalEncoding;

use ndarray::{Array2, Array3, ArrayView2};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Complete encoder architecture: token embedding plus the block stack.
#[derive(Serialize, Deserialize)]
pub struct SequenceEncoder {
    pub(crate) config: EncoderConfig,
    pub(crate) embedding: Embedding,
    pub(crate) encoder: Encoder,
}

impl SequenceEncoder {
    /// Creates a new encoder with initialized weights.
    ///
    /// The configuration is validated up front; no layer is built if any
    /// field is invalid.
    pub fn new(config: EncoderConfig) -> Result<Self, ModelError> {
        config.validate()?;

        let embedding = Embedding::new(
            config.vocab_size,
            config.d_model,
            config.seq_length,
            config.enable_padding,
        )?;
        let encoder = Encoder::new(
            config.num_layers,
            config.num_heads,
            config.d_model,
            config.d_ff(),
            config.dropout,
            config.layer_norm_eps,
            config.seq_length,
            config.causal_mask,
        )?;

        Ok(Self {
            config,
            embedding,
            encoder,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encodes a batch of token id sequences.
    ///
    /// `token_ids` is `[batch, seq_len]` with `seq_len <= seq_length`;
    /// `padding_mask`, when given, is `[batch, seq_len]` with `0.0` marking
    /// padded positions. Returns hidden states `[batch, seq_len, d_model]`.
    pub fn forward(
        &self,
        token_ids: &Array2<usize>,
        padding_mask: Option<ArrayView2<f32>>,
        training: bool,
        rng: &mut Option<SmallRng>,
    ) -> Result<Array3<f32>, ModelError> {
        let embedded = self.embedding.forward(token_ids)?;
        self.encoder.forward(embedded, padding_mask, training, rng)
    }
}
