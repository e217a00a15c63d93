use ndarray::{Array3, ArrayView2};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::{
    model::{
        MultiHeadAttention, ModelError,
        layers::{FeedForward, LayerNorm},
    },
    utils::apply_dropout_3d,
};

/// A single post-norm encoder block.
///
/// Self-attention and feed-forward sublayers, each wrapped as
/// `norm(x + dropout(sublayer(x)))`. The residual is taken from the sublayer
/// input, and normalization runs after the residual sum.
#[derive(Debug, Serialize, Deserialize)]
pub struct EncoderBlock {
    pub attention: MultiHeadAttention,
    pub norm1: LayerNorm,
    pub ffn: FeedForward,
    pub norm2: LayerNorm,
    dropout_rate: f32,
}

impl EncoderBlock {
    pub fn new(
        d_model: usize,
        num_heads: usize,
        d_ff: usize,
        dropout_rate: f32,
        layer_norm_eps: f32,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            attention: MultiHeadAttention::new(num_heads, d_model)?,
            norm1: LayerNorm::new(d_model, layer_norm_eps),
            ffn: FeedForward::new(d_model, d_ff, dropout_rate)?,
            norm2: LayerNorm::new(d_model, layer_norm_eps),
            dropout_rate,
        })
    }

    /// Applies the block to `x` (`[batch, seq, d_model]`).
    ///
    /// Both masks are forwarded to the self-attention sublayer. The attention
    /// weights it returns are dropped here; callers that need them use
    /// [`MultiHeadAttention::forward`] directly.
    pub fn forward(
        &self,
        x: &Array3<f32>,
        padding_mask: Option<ArrayView2<f32>>,
        causal_mask: Option<ArrayView2<f32>>,
        training: bool,
        rng: &mut Option<SmallRng>,
    ) -> Result<Array3<f32>, ModelError> {
        // Self-attention sublayer
        let (mut attended, _) = self.attention.forward(x, None, padding_mask, causal_mask)?;
        apply_dropout_3d(&mut attended, self.dropout_rate, training, rng);
        attended += x;
        let x = self.norm1.forward(attended.view());

        // Feed-forward sublayer
        let mut ffn_out = self.ffn.forward(&x, training, rng);
        apply_dropout_3d(&mut ffn_out, self.dropout_rate, training, rng);
        ffn_out += &x;
        Ok(self.norm2.forward(ffn_out.view()))
    }
}
