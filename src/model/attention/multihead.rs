use ndarray::{Array3, Array4, ArrayView2, s};
use serde::{Deserialize, Serialize};

use crate::{
    model::{ModelError, layers::Linear},
    utils::{apply_causal_mask, apply_padding_mask, softmax_4d},
};

/// Multi-head scaled dot-product attention layer.
///
/// Queries are projected from the `query` input; keys and values are both
/// projected from the `value` input, or from `query` itself when no separate
/// `value` is supplied (self-attention). Masked score entries are suppressed
/// additively before the softmax, so a position excluded by either mask
/// receives (numerically) zero weight.
#[derive(Debug, Serialize, Deserialize)]
pub struct MultiHeadAttention {
    pub num_heads: usize,
    pub d_model: usize,
    pub d_head: usize,
    pub w_q: Linear,
    pub w_k: Linear,
    pub w_v: Linear,
    pub w_out: Linear,
}

impl MultiHeadAttention {
    /// Creates an attention layer with Xavier-uniform projection weights and
    /// zero biases. Fails if `d_model` does not divide evenly across
    /// `num_heads`.
    pub fn new(num_heads: usize, d_model: usize) -> Result<Self, ModelError> {
        if num_heads == 0 {
            return Err(ModelError::ConfigError(
                "num_heads must be greater than zero".to_string(),
            ));
        }
        if d_model % num_heads != 0 {
            return Err(ModelError::ConfigError(format!(
                "d_model {} is not divisible by num_heads {}",
                d_model, num_heads
            )));
        }

        Ok(Self {
            num_heads,
            d_model,
            d_head: d_model / num_heads,
            w_q: Linear::xavier(d_model, d_model)?,
            w_k: Linear::xavier(d_model, d_model)?,
            w_v: Linear::xavier(d_model, d_model)?,
            w_out: Linear::xavier(d_model, d_model)?,
        })
    }

    /// Runs attention over a batch.
    ///
    /// * `query`: `[batch, seq_q, d_model]`
    /// * `value`: `[batch, seq_k, d_model]`, keys and values; defaults to `query`
    /// * `padding_mask`: `[batch, seq_k]`, `0.0` marks keys to exclude
    /// * `causal_mask`: `[seq_q, seq_k]`, `0.0` marks forbidden pairs
    ///
    /// Returns the projected output `[batch, seq_q, d_model]` and the
    /// post-softmax attention weights `[batch, num_heads, seq_q, seq_k]`.
    pub fn forward(
        &self,
        query: &Array3<f32>,
        value: Option<&Array3<f32>>,
        padding_mask: Option<ArrayView2<f32>>,
        causal_mask: Option<ArrayView2<f32>>,
    ) -> Result<(Array3<f32>, Array4<f32>), ModelError> {
        let (batch_size, seq_q, query_dim) = query.dim();
        if query_dim != self.d_model {
            return Err(ModelError::DimensionMismatch(format!(
                "query feature dimension {} does not match d_model {}",
                query_dim, self.d_model
            )));
        }

        let value = value.unwrap_or(query);
        let (value_batch, seq_k, value_dim) = value.dim();
        if value_dim != self.d_model {
            return Err(ModelError::DimensionMismatch(format!(
                "value feature dimension {} does not match d_model {}",
                value_dim, self.d_model
            )));
        }
        if value_batch != batch_size {
            return Err(ModelError::DimensionMismatch(format!(
                "value batch size {} does not match query batch size {}",
                value_batch, batch_size
            )));
        }
        if let Some(mask) = &padding_mask {
            if mask.dim() != (batch_size, seq_k) {
                return Err(ModelError::DimensionMismatch(format!(
                    "padding mask shape {:?} does not match (batch, seq_k) ({}, {})",
                    mask.dim(),
                    batch_size,
                    seq_k
                )));
            }
        }
        if let Some(mask) = &causal_mask {
            if mask.dim() != (seq_q, seq_k) {
                return Err(ModelError::DimensionMismatch(format!(
                    "causal mask shape {:?} does not match (seq_q, seq_k) ({}, {})",
                    mask.dim(),
                    seq_q,
                    seq_k
                )));
            }
        }

        // 1. Project inputs and split into heads
        let q_heads = self.split_heads(self.w_q.forward(query.view()));
        let k_heads = self.split_heads(self.w_k.forward(value.view()));
        let v_heads = self.split_heads(self.w_v.forward(value.view()));

        // 2. Compute attention scores (QK^T / sqrt(d_head))
        let scale = (self.d_head as f32).sqrt();
        let mut scores = Array4::<f32>::zeros((batch_size, self.num_heads, seq_q, seq_k));
        for b in 0..batch_size {
            for h in 0..self.num_heads {
                let q_head = q_heads.slice(s![b, h, .., ..]);
                let k_head = k_heads.slice(s![b, h, .., ..]);
                let mut dot = q_head.dot(&k_head.t());
                dot.mapv_inplace(|x| x / scale);
                scores.slice_mut(s![b, h, .., ..]).assign(&dot);
            }
        }

        // 3. Apply masks, then softmax over the key axis
        if let Some(mask) = &padding_mask {
            apply_padding_mask(&mut scores, mask);
        }
        if let Some(mask) = &causal_mask {
            apply_causal_mask(&mut scores, mask);
        }
        let mut attn_weights = scores;
        softmax_4d(&mut attn_weights);

        // 4. Compute weighted sum of values
        let mut context = Array4::<f32>::zeros((batch_size, self.num_heads, seq_q, self.d_head));
        for b in 0..batch_size {
            for h in 0..self.num_heads {
                let weights = attn_weights.slice(s![b, h, .., ..]);
                let values = v_heads.slice(s![b, h, .., ..]);
                context
                    .slice_mut(s![b, h, .., ..])
                    .assign(&weights.dot(&values));
            }
        }

        // 5. Merge heads and project output
        let merged = self.merge_heads(context);
        let output = self.w_out.forward(merged.view());

        Ok((output, attn_weights))
    }

    /// Reshapes `[batch, seq, d_model]` into `[batch, num_heads, seq, d_head]`.
    fn split_heads(&self, x: Array3<f32>) -> Array4<f32> {
        let (batch_size, seq_len, _) = x.dim();
        x.into_shape((batch_size, seq_len, self.num_heads, self.d_head))
            .unwrap()
            .permuted_axes([0, 2, 1, 3])
    }

    /// Inverse of [`Self::split_heads`].
    fn merge_heads(&self, x: Array4<f32>) -> Array3<f32> {
        let (batch_size, _, seq_len, _) = x.dim();
        x.permuted_axes([0, 2, 1, 3])
            .as_standard_layout()
            .to_owned()
            .into_shape((batch_size, seq_len, self.d_model))
            .unwrap()
    }
}
