use ndarray::{Array2, Array3, ArrayView2, s};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::{
    model::{ModelError, encoder::EncoderBlock},
    utils::build_causal_mask,
};

/// A stack of identically-shaped encoder blocks.
///
/// The causal mask, when enabled, is built once at construction as a
/// `[seq_len, seq_len]` lower-triangular table and shared by every block and
/// every batch; it depends on positions only. Shorter inputs use the top-left
/// slice of the table. The padding mask is per-call state and is handed to
/// each block unchanged.
#[derive(Debug, Serialize, Deserialize)]
pub struct Encoder {
    pub blocks: Vec<EncoderBlock>,
    causal_mask: Option<Array2<f32>>,
    seq_len: usize,
}

impl Encoder {
    pub fn new(
        num_layers: usize,
        num_heads: usize,
        d_model: usize,
        d_ff: usize,
        dropout_rate: f32,
        layer_norm_eps: f32,
        seq_len: usize,
        causal: bool,
    ) -> Result<Self, ModelError> {
        let mut blocks = Vec::with_capacity(num_layers);
        for _ in 0..num_layers {
            blocks.push(EncoderBlock::new(
                d_model,
                num_heads,
                d_ff,
                dropout_rate,
                layer_norm_eps,
            )?);
        }

        Ok(Self {
            blocks,
            causal_mask: causal.then(|| build_causal_mask(seq_len)),
            seq_len,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_causal(&self) -> bool {
        self.causal_mask.is_some()
    }

    /// Threads `x` (`[batch, seq, d_model]`) through every block in order.
    ///
    /// In causal mode the input may be at most `seq_len` positions long;
    /// without a causal mask any length is accepted.
    pub fn forward(
        &self,
        mut x: Array3<f32>,
        padding_mask: Option<ArrayView2<f32>>,
        training: bool,
        rng: &mut Option<SmallRng>,
    ) -> Result<Array3<f32>, ModelError> {
        let seq_q = x.dim().1;
        if self.causal_mask.is_some() && seq_q > self.seq_len {
            return Err(ModelError::DimensionMismatch(format!(
                "sequence length {} exceeds causal mask size {}",
                seq_q, self.seq_len
            )));
        }
        let causal = self
            .causal_mask
            .as_ref()
            .map(|m| m.slice(s![..seq_q, ..seq_q]));

        for block in &self.blocks {
            x = block.forward(&x, padding_mask, causal, training, rng)?;
        }
        Ok(x)
    }
}
