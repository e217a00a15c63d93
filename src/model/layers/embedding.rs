use super::super::error::ModelError;
use ndarray::{Array2, Array3, ArrayView3, s};
use rand_distr::{Distribution, Normal};
use serde::{Serialize, Deserialize};

use crate::model::positional::PositionalEncoding;
use crate::utils::ParameterWithGrad;

/// Token embedding combined with the additive sinusoidal positional signal.
///
/// When padding is enabled, token id 0 is reserved: its row is zeroed at
/// construction and `backward` never scatters gradient into it, so the row
/// stays zero through any number of external optimizer steps.
#[derive(Debug, Serialize, Deserialize)]
pub struct Embedding {
    pub table: ParameterWithGrad, // [vocab_size, d_model]
    positional: PositionalEncoding,
    enable_padding: bool,
}

impl Embedding {
    pub fn new(
        vocab_size: usize,
        d_model: usize,
        seq_length: usize,
        enable_padding: bool,
    ) -> Result<Self, ModelError> {
        let mut rng = rand::thread_rng();
        let normal = Normal::new(0.0, 0.02)
            .map_err(|e| ModelError::InitializationError(e.to_string()))?;

        let mut weight =
            Array2::from_shape_fn((vocab_size, d_model), |_| normal.sample(&mut rng));
        if enable_padding {
            weight.row_mut(0).fill(0.0);
        }

        Ok(Self {
            table: ParameterWithGrad::new(weight),
            positional: PositionalEncoding::new(seq_length, d_model),
            enable_padding,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.table.weight.nrows()
    }

    pub fn d_model(&self) -> usize {
        self.table.weight.ncols()
    }

    /// Forward pass: `[batch_size, seq_len]` token ids ->
    /// `[batch_size, seq_len, d_model]` vectors with positional signal added.
    pub fn forward(&self, token_ids: &Array2<usize>) -> Result<Array3<f32>, ModelError> {
        let (batch_size, seq_len) = token_ids.dim();
        let d_model = self.d_model();
        let vocab_size = self.vocab_size();

        let pe = self.positional.forward(seq_len)?;

        let mut output = Array3::zeros((batch_size, seq_len, d_model));
        for b in 0..batch_size {
            for t in 0..seq_len {
                let token_id = token_ids[[b, t]];
                if token_id >= vocab_size {
                    return Err(ModelError::ForwardError(format!(
                        "Token id {} out of range for vocabulary of size {}",
                        token_id, vocab_size
                    )));
                }
                output
                    .slice_mut(s![b, t, ..])
                    .assign(&self.table.weight.row(token_id));
            }
        }

        output += &pe;
        Ok(output)
    }

    /// Backward pass: scatter-adds `[b, t, :]` gradient rows into the
    /// gradient buffer of the looked-up token rows. The reserved padding
    /// row receives nothing.
    pub fn backward(
        &mut self,
        token_ids: &Array2<usize>,
        grad_output: ArrayView3<f32>,
    ) -> Result<(), ModelError> {
        let (batch_size, seq_len) = token_ids.dim();
        if grad_output.dim() != (batch_size, seq_len, self.d_model()) {
            return Err(ModelError::DimensionMismatch(format!(
                "Gradient shape {:?} does not match token ids {:?} with d_model {}",
                grad_output.dim(),
                token_ids.dim(),
                self.d_model()
            )));
        }

        let vocab_size = self.vocab_size();
        for b in 0..batch_size {
            for t in 0..seq_len {
                let token_id = token_ids[[b, t]];
                if token_id >= vocab_size {
                    return Err(ModelError::ForwardError(format!(
                        "Token id {} out of range for vocabulary of size {}",
                        token_id, vocab_size
                    )));
                }
                if self.enable_padding && token_id == 0 {
                    continue;
                }
                let grad = grad_output.slice(s![b, t, ..]);
                let mut row = self.table.gradient.row_mut(token_id);
                row += &grad;
            }
        }
        Ok(())
    }

    pub fn zero_grad(&mut self) {
        self.table.zero_grad();
    }
}
