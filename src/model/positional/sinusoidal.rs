use ndarray::{Array3, ArrayView3, Axis, s};
use serde::{Serialize, Deserialize};

use crate::model::ModelError;

/// Fixed sinusoidal positional encoding.
///
/// The table is computed once at construction and never mutated; it is not
/// a trainable parameter. Each column `i` uses its own index in the
/// frequency exponent: `angle(pos, i) = pos / 10000^((2*i)/d_model)`, with
/// even columns taking `sin(angle)` and odd columns `cos(angle)`. This is
/// not the paired-column scheme from the Transformer paper: adjacent
/// columns do not share a frequency.
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionalEncoding {
    pe: Array3<f32>, // [1, seq_length, d_model]
    seq_length: usize,
    d_model: usize,
}

impl PositionalEncoding {
    pub fn new(seq_length: usize, d_model: usize) -> Self {
        let mut encoding = ndarray::Array2::<f32>::zeros((seq_length, d_model));

        for pos in 0..seq_length {
            for i in 0..d_model {
                let angle = pos as f32 / 10000.0f32.powf((2 * i) as f32 / d_model as f32);
                if i % 2 == 0 {
                    encoding[[pos, i]] = angle.sin();
                } else {
                    encoding[[pos, i]] = angle.cos();
                }
            }
        }

        Self {
            pe: encoding.insert_axis(Axis(0)),
            seq_length,
            d_model,
        }
    }

    /// Returns the first `seq_len` rows of the table as a
    /// `[1, seq_len, d_model]` view, broadcastable over the batch axis.
    pub fn forward(&self, seq_len: usize) -> Result<ArrayView3<f32>, ModelError> {
        if seq_len > self.seq_length {
            return Err(ModelError::DimensionMismatch(format!(
                "Sequence length {} exceeds positional table length {}",
                seq_len, self.seq_length
            )));
        }
        Ok(self.pe.slice(s![.., ..seq_len, ..]))
    }

    pub fn seq_length(&self) -> usize {
        self.seq_length
    }

    pub fn d_model(&self) -> usize {
        self.d_model
    }
}
