use ndarray::{Array1, Array3, ArrayView3, s};
use serde::{Deserialize, Serialize};

/// Layer normalization with learnable scale and shift.
///
/// Normalizes each position's `d_model` vector to zero mean and unit
/// variance (population variance) before applying gamma/beta.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LayerNorm {
    pub gamma: Array1<f32>,
    pub beta: Array1<f32>,
    eps: f32,
}

impl LayerNorm {
    pub fn new(dim: usize, eps: f32) -> Self {
        Self {
            gamma: Array1::ones(dim),
            beta: Array1::zeros(dim),
            eps,
        }
    }

    /// Forward pass: input shape `[batch_size, seq_len, d_model]`.
    pub fn forward(&self, x: ArrayView3<f32>) -> Array3<f32> {
        let (batch_size, seq_len, d_model) = x.dim();
        let mut output = Array3::zeros((batch_size, seq_len, d_model));

        for b in 0..batch_size {
            for t in 0..seq_len {
                let x_row = x.slice(s![b, t, ..]);
                let mut y_row = output.slice_mut(s![b, t, ..]);

                let mean = x_row.mean().unwrap();
                let var = x_row.var(0.0);
                let std = (var + self.eps).sqrt();

                for i in 0..d_model {
                    let normalized = (x_row[i] - mean) / std;
                    y_row[i] = normalized * self.gamma[i] + self.beta[i];
                }
            }
        }

        output
    }
}
