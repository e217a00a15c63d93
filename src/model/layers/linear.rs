use super::super::error::ModelError;
use ndarray::{Array, Array1, Array2, Array3, ArrayView3, linalg::general_mat_mul};
use ndarray_rand::RandomExt;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Serialize, Deserialize};

/// A linear (fully-connected) layer applied position-wise.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Linear {
    pub weight: Array2<f32>, // [input_dim, output_dim]
    pub bias: Array1<f32>,   // [output_dim]
}

impl Linear {
    pub fn new(input_dim: usize, output_dim: usize) -> Result<Self, ModelError> {
        let mut rng = rand::thread_rng();
        let normal = Normal::new(0.0, 0.02)
            .map_err(|e| ModelError::InitializationError(e.to_string()))?;

        Ok(Self {
            weight: Array2::from_shape_fn((input_dim, output_dim), |_| normal.sample(&mut rng)),
            bias: Array1::zeros(output_dim),
        })
    }

    /// Xavier-uniform initialization: weights drawn from
    /// `U(-limit, limit)` with `limit = sqrt(6 / (input_dim + output_dim))`,
    /// bias zero. Used for the attention projections.
    pub fn xavier(input_dim: usize, output_dim: usize) -> Result<Self, ModelError> {
        if input_dim == 0 || output_dim == 0 {
            return Err(ModelError::InitializationError(format!(
                "Linear layer dimensions must be nonzero, got {}x{}",
                input_dim, output_dim
            )));
        }
        let limit = (6.0 / (input_dim + output_dim) as f32).sqrt();

        Ok(Self {
            weight: Array::random((input_dim, output_dim), Uniform::new(-limit, limit)),
            bias: Array1::zeros(output_dim),
        })
    }

    /// Forward pass for 3D input: `[batch_size, seq_len, input_dim]` ->
    /// `[batch_size, seq_len, output_dim]`. The batch and sequence axes are
    /// flattened into one matrix multiplication.
    pub fn forward(&self, x: ArrayView3<f32>) -> Array3<f32> {
        let (batch_size, seq_len, input_dim) = x.dim();
        let output_dim = self.bias.len();

        let x_2d = x.into_shape((batch_size * seq_len, input_dim)).unwrap();
        let mut output = Array2::zeros((batch_size * seq_len, output_dim));
        general_mat_mul(1.0, &x_2d, &self.weight, 0.0, &mut output);
        output += &self.bias;

        output
            .into_shape((batch_size, seq_len, output_dim))
            .unwrap()
    }
}
