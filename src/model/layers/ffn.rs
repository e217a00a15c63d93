use ndarray::Array3;
use rand::rngs::SmallRng;
use serde::{Serialize, Deserialize};

use crate::model::{Linear, ModelError};
use crate::utils::apply_dropout_3d;

/// Position-wise feed-forward sublayer: expansion to `d_ff`, dropout,
/// ReLU, contraction back to `d_model`.
///
/// The inner dropout sits between the first linear map and the ReLU, not
/// after the activation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FeedForward {
    pub linear1: Linear, // d_model × d_ff
    pub linear2: Linear, // d_ff × d_model
    dropout_rate: f32,
}

impl FeedForward {
    pub fn new(d_model: usize, d_ff: usize, dropout_rate: f32) -> Result<Self, ModelError> {
        Ok(Self {
            linear1: Linear::new(d_model, d_ff)?,
            linear2: Linear::new(d_ff, d_model)?,
            dropout_rate,
        })
    }

    pub fn forward(
        &self,
        x: &Array3<f32>,
        training: bool,
        rng: &mut Option<SmallRng>,
    ) -> Array3<f32> {
        let mut hidden = self.linear1.forward(x.view());
        apply_dropout_3d(&mut hidden, self.dropout_rate, training, rng);
        hidden.mapv_inplace(Self::relu);
        self.linear2.forward(hidden.view())
    }

    #[inline]
    fn relu(x: f32) -> f32 {
        x.max(0.0)
    }
}
