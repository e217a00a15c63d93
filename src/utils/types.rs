use ndarray::Array2;
use serde::{Serialize, Deserialize};

/// A trainable matrix paired with its gradient accumulator.
///
/// The core never steps weights itself; an external optimizer reads
/// `gradient` and updates `weight` between forward passes. The gradient
/// buffer always has the same shape as the weight so scatter-adds from a
/// backward pass land without reallocation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ParameterWithGrad {
    pub weight: Array2<f32>,
    pub gradient: Array2<f32>,
}

impl ParameterWithGrad {
    /// Wraps a weight matrix with a zeroed, same-shaped gradient buffer.
    pub fn new(weight: Array2<f32>) -> Self {
        let gradient = Array2::zeros(weight.raw_dim());
        Self { weight, gradient }
    }

    pub fn zero_grad(&mut self) {
        self.gradient.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gradient_matches_weight_shape() {
        let param = ParameterWithGrad::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(param.gradient.dim(), (2, 3));
        assert!(param.gradient.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_zero_grad_clears_accumulated_values() {
        let mut param = ParameterWithGrad::new(array![[1.0, 2.0]]);
        param.gradient[[0, 0]] = 3.5;
        param.gradient[[0, 1]] = -1.0;

        param.zero_grad();

        assert_eq!(param.gradient.dim(), (1, 2));
        assert!(param.gradient.iter().all(|&g| g == 0.0));
    }
}
