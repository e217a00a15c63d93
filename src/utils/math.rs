use ndarray::{Array2, Array3, Array4, ArrayView2, ArrayViewMut2};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Additive fill for suppressed attention logits.
///
/// Large enough that softmax assigns the position ~0 weight, small enough
/// not to overflow `f32` arithmetic. A row where every logit saturates to
/// this value softmaxes to a uniform distribution; callers treat that as
/// policy, not an error.
pub const MASK_FILL: f32 = -9e15;

/// Builds a lower-triangular-inclusive causal mask of shape
/// `[seq_len, seq_len]`: `mask[i][j] == 1.0` iff position `i` may attend
/// to position `j` (`j <= i`), `0.0` otherwise.
pub fn build_causal_mask(seq_len: usize) -> Array2<f32> {
    let mut mask = Array2::<f32>::ones((seq_len, seq_len));
    for i in 0..seq_len {
        for j in (i + 1)..seq_len {
            mask[[i, j]] = 0.0;
        }
    }
    mask
}

/// Suppresses attention logits wherever the causal mask is zero.
///
/// `scores` is `[batch, num_heads, seq_q, seq_k]`; `mask` is
/// `[seq_q, seq_k]`, shared across batches and heads.
pub fn apply_causal_mask(scores: &mut Array4<f32>, mask: &ArrayView2<f32>) {
    for mut batch in scores.outer_iter_mut() {
        for mut head in batch.outer_iter_mut() {
            for (mut score_row, mask_row) in head.rows_mut().into_iter().zip(mask.rows()) {
                for (score, &keep) in score_row.iter_mut().zip(mask_row.iter()) {
                    if keep == 0.0 {
                        *score = MASK_FILL;
                    }
                }
            }
        }
    }
}

/// Suppresses attention logits for keys the padding mask marks as absent.
///
/// `scores` is `[batch, num_heads, seq_q, seq_k]`; `mask` is
/// `[batch, seq_k]` with `0.0` marking a padded key position. The same key
/// columns are suppressed for every head and query position of that batch
/// element.
pub fn apply_padding_mask(scores: &mut Array4<f32>, mask: &ArrayView2<f32>) {
    for (mut batch, mask_row) in scores.outer_iter_mut().into_iter().zip(mask.rows()) {
        for mut head in batch.outer_iter_mut() {
            for mut score_row in head.rows_mut() {
                for (score, &keep) in score_row.iter_mut().zip(mask_row.iter()) {
                    if keep == 0.0 {
                        *score = MASK_FILL;
                    }
                }
            }
        }
    }
}

/// Computes softmax along the last dimension of a 2D array.
pub fn softmax_2d(matrix: &mut ArrayViewMut2<f32>) {
    for mut row in matrix.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));

        let mut sum = 0.0f32;
        for val in row.iter_mut() {
            *val = (*val - max).exp();
            sum += *val;
        }

        for val in row.iter_mut() {
            *val /= sum;
        }
    }
}

/// Computes softmax along the last dimension of a 4D array
/// `[batch, num_heads, seq_q, seq_k]`, i.e. over the key axis.
pub fn softmax_4d(matrix: &mut Array4<f32>) {
    for mut batch in matrix.outer_iter_mut() {
        for mut head in batch.outer_iter_mut() {
            softmax_2d(&mut head);
        }
    }
}

/// Applies inverted dropout to a `[batch, seq_len, d_model]` activation.
///
/// Kept elements are rescaled by `1 / (1 - dropout_rate)` so the expected
/// activation is unchanged; nothing happens unless `training` is set and
/// the rate is positive. A `None` RNG is lazily seeded so a bare call is
/// still reproducible.
pub fn apply_dropout_3d(
    x: &mut Array3<f32>,
    dropout_rate: f32,
    training: bool,
    rng: &mut Option<SmallRng>,
) {
    if !training || dropout_rate <= 0.0 {
        return;
    }

    if rng.is_none() {
        *rng = Some(SmallRng::seed_from_u64(42));
    }

    let keep_prob = 1.0 - dropout_rate;
    let rng = rng.as_mut().unwrap();

    x.mapv_inplace(|v| {
        if rng.r#gen::<f32>() < keep_prob {
            v / keep_prob
        } else {
            0.0
        }
    });
}

/// Builder for a configured dropout RNG; `None` when dropout is disabled.
pub fn build_dropout_rng(dropout_rate: f32, seed: Option<u64>) -> Option<SmallRng> {
    if dropout_rate > 0.0 {
        Some(SmallRng::seed_from_u64(seed.unwrap_or(42)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array3, Array4, array};

    #[test]
    fn test_build_causal_mask_is_lower_triangular_inclusive() {
        let mask = build_causal_mask(4);
        assert_eq!(mask.dim(), (4, 4));
        for i in 0..4 {
            for j in 0..4 {
                let expected = if j <= i { 1.0 } else { 0.0 };
                assert_eq!(mask[[i, j]], expected, "mask[{}][{}]", i, j);
            }
        }
    }

    #[test]
    fn test_apply_causal_mask_fills_upper_triangle() {
        let mut scores = Array4::<f32>::ones((1, 2, 3, 3));
        let mask = build_causal_mask(3);
        apply_causal_mask(&mut scores, &mask.view());

        for h in 0..2 {
            assert_eq!(scores[[0, h, 0, 1]], MASK_FILL);
            assert_eq!(scores[[0, h, 0, 2]], MASK_FILL);
            assert_eq!(scores[[0, h, 1, 2]], MASK_FILL);
            assert_eq!(scores[[0, h, 1, 0]], 1.0);
            assert_eq!(scores[[0, h, 2, 2]], 1.0);
        }
    }

    #[test]
    fn test_apply_padding_mask_fills_key_columns_per_batch() {
        let mut scores = Array4::<f32>::ones((2, 1, 2, 3));
        // Batch 0 pads the last key, batch 1 pads nothing.
        let mask = array![[1.0, 1.0, 0.0], [1.0, 1.0, 1.0]];
        apply_padding_mask(&mut scores, &mask.view());

        for q in 0..2 {
            assert_eq!(scores[[0, 0, q, 0]], 1.0);
            assert_eq!(scores[[0, 0, q, 1]], 1.0);
            assert_eq!(scores[[0, 0, q, 2]], MASK_FILL);
        }
        assert!(scores.slice(ndarray::s![1, .., .., ..]).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_masks_suppress_as_a_union() {
        let mut scores = Array4::<f32>::zeros((1, 1, 2, 2));
        let padding = array![[1.0, 0.0]];
        let causal = build_causal_mask(2);
        apply_padding_mask(&mut scores, &padding.view());
        apply_causal_mask(&mut scores, &causal.view());

        // [0,1] is hit by both masks, [1,1] by padding only.
        assert_eq!(scores[[0, 0, 0, 0]], 0.0);
        assert_eq!(scores[[0, 0, 0, 1]], MASK_FILL);
        assert_eq!(scores[[0, 0, 1, 0]], 0.0);
        assert_eq!(scores[[0, 0, 1, 1]], MASK_FILL);
    }

    #[test]
    fn test_softmax_2d_rows_sum_to_one() {
        let mut matrix = array![[1.0, 2.0, 3.0], [1.0, 1.0, 1.0]];
        softmax_2d(&mut matrix.view_mut());
        for row in matrix.rows() {
            let sum: f32 = row.iter().sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_softmax_4d_rows_sum_to_one() {
        let mut matrix = Array4::<f32>::ones((2, 2, 3, 4));
        softmax_4d(&mut matrix);
        for batch in matrix.outer_iter() {
            for head in batch.outer_iter() {
                for row in head.rows() {
                    let sum: f32 = row.iter().sum();
                    assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_softmax_of_fully_masked_row_is_uniform() {
        let mut scores = Array4::<f32>::from_elem((1, 1, 1, 4), MASK_FILL);
        softmax_4d(&mut scores);
        for k in 0..4 {
            assert_abs_diff_eq!(scores[[0, 0, 0, k]], 0.25, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_dropout_is_identity_in_eval_mode() {
        let mut x = Array3::<f32>::ones((2, 3, 4));
        apply_dropout_3d(&mut x, 0.5, false, &mut None);
        assert!(x.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_dropout_zero_rate_is_identity_in_train_mode() {
        let mut x = Array3::<f32>::ones((2, 3, 4));
        apply_dropout_3d(&mut x, 0.0, true, &mut None);
        assert!(x.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_dropout_drops_and_rescales_in_train_mode() {
        let mut x = Array3::<f32>::ones((4, 8, 8));
        let mut rng = build_dropout_rng(0.5, Some(1234));
        apply_dropout_3d(&mut x, 0.5, true, &mut rng);

        let dropped = x.iter().filter(|&&v| v == 0.0).count();
        let kept = x.iter().filter(|&&v| v != 0.0).count();
        assert!(dropped > 0, "expected some elements dropped");
        assert!(kept > 0, "expected some elements kept");
        // Survivors are rescaled by 1/keep_prob.
        assert!(x.iter().filter(|&&v| v != 0.0).all(|&v| (v - 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_dropout_is_reproducible_with_same_seed() {
        let mut a = Array3::<f32>::ones((2, 4, 4));
        let mut b = Array3::<f32>::ones((2, 4, 4));
        let mut rng_a = build_dropout_rng(0.3, Some(7));
        let mut rng_b = build_dropout_rng(0.3, Some(7));
        apply_dropout_3d(&mut a, 0.3, true, &mut rng_a);
        apply_dropout_3d(&mut b, 0.3, true, &mut rng_b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_dropout_rng_none_when_disabled() {
        assert!(build_dropout_rng(0.0, None).is_none());
        assert!(build_dropout_rng(0.5, Some(1234)).is_some());
    }
}
