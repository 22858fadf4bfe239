//! Bidirectional multi-head self-attention for one sequence.

use super::dot_f32;

/// Attention output and the probabilities that produced it.
pub struct AttentionOutput {
    /// `(seq_len, num_heads * head_dim)`
    pub output: Vec<f32>,
    /// `(num_heads, seq_len, seq_len)`, rows summing to 1
    pub probs: Vec<f32>,
}

/// Q @ Kᵀ * scale, softmax over every key, @ V.
///
/// `q`, `k` and `v` are `(seq_len, num_heads * head_dim)`. Every query
/// attends to every position; there is no causal mask.
#[must_use]
#[allow(clippy::needless_range_loop)]
pub fn bidirectional_attention(
    q: &[f32],
    k: &[f32],
    v: &[f32],
    seq_len: usize,
    num_heads: usize,
    head_dim: usize,
    scale: f32,
) -> AttentionOutput {
    let stride = num_heads * head_dim;
    let mut output = vec![0.0f32; seq_len * stride];
    let mut probs = vec![0.0f32; num_heads * seq_len * seq_len];

    for h in 0..num_heads {
        let head = h * head_dim;
        for s in 0..seq_len {
            let q_offset = s * stride + head;
            let q_vec = &q[q_offset..q_offset + head_dim];

            let row_offset = (h * seq_len + s) * seq_len;
            let scores = &mut probs[row_offset..row_offset + seq_len];
            for (kv_pos, score) in scores.iter_mut().enumerate() {
                let k_offset = kv_pos * stride + head;
                *score = dot_f32(q_vec, &k[k_offset..k_offset + head_dim]) * scale;
            }

            // Softmax
            let max_score = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let mut sum = 0.0f32;
            for score in scores.iter_mut() {
                *score = (*score - max_score).exp();
                sum += *score;
            }
            for score in scores.iter_mut() {
                *score /= sum;
            }

            // Weighted sum of V
            let o_offset = s * stride + head;
            for kv_pos in 0..seq_len {
                let p = scores[kv_pos];
                let v_offset = kv_pos * stride + head;
                for d in 0..head_dim {
                    output[o_offset + d] += p * v[v_offset + d];
                }
            }
        }
    }

    AttentionOutput { output, probs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_when_keys_equal() {
        // Identical keys give equal scores, so every query averages V.
        let q = [1.0, -2.0, 0.5, 3.0, 0.0, 1.0];
        let k = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let v = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = bidirectional_attention(&q, &k, &v, 3, 1, 2, 0.5);

        for p in &out.probs {
            assert_relative_eq!(*p, 1.0 / 3.0, epsilon = 1e-6);
        }
        for s in 0..3 {
            assert_relative_eq!(out.output[s * 2], 3.0, epsilon = 1e-5);
            assert_relative_eq!(out.output[s * 2 + 1], 4.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_attends_to_later_positions() {
        // Query 0 matches key 1 only; with no causal mask it must see it.
        let q = [0.0, 10.0, 0.0, 0.0];
        let k = [0.0, 0.0, 0.0, 10.0];
        let v = [1.0, 0.0, 0.0, 1.0];
        let out = bidirectional_attention(&q, &k, &v, 2, 1, 2, 1.0);
        assert!(out.probs[1] > 0.99);
        assert!(out.output[1] > 0.99);
    }

    #[test]
    fn test_rows_sum_to_one_per_head() {
        let q: Vec<f32> = (0..16).map(|i| (i as f32 * 0.3).sin()).collect();
        let k: Vec<f32> = (0..16).map(|i| (i as f32 * 0.7).cos()).collect();
        let v = vec![0.0; 16];
        let out = bidirectional_attention(&q, &k, &v, 4, 2, 2, 0.7);
        assert_eq!(out.probs.len(), 2 * 4 * 4);
        for row in out.probs.chunks_exact(4) {
            assert_relative_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        }
    }
}
