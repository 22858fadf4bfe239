//! Host-side attention probabilities and their per-token reduction.
//!
//! A model returns one `(batch, heads, seq_len, seq_len)` tensor per layer,
//! indexed `[query, key]` in the last two dimensions. Attention-weighted
//! measures collapse this to one weight per token:
//!
//! 1. mean over layers   → `(heads, seq_len, seq_len)`
//! 2. mean over heads    → `(seq_len, seq_len)`
//! 3. mean over queries  → `(seq_len,)`, the attention each key receives
//!
//! and then drop the two boundary positions.

use crate::host::HostTensor;
use crate::{Error, Result};

/// Attention probabilities for every layer of a forward pass.
#[derive(Debug, Clone)]
pub struct Attentions {
    /// `(layers, batch, heads, seq_len, seq_len)` flattened.
    data: Vec<f32>,
    num_layers: usize,
    batch_size: usize,
    num_heads: usize,
    seq_len: usize,
}

impl Attentions {
    /// Validate per-layer host tensors against the batch they were computed
    /// for.
    ///
    /// Each layer may be `(batch, heads, seq, seq)`, or `(heads, seq, seq)`
    /// when the batch holds a single sequence. All layers must agree on the
    /// number of heads.
    ///
    /// # Errors
    /// Returns `ModelInvocation` if no layers were returned, or
    /// `ShapeMismatch` if a layer's shape disagrees with the batch.
    pub fn from_host(layers: &[HostTensor], batch_size: usize, seq_len: usize) -> Result<Self> {
        let first = layers.first().ok_or_else(|| {
            Error::ModelInvocation("model returned an empty attention tuple".into())
        })?;
        let num_heads = match first.shape.as_slice() {
            &[_, h, _, _] | &[h, _, _] => h,
            other => {
                return Err(Error::ShapeMismatch {
                    expected: vec![batch_size, 0, seq_len, seq_len],
                    got: other.to_vec(),
                })
            }
        };

        let expected = vec![batch_size, num_heads, seq_len, seq_len];
        let mut data = Vec::with_capacity(layers.len() * expected.iter().product::<usize>());
        for layer in layers {
            let matches = match layer.shape.as_slice() {
                &[b, h, q, k] => b == batch_size && h == num_heads && q == seq_len && k == seq_len,
                &[h, q, k] => batch_size == 1 && h == num_heads && q == seq_len && k == seq_len,
                _ => false,
            };
            if !matches {
                return Err(Error::ShapeMismatch {
                    expected,
                    got: layer.shape.clone(),
                });
            }
            data.extend(layer.to_f32_vec()?);
        }

        Ok(Self {
            data,
            num_layers: layers.len(),
            batch_size,
            num_heads,
            seq_len,
        })
    }

    #[must_use]
    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    #[must_use]
    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Average attention received by each position of one sequence,
    /// boundary positions included.
    ///
    /// # Panics
    /// Panics if `batch_index` is out of range.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn token_weights(&self, batch_index: usize) -> Vec<f64> {
        assert!(batch_index < self.batch_size, "batch index out of range");
        let seq = self.seq_len;
        let matrix_len = seq * seq;
        let head_block = self.num_heads * matrix_len;

        let mut per_head = vec![0.0f64; head_block];
        for layer in 0..self.num_layers {
            let start = (layer * self.batch_size + batch_index) * head_block;
            for (acc, &v) in per_head
                .iter_mut()
                .zip(&self.data[start..start + head_block])
            {
                *acc += f64::from(v);
            }
        }
        for v in &mut per_head {
            *v /= self.num_layers as f64;
        }

        let mut matrix = vec![0.0f64; matrix_len];
        for head in per_head.chunks_exact(matrix_len) {
            for (acc, &v) in matrix.iter_mut().zip(head) {
                *acc += v;
            }
        }
        for v in &mut matrix {
            *v /= self.num_heads as f64;
        }

        let mut weights = vec![0.0f64; seq];
        for query_row in matrix.chunks_exact(seq) {
            for (w, &v) in weights.iter_mut().zip(query_row) {
                *w += v;
            }
        }
        for w in &mut weights {
            *w /= seq as f64;
        }
        weights
    }

    /// [`Self::token_weights`] with the two boundary positions dropped.
    #[must_use]
    pub fn interior_token_weights(&self, batch_index: usize) -> Vec<f64> {
        let weights = self.token_weights(batch_index);
        if weights.len() < 2 {
            return Vec::new();
        }
        weights[1..weights.len() - 1].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform_layer(heads: usize, seq: usize) -> HostTensor {
        #[allow(clippy::cast_precision_loss)]
        let p = 1.0 / seq as f32;
        HostTensor::from_f32(&[1, heads, seq, seq], &vec![p; heads * seq * seq])
    }

    #[test]
    fn test_uniform_attention_gives_uniform_weights() {
        let layers = vec![uniform_layer(2, 4), uniform_layer(2, 4)];
        let attn = Attentions::from_host(&layers, 1, 4).unwrap();
        assert_eq!(attn.num_layers(), 2);
        assert_eq!(attn.num_heads(), 2);
        for w in attn.token_weights(0) {
            assert_relative_eq!(w, 0.25, epsilon = 1e-7);
        }
        assert_eq!(attn.interior_token_weights(0).len(), 2);
    }

    #[test]
    fn test_reduction_averages_over_queries_per_key() {
        // One layer, one head, 3 tokens; query rows each sum to 1.
        #[rustfmt::skip]
        let probs = [
            1.0, 0.0, 0.0,
            0.5, 0.5, 0.0,
            0.0, 0.0, 1.0,
        ];
        let layers = vec![HostTensor::from_f32(&[1, 1, 3, 3], &probs)];
        let attn = Attentions::from_host(&layers, 1, 3).unwrap();
        let w = attn.token_weights(0);
        assert_relative_eq!(w[0], 0.5);
        assert_relative_eq!(w[1], 1.0 / 6.0);
        assert_relative_eq!(w[2], 1.0 / 3.0);
        assert_eq!(attn.interior_token_weights(0), vec![w[1]]);
    }

    #[test]
    fn test_layers_and_heads_are_averaged() {
        // Layer 0 heads put all mass on key 0 / key 1, layer 1 on key 1 / key 1.
        let l0 = HostTensor::from_f32(&[2, 2, 2], &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
        let l1 = HostTensor::from_f32(&[2, 2, 2], &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        let attn = Attentions::from_host(&[l0, l1], 1, 2).unwrap();
        let w = attn.token_weights(0);
        assert_relative_eq!(w[0], 0.25);
        assert_relative_eq!(w[1], 0.75);
    }

    #[test]
    fn test_selects_batch_row() {
        let mut data = vec![0.0f32; 2 * 2 * 2];
        // Row 1 attends entirely to key 1.
        data[4 + 1] = 1.0;
        data[4 + 3] = 1.0;
        // Row 0 attends entirely to key 0.
        data[0] = 1.0;
        data[2] = 1.0;
        let layers = vec![HostTensor::from_f32(&[2, 1, 2, 2], &data)];
        let attn = Attentions::from_host(&layers, 2, 2).unwrap();
        assert_eq!(attn.token_weights(0), vec![1.0, 0.0]);
        assert_eq!(attn.token_weights(1), vec![0.0, 1.0]);
    }

    #[test]
    fn test_empty_layers_rejected() {
        assert!(matches!(
            Attentions::from_host(&[], 1, 3),
            Err(Error::ModelInvocation(_))
        ));
    }

    #[test]
    fn test_mismatched_layer_rejected() {
        let layers = vec![uniform_layer(2, 4), uniform_layer(3, 4)];
        assert!(matches!(
            Attentions::from_host(&layers, 1, 4),
            Err(Error::ShapeMismatch { .. })
        ));
        let short = vec![uniform_layer(2, 3)];
        assert!(matches!(
            Attentions::from_host(&short, 1, 4),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
