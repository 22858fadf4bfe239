//! Host-side logits from a forward pass.
//!
//! Backends return logits in whatever form they compute them; after
//! [`crate::model::forward_pass`] copies them to the host they are held here
//! as one dense `(batch, seq_len, vocab_size)` f32 block.

use crate::host::HostTensor;
use crate::ops::{self, Normalization};
use crate::{Error, Result};

/// Vocabulary logits for every position of every sequence in a batch.
#[derive(Debug, Clone)]
pub struct Logits {
    data: Vec<f32>,
    batch_size: usize,
    seq_len: usize,
    vocab_size: usize,
}

impl Logits {
    /// Validate a host tensor against the batch it was computed for.
    ///
    /// Accepts `(batch, seq_len, vocab)`, or `(seq_len, vocab)` when the
    /// batch holds a single sequence.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the leading dimensions disagree with the
    /// batch, or `ModelInvocation` if the vocabulary dimension is empty.
    pub fn from_host(tensor: &HostTensor, batch_size: usize, seq_len: usize) -> Result<Self> {
        let vocab_size = match tensor.shape.as_slice() {
            &[b, s, v] if b == batch_size && s == seq_len => v,
            &[s, v] if batch_size == 1 && s == seq_len => v,
            other => {
                let vocab = other.last().copied().unwrap_or(0);
                return Err(Error::ShapeMismatch {
                    expected: vec![batch_size, seq_len, vocab],
                    got: other.to_vec(),
                });
            }
        };
        if vocab_size == 0 {
            return Err(Error::ModelInvocation(
                "logits have an empty vocabulary dimension".into(),
            ));
        }

        Ok(Self {
            data: tensor.to_f32_vec()?,
            batch_size,
            seq_len,
            vocab_size,
        })
    }

    /// Number of sequences in the batch.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Vocabulary size (number of logit values per position).
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Raw logits at one position of one sequence.
    ///
    /// # Panics
    /// Panics if `batch_index` or `position` is out of range.
    #[must_use]
    pub fn row(&self, batch_index: usize, position: usize) -> &[f32] {
        assert!(batch_index < self.batch_size && position < self.seq_len);
        let start = (batch_index * self.seq_len + position) * self.vocab_size;
        &self.data[start..start + self.vocab_size]
    }

    /// Normalized scores over the vocabulary at one position.
    ///
    /// # Panics
    /// Panics if `batch_index` or `position` is out of range.
    #[must_use]
    pub fn normalized(
        &self,
        batch_index: usize,
        position: usize,
        normalization: Normalization,
    ) -> Vec<f64> {
        ops::normalize(self.row(batch_index, position), normalization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_host_batched() {
        let t = HostTensor::from_f32(&[2, 1, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let logits = Logits::from_host(&t, 2, 1).unwrap();
        assert_eq!(logits.vocab_size(), 3);
        assert_eq!(logits.row(1, 0), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_from_host_unbatched_single_sequence() {
        let t = HostTensor::from_f32(&[2, 2], &[0.0, 1.0, 2.0, 3.0]);
        let logits = Logits::from_host(&t, 1, 2).unwrap();
        assert_eq!(logits.batch_size(), 1);
        assert_eq!(logits.row(0, 1), &[2.0, 3.0]);
    }

    #[test]
    fn test_from_host_wrong_seq_len() {
        let t = HostTensor::from_f32(&[1, 2, 2], &[0.0; 4]);
        let err = Logits::from_host(&t, 1, 3).unwrap_err();
        match err {
            Error::ShapeMismatch { expected, got } => {
                assert_eq!(expected, vec![1, 3, 2]);
                assert_eq!(got, vec![1, 2, 2]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_vocab_rejected() {
        let t = HostTensor::from_f32(&[1, 2, 0], &[]);
        assert!(matches!(
            Logits::from_host(&t, 1, 2),
            Err(Error::ModelInvocation(_))
        ));
    }

    #[test]
    fn test_normalized_row() {
        let t = HostTensor::from_f32(&[1, 1, 2], &[0.0, 0.0]);
        let logits = Logits::from_host(&t, 1, 1).unwrap();
        let p = logits.normalized(0, 0, Normalization::Softmax);
        assert_relative_eq!(p[0], 0.5);
        let lp = logits.normalized(0, 0, Normalization::LogSoftmax);
        assert_relative_eq!(lp[1], 0.5f64.ln());
    }
}
