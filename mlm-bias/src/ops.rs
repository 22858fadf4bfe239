//! Normalization, ranking and reduction over vocabulary rows.
//!
//! Every score a measure reports comes out of [`normalize`]: a softmax or
//! log-softmax over the full vocabulary row at one position, never a raw
//! logit. Arithmetic is carried out in f64.

use serde::{Deserialize, Serialize};

/// How a logits row is turned into scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Probabilities in (0, 1].
    Softmax,
    /// Log-probabilities, all <= 0.
    LogSoftmax,
}

/// Numerically stable softmax of one row.
#[must_use]
pub fn softmax(row: &[f32]) -> Vec<f64> {
    let max = row.iter().map(|&v| f64::from(v)).fold(f64::NEG_INFINITY, f64::max);
    let mut out: Vec<f64> = row.iter().map(|&v| (f64::from(v) - max).exp()).collect();
    let sum: f64 = out.iter().sum();
    for p in &mut out {
        *p /= sum;
    }
    out
}

/// Log-softmax of one row via log-sum-exp.
#[must_use]
pub fn log_softmax(row: &[f32]) -> Vec<f64> {
    let max = row.iter().map(|&v| f64::from(v)).fold(f64::NEG_INFINITY, f64::max);
    let sum: f64 = row.iter().map(|&v| (f64::from(v) - max).exp()).sum();
    let lse = max + sum.ln();
    row.iter().map(|&v| f64::from(v) - lse).collect()
}

/// Apply `normalization` to one logits row.
#[must_use]
pub fn normalize(row: &[f32], normalization: Normalization) -> Vec<f64> {
    match normalization {
        Normalization::Softmax => softmax(row),
        Normalization::LogSoftmax => log_softmax(row),
    }
}

/// 1-based rank of `index` when `scores` are sorted descending.
///
/// Ties are broken by vocabulary index (a stable sort), so the lowest-index
/// maximum is always rank 1.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn rank_of(scores: &[f64], index: usize) -> usize {
    let target = scores[index];
    let ahead = scores
        .iter()
        .enumerate()
        .filter(|&(j, &s)| s > target || (s == target && j < index))
        .count();
    ahead + 1
}

/// The model's top prediction in `scores`: `(token index, score)`.
#[must_use]
pub fn top_prediction(scores: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, &s) in scores.iter().enumerate() {
        if s > best.1 {
            best = (i, s);
        }
    }
    best
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Drop the first and last entries of a span list (the boundary positions).
#[must_use]
pub fn trim_boundary_spans(spans: &[usize]) -> &[usize] {
    if spans.len() < 2 {
        &[]
    } else {
        &spans[1..spans.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0, -4.0]);
        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(p.iter().all(|&v| v > 0.0 && v <= 1.0));
    }

    #[test]
    fn test_softmax_large_logits_stay_finite() {
        let p = softmax(&[1000.0, 1000.0]);
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_log_softmax_matches_ln_softmax() {
        let row = [0.3, -1.2, 2.5, 0.0];
        let p = softmax(&row);
        let lp = log_softmax(&row);
        for (a, b) in p.iter().zip(&lp) {
            assert_relative_eq!(a.ln(), *b, epsilon = 1e-12);
            assert!(*b <= 0.0);
        }
    }

    #[test]
    fn test_rank_is_one_based() {
        let s = [0.1, 0.5, 0.3, 0.1];
        assert_eq!(rank_of(&s, 1), 1);
        assert_eq!(rank_of(&s, 2), 2);
    }

    #[test]
    fn test_rank_ties_break_by_index() {
        let s = [0.2, 0.4, 0.2, 0.2];
        assert_eq!(rank_of(&s, 0), 2);
        assert_eq!(rank_of(&s, 2), 3);
        assert_eq!(rank_of(&s, 3), 4);
    }

    #[test]
    fn test_top_prediction_is_rank_one() {
        let s = [0.3, 0.3, 0.4, 0.0];
        let (idx, score) = top_prediction(&s);
        assert_eq!(idx, 2);
        assert_relative_eq!(score, 0.4);
        assert_eq!(rank_of(&s, idx), 1);

        let tied = [0.5, 0.5];
        assert_eq!(top_prediction(&tied).0, 0);
    }

    #[test]
    fn test_mean_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn test_trim_boundary_spans() {
        assert_eq!(trim_boundary_spans(&[0, 2, 3, 5]), &[2, 3]);
        assert_eq!(trim_boundary_spans(&[0, 5]), &[] as &[usize]);
        assert_eq!(trim_boundary_spans(&[4]), &[] as &[usize]);
        assert_eq!(trim_boundary_spans(&[]), &[] as &[usize]);
    }
}
