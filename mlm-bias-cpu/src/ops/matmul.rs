//! Dense projections.
//!
//! Weights are stored PyTorch-style as `(out_features, in_features)`, so
//! `C[m,n] = dot(X[m,:], W[n,:])` is a contiguous dot product with no
//! transpose. Output rows are parallelized with Rayon.

use rayon::prelude::*;

use super::dot_f32;

/// Compute one output row: `out[n] = dot(x_row, W[n,:])`.
fn linear_row(x_row: &[f32], weight: &[f32], out_row: &mut [f32], k: usize) {
    for (n, out) in out_row.iter_mut().enumerate() {
        *out = dot_f32(x_row, &weight[n * k..(n + 1) * k]);
    }
}

/// `X (M,K) × Wᵀ → Y (M,N)` for a weight of shape `(N,K)`.
///
/// Rows are computed in parallel when M > 1.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn linear(x: &[f32], weight: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    debug_assert_eq!(x.len(), m * k);
    debug_assert_eq!(weight.len(), n * k);
    let mut y = vec![0.0f32; m * n];

    if m == 1 {
        linear_row(&x[..k], weight, &mut y[..n], k);
    } else {
        y.par_chunks_mut(n).enumerate().for_each(|(row, y_row)| {
            linear_row(&x[row * k..(row + 1) * k], weight, y_row, k);
        });
    }

    y
}

/// Add `bias` to every row of `y`.
pub fn add_bias_inplace(y: &mut [f32], bias: &[f32]) {
    for row in y.chunks_exact_mut(bias.len()) {
        super::add_inplace(row, bias);
    }
}
