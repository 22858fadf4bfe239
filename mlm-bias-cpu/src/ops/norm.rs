//! RMS normalization.

use super::dot_f32;

/// RMS norm over rows of width `weight.len()`:
/// `out[i] = x[i] * weight[i] / sqrt(mean(x²) + eps)`.
#[must_use]
pub fn rms_norm(input: &[f32], weight: &[f32], eps: f32) -> Vec<f32> {
    let hidden_size = weight.len();
    let mut out = vec![0.0f32; input.len()];
    for (row_in, row_out) in input
        .chunks_exact(hidden_size)
        .zip(out.chunks_exact_mut(hidden_size))
    {
        let ss = dot_f32(row_in, row_in);
        #[allow(clippy::cast_precision_loss)]
        let rms = 1.0 / (ss / hidden_size as f32 + eps).sqrt();
        for ((o, x), w) in row_out.iter_mut().zip(row_in).zip(weight) {
            *o = x * rms * w;
        }
    }
    out
}
