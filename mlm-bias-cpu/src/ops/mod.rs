//! CPU kernels for the encoder forward pass.
//!
//! All kernels operate on row-major f32 slices; the encoder owns shapes.

pub mod activation;
pub mod attention;
pub mod embed;
pub mod matmul;
pub mod norm;

pub use activation::{gelu_approx, gelu_inplace};
pub use attention::{bidirectional_attention, AttentionOutput};
pub use embed::embedding_gather;
pub use matmul::{add_bias_inplace, linear};
pub use norm::rms_norm;

/// Dot product of two equal-length f32 slices.
#[inline]
#[must_use]
pub fn dot_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Element-wise in-place addition: `a[i] += b[i]`.
#[inline]
pub fn add_inplace(a: &mut [f32], b: &[f32]) {
    debug_assert_eq!(a.len(), b.len());
    for (x, y) in a.iter_mut().zip(b) {
        *x += y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_f32() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let b = vec![9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        assert!((dot_f32(&a, &b) - 165.0).abs() < 1e-5);
    }

    #[test]
    fn test_add_inplace() {
        let mut a = vec![1.0, 2.0, 3.0];
        add_inplace(&mut a, &[10.0, 20.0, 30.0]);
        assert_eq!(a, vec![11.0, 22.0, 33.0]);
    }
}
