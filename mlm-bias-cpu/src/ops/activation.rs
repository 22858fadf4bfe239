//! GELU activation.

/// GELU activation (approximate): 0.5 * x * (1 + tanh(sqrt(2/π) * (x + 0.044715 * x³)))
#[inline]
#[must_use]
pub fn gelu_approx(x: f32) -> f32 {
    let coeff = 0.797_884_6; // sqrt(2/π)
    let inner = coeff * x.mul_add(0.044_715 * x * x, x);
    0.5 * x * (1.0 + inner.tanh())
}

pub fn gelu_inplace(data: &mut [f32]) {
    for x in data {
        *x = gelu_approx(*x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gelu_reference_points() {
        assert_eq!(gelu_approx(0.0), 0.0);
        assert!((gelu_approx(1.0) - 0.841_192).abs() < 1e-4);
        assert!((gelu_approx(-1.0) + 0.158_808).abs() < 1e-4);
        // Large inputs pass through, large negatives vanish.
        assert!((gelu_approx(10.0) - 10.0).abs() < 1e-4);
        assert!(gelu_approx(-10.0).abs() < 1e-4);
    }

    #[test]
    fn test_gelu_inplace() {
        let mut data = vec![0.0, 1.0];
        gelu_inplace(&mut data);
        assert_eq!(data[0], 0.0);
        assert!((data[1] - gelu_approx(1.0)).abs() < f32::EPSILON);
    }
}
