//! Tensor trait definition

use crate::dtype::DType;
use crate::host::HostTensor;
use crate::Result;

/// Interface for tensors returned by a model's forward pass.
///
/// Backends keep their outputs wherever they were computed (host memory,
/// GPU buffers). The engine only needs the shape to validate the output and
/// a way to copy the values back to the host for scoring.
pub trait Tensor: Sized {
    /// Returns the shape of the tensor as a slice of dimensions
    fn shape(&self) -> &[usize];

    /// Returns the data type of tensor elements
    fn dtype(&self) -> DType;

    /// Copy the tensor into host memory.
    ///
    /// # Errors
    /// Returns an error if the device-to-host transfer fails.
    fn to_host(&self) -> Result<HostTensor>;

    /// Returns the total number of elements in the tensor
    fn numel(&self) -> usize {
        self.shape().iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct FakeTensor {
        shape: Vec<usize>,
        dtype: DType,
    }

    impl Tensor for FakeTensor {
        fn shape(&self) -> &[usize] {
            &self.shape
        }

        fn dtype(&self) -> DType {
            self.dtype
        }

        fn to_host(&self) -> Result<HostTensor> {
            Ok(HostTensor::from_f32(&self.shape, &vec![0.0; self.numel()]))
        }
    }

    #[test]
    fn test_numel() {
        let t = FakeTensor {
            shape: vec![2, 3, 4],
            dtype: DType::F32,
        };
        assert_eq!(t.numel(), 24);
    }

    #[test]
    fn test_default_to_host_keeps_shape() {
        let t = FakeTensor {
            shape: vec![3, 2],
            dtype: DType::F32,
        };
        let host = t.to_host().unwrap();
        assert_eq!(host.shape, vec![3, 2]);
        assert_eq!(host.dtype(), DType::F32);
    }
}
