//! CPU tensor implementation.

use std::sync::Arc;

use mlm_bias::dtype::DType;
use mlm_bias::host::HostTensor;
use mlm_bias::tensor::Tensor;
use mlm_bias::{Error, Result};

/// A CPU-resident f32 tensor backed by shared storage.
///
/// Uses `Arc<Vec<f32>>` so clones are cheap; weights are shared between
/// clones of an encoder without copying.
#[derive(Debug, Clone)]
pub struct CpuTensor {
    data: Arc<Vec<f32>>,
    shape: Vec<usize>,
}

impl CpuTensor {
    /// Create a tensor that takes ownership of `data`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `data.len()` is not the product of `shape`.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Self {
            data: Arc::new(data),
            shape: shape.to_vec(),
        })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl Tensor for CpuTensor {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> DType {
        DType::F32
    }

    fn to_host(&self) -> Result<HostTensor> {
        Ok(HostTensor::from_f32(&self.shape, &self.data))
    }
}
