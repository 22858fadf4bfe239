//! Host-side tensors copied back from a backend.
//!
//! A forward pass may produce logits or attentions in f32, f16 or bf16. The
//! measures only ever read them as f32 on the host, so every backend tensor
//! is funnelled through [`HostTensor`] before scoring.

use crate::dtype::DType;
use crate::tensor::Tensor;
use crate::{Error, Result};

/// Raw tensor data on the host.
///
/// The `data` field holds the raw bytes in the tensor's `dtype` encoding,
/// in host (native) byte order. For f32 tensors, this is `numel * 4` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTensor {
    /// Logical shape (e.g., `[batch, seq_len, vocab_size]` for logits).
    pub shape: Vec<usize>,
    /// Element dtype.
    pub dtype: DType,
    /// Raw bytes in `dtype` encoding.
    pub data: Vec<u8>,
}

impl HostTensor {
    /// Create a tensor from an f32 slice.
    ///
    /// # Panics
    /// Panics if `data.len()` differs from the product of `shape`.
    #[must_use]
    pub fn from_f32(shape: &[usize], data: &[f32]) -> Self {
        let numel: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            numel,
            "data len {} != shape product {numel}",
            data.len()
        );
        Self {
            shape: shape.to_vec(),
            dtype: DType::F32,
            data: bytemuck::cast_slice(data).to_vec(),
        }
    }

    /// Create a tensor from an f16 slice.
    ///
    /// # Panics
    /// Panics if `data.len()` differs from the product of `shape`.
    #[must_use]
    pub fn from_f16(shape: &[usize], data: &[half::f16]) -> Self {
        let numel: usize = shape.iter().product();
        assert_eq!(data.len(), numel);
        Self {
            shape: shape.to_vec(),
            dtype: DType::F16,
            data: data.iter().flat_map(|v| v.to_ne_bytes()).collect(),
        }
    }

    /// Create a tensor from a bf16 slice.
    ///
    /// # Panics
    /// Panics if `data.len()` differs from the product of `shape`.
    #[must_use]
    pub fn from_bf16(shape: &[usize], data: &[half::bf16]) -> Self {
        let numel: usize = shape.iter().product();
        assert_eq!(data.len(), numel);
        Self {
            shape: shape.to_vec(),
            dtype: DType::BF16,
            data: data.iter().flat_map(|v| v.to_ne_bytes()).collect(),
        }
    }

    /// Convert to an f32 Vec, casting from bf16/f16 if necessary.
    ///
    /// # Errors
    /// Returns an error if the dtype is not a float type or the byte length
    /// does not match the shape.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        let expected = self.numel() * self.dtype.size_in_bytes();
        if self.data.len() != expected {
            return Err(Error::ModelInvocation(format!(
                "host tensor holds {} bytes, shape {:?} of {} needs {expected}",
                self.data.len(),
                self.shape,
                self.dtype
            )));
        }

        let values: Vec<f32> = match self.dtype {
            DType::F32 => self
                .data
                .chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            DType::F16 => self
                .data
                .chunks_exact(2)
                .map(|b| half::f16::from_ne_bytes([b[0], b[1]]).to_f32())
                .collect(),
            DType::BF16 => self
                .data
                .chunks_exact(2)
                .map(|b| half::bf16::from_ne_bytes([b[0], b[1]]).to_f32())
                .collect(),
            DType::U32 => {
                return Err(Error::UnsupportedDtype(format!(
                    "expected a float tensor, got {}",
                    self.dtype
                )))
            }
        };
        Ok(values)
    }
}

impl Tensor for HostTensor {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn to_host(&self) -> Result<HostTensor> {
        Ok(self.clone())
    }
}
