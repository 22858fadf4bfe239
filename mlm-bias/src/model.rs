//! Masked-language-model boundary.
//!
//! Defines the interface a model must satisfy to be scored, and
//! [`forward_pass`], the single helper every measure goes through to invoke
//! it.

use crate::attention::Attentions;
use crate::device::Device;
use crate::logits::Logits;
use crate::tensor::Tensor;
use crate::{Error, Result};

/// A rectangular batch of token id sequences, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBatch {
    ids: Vec<u32>,
    batch_size: usize,
    seq_len: usize,
}

impl TokenBatch {
    /// A batch holding one sequence.
    #[must_use]
    pub fn single(ids: &[u32]) -> Self {
        Self {
            ids: ids.to_vec(),
            batch_size: 1,
            seq_len: ids.len(),
        }
    }

    /// Wrap flattened ids as `batch_size` rows.
    ///
    /// # Errors
    /// Returns `InputShape` if `ids.len()` is not `batch_size * seq_len`.
    pub fn new(ids: Vec<u32>, batch_size: usize, seq_len: usize) -> Result<Self> {
        if ids.len() != batch_size * seq_len {
            return Err(Error::InputShape(format!(
                "{} token ids cannot form a batch of {batch_size} x {seq_len}",
                ids.len()
            )));
        }
        Ok(Self {
            ids,
            batch_size,
            seq_len,
        })
    }

    /// Build a batch from equal-length rows.
    ///
    /// # Errors
    /// Returns `InputShape` if the rows differ in length.
    pub fn from_rows(rows: &[Vec<u32>]) -> Result<Self> {
        let seq_len = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().find(|r| r.len() != seq_len) {
            return Err(Error::InputShape(format!(
                "batch rows must share a length: expected {seq_len}, found {}",
                row.len()
            )));
        }
        Ok(Self {
            ids: rows.concat(),
            batch_size: rows.len(),
            seq_len,
        })
    }

    /// All ids, row-major.
    #[must_use]
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Ids of one row.
    ///
    /// # Panics
    /// Panics if `index >= batch_size`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[u32] {
        &self.ids[index * self.seq_len..(index + 1) * self.seq_len]
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }
}

/// Raw output of one forward pass, still in the backend's tensor type.
#[derive(Debug, Clone)]
pub struct ForwardOutput<T> {
    /// Logits of shape (`batch`, `seq_len`, `vocab_size`).
    pub logits: T,
    /// One tensor per layer of shape (`batch`, `heads`, `seq_len`,
    /// `seq_len`), present when attention output was requested.
    pub attentions: Option<Vec<T>>,
}

/// Trait for masked language models that can be scored.
///
/// A model takes a batch of token ids, runs one bidirectional forward pass,
/// and returns per-position vocabulary logits and, on request, the
/// attention probabilities of every layer.
pub trait MaskedLanguageModel {
    /// Tensor type the backend returns.
    type Tensor: Tensor;

    /// Device the model's weights reside on.
    fn device(&self) -> Device;

    /// Full forward pass over `batch`, with inputs placed on `device`.
    ///
    /// Inference only: no gradient state is kept.
    ///
    /// # Errors
    /// Returns an error if the forward pass fails (unknown token id,
    /// sequence too long, allocation failure, ...).
    fn forward(
        &self,
        device: Device,
        batch: &TokenBatch,
        output_attentions: bool,
    ) -> Result<ForwardOutput<Self::Tensor>>;
}

/// Host copy of a forward pass, validated against its input batch.
#[derive(Debug, Clone)]
pub struct HostForward {
    pub logits: Logits,
    pub attentions: Option<Attentions>,
}

impl HostForward {
    /// Attentions, or `MissingAttentions` if the model returned none.
    ///
    /// # Errors
    /// Returns `MissingAttentions` when attention output is absent.
    pub fn require_attentions(&self) -> Result<&Attentions> {
        self.attentions.as_ref().ok_or(Error::MissingAttentions)
    }
}

/// Invoke `model` once on `batch` and copy its outputs to the host.
///
/// `device` is the explicit execution context; it must be where the model
/// resides. Errors from the model itself are returned unchanged.
///
/// # Errors
/// Returns `DeviceMismatch` for the wrong device, the model's own error if
/// the forward pass fails, `MissingAttentions` if attentions were requested
/// but not returned, or a shape error if the outputs disagree with `batch`.
pub fn forward_pass<M: MaskedLanguageModel + ?Sized>(
    model: &M,
    device: Device,
    batch: &TokenBatch,
    output_attentions: bool,
) -> Result<HostForward> {
    let resident = model.device();
    if resident != device {
        return Err(Error::DeviceMismatch {
            model: resident,
            requested: device,
        });
    }

    tracing::debug!(
        batch_size = batch.batch_size(),
        seq_len = batch.seq_len(),
        %device,
        output_attentions,
        "forward pass"
    );
    let output = model.forward(device, batch, output_attentions)?;

    let logits = Logits::from_host(
        &output.logits.to_host()?,
        batch.batch_size(),
        batch.seq_len(),
    )?;

    let attentions = if output_attentions {
        let layers = output.attentions.ok_or(Error::MissingAttentions)?;
        let host_layers = layers
            .iter()
            .map(Tensor::to_host)
            .collect::<Result<Vec<_>>>()?;
        Some(Attentions::from_host(
            &host_layers,
            batch.batch_size(),
            batch.seq_len(),
        )?)
    } else {
        None
    };

    Ok(HostForward { logits, attentions })
}
