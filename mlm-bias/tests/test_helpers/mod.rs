//! Shared fixtures for measure integration tests.
//!
//! Provides a toy masked LM whose outputs are fixed tables, so every score
//! can be computed by hand. Vocabulary of 5: `0 = [CLS]`, `4 = [SEP]`,
//! `1..=3` are words. The fixture never embeds ids, so the mask id only has
//! to be distinguishable from the sentence ids.

#![allow(dead_code)]

use std::cell::RefCell;

use mlm_bias::{Device, ForwardOutput, HostTensor, MaskedLanguageModel, Result, TokenBatch};

pub const CLS: u32 = 0;
pub const SEP: u32 = 4;
pub const MASK: u32 = 5;
pub const VOCAB: usize = 5;

/// `[CLS, 3, 2, 1, SEP]`
pub const SENTENCE: [u32; 5] = [CLS, 3, 2, 1, SEP];

/// Per-position probabilities when the position holds its sentence token.
pub const UNMASKED: [[f64; VOCAB]; 5] = [
    [0.6, 0.1, 0.1, 0.1, 0.1],
    [0.1, 0.1, 0.1, 0.6, 0.1],
    [0.1, 0.1, 0.7, 0.05, 0.05],
    [0.1, 0.8, 0.04, 0.03, 0.03],
    [0.1, 0.1, 0.1, 0.1, 0.6],
];

/// Per-position probabilities when the position holds the mask token.
pub const MASKED: [[f64; VOCAB]; 5] = [
    [0.6, 0.1, 0.1, 0.1, 0.1],
    [0.1, 0.1, 0.1, 0.5, 0.2],
    [0.05, 0.5, 0.25, 0.1, 0.1],
    [0.1, 0.2, 0.3, 0.35, 0.05],
    [0.1, 0.1, 0.1, 0.1, 0.6],
];

/// Attention each key receives, per layer; identical for every head and
/// query row. Averaged over both layers: `[0.1, 0.2, 0.3, 0.2, 0.2]`.
pub const LAYER_KEY_ATTENTION: [[f32; 5]; 2] = [
    [0.2, 0.2, 0.2, 0.2, 0.2],
    [0.0, 0.2, 0.4, 0.2, 0.2],
];

/// Two-layer toy model returning logits `ln(p)` from the tables above.
pub struct FixedModel {
    pub num_heads: usize,
    pub returns_attentions: bool,
    calls: RefCell<Vec<TokenBatch>>,
}

impl FixedModel {
    pub fn new() -> Self {
        Self {
            num_heads: 2,
            returns_attentions: true,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn without_attentions() -> Self {
        Self {
            returns_attentions: false,
            ..Self::new()
        }
    }

    /// Every batch the model has been run on, in order.
    pub fn calls(&self) -> Vec<TokenBatch> {
        self.calls.borrow().clone()
    }
}

impl MaskedLanguageModel for FixedModel {
    type Tensor = HostTensor;

    fn device(&self) -> Device {
        Device::Cpu
    }

    #[allow(clippy::cast_possible_truncation)]
    fn forward(
        &self,
        _device: Device,
        batch: &TokenBatch,
        output_attentions: bool,
    ) -> Result<ForwardOutput<HostTensor>> {
        self.calls.borrow_mut().push(batch.clone());
        let (b, s) = (batch.batch_size(), batch.seq_len());

        let mut logits = Vec::with_capacity(b * s * VOCAB);
        for row in 0..b {
            for (pos, &id) in batch.row(row).iter().enumerate() {
                let table = if id == MASK { &MASKED } else { &UNMASKED };
                logits.extend(table[pos].iter().map(|p| p.ln() as f32));
            }
        }

        let attentions = (output_attentions && self.returns_attentions).then(|| {
            LAYER_KEY_ATTENTION
                .iter()
                .map(|keys| {
                    let mut data = Vec::with_capacity(b * self.num_heads * s * s);
                    for _ in 0..b * self.num_heads * s {
                        data.extend_from_slice(&keys[..s]);
                    }
                    HostTensor::from_f32(&[b, self.num_heads, s, s], &data)
                })
                .collect()
        });

        Ok(ForwardOutput {
            logits: HostTensor::from_f32(&[b, s, VOCAB], &logits),
            attentions,
        })
    }
}

/// Interior-token attention weights of the fixture.
pub const INTERIOR_WEIGHTS: [f64; 3] = [0.2, 0.3, 0.2];

/// `SENTENCE` with position `index` replaced by `MASK`.
pub fn masked_at(index: usize) -> Vec<u32> {
    let mut ids = SENTENCE.to_vec();
    ids[index] = MASK;
    ids
}

/// Model emitting the same raw logits row at every position, without
/// attentions.
pub struct ConstantLogitsModel {
    pub row: Vec<f32>,
}

impl MaskedLanguageModel for ConstantLogitsModel {
    type Tensor = HostTensor;

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn forward(
        &self,
        _device: Device,
        batch: &TokenBatch,
        _output_attentions: bool,
    ) -> Result<ForwardOutput<HostTensor>> {
        let positions = batch.batch_size() * batch.seq_len();
        let logits = self.row.repeat(positions);
        Ok(ForwardOutput {
            logits: HostTensor::from_f32(
                &[batch.batch_size(), batch.seq_len(), self.row.len()],
                &logits,
            ),
            attentions: None,
        })
    }
}
