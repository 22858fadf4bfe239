//! Reference masked-language encoder.
//!
//! A small pre-norm transformer encoder: learned positions, bidirectional
//! multi-head attention, GELU MLP and an LM head tied to the token
//! embedding. Inference only.

use mlm_bias::{Device, Error, ForwardOutput, MaskedLanguageModel, Result, TokenBatch};

use crate::config::EncoderConfig;
use crate::ops::{self, AttentionOutput};
use crate::tensor::CpuTensor;
use crate::weights::{EncoderWeights, LayerWeights};

/// Masked-language encoder running on the host CPU.
#[derive(Debug, Clone)]
pub struct CpuEncoder {
    config: EncoderConfig,
    weights: EncoderWeights,
}

impl CpuEncoder {
    /// Build an encoder from explicit weights.
    ///
    /// # Errors
    /// Returns an error if the config is inconsistent or a weight has the
    /// wrong shape.
    pub fn new(config: EncoderConfig, weights: EncoderWeights) -> Result<Self> {
        config.validate()?;
        weights.validate(&config)?;
        tracing::debug!(
            layers = config.num_hidden_layers,
            hidden_size = config.hidden_size,
            heads = config.num_attention_heads,
            vocab_size = config.vocab_size,
            "built CPU encoder"
        );
        Ok(Self { config, weights })
    }

    /// Encoder with deterministic random weights.
    ///
    /// # Errors
    /// Returns an error if the config is inconsistent.
    pub fn random(config: EncoderConfig, seed: u64) -> Result<Self> {
        let weights = EncoderWeights::random(&config, seed)?;
        Self::new(config, weights)
    }

    #[must_use]
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    #[must_use]
    pub fn weights(&self) -> &EncoderWeights {
        &self.weights
    }

    /// Token plus position embeddings: `(batch * seq_len, hidden_size)`.
    fn embed(&self, batch: &TokenBatch) -> Result<Vec<f32>> {
        let hidden_size = self.config.hidden_size;
        let mut hidden =
            ops::embedding_gather(self.weights.embed_tokens.as_slice(), hidden_size, batch.ids())?;

        let positions = &self.weights.embed_positions.as_slice()[..batch.seq_len() * hidden_size];
        for row in hidden.chunks_exact_mut(positions.len()) {
            ops::add_inplace(row, positions);
        }
        Ok(hidden)
    }

    /// One encoder layer. Returns the new hidden state and the attention
    /// probabilities `(batch, heads, seq_len, seq_len)`.
    fn forward_layer(
        &self,
        hidden: &[f32],
        layer: &LayerWeights,
        batch_size: usize,
        seq_len: usize,
    ) -> (Vec<f32>, Vec<f32>) {
        let eps = self.config.norm_eps;

        // Pre-attention RMS norm
        let normed = ops::rms_norm(hidden, layer.attn_norm.as_slice(), eps);

        // Self-attention
        let (attn_output, probs) = self.forward_attention(&normed, layer, batch_size, seq_len);

        // Residual connection
        let mut hidden = hidden.to_vec();
        ops::add_inplace(&mut hidden, &attn_output);

        // Pre-MLP RMS norm
        let normed = ops::rms_norm(&hidden, layer.mlp_norm.as_slice(), eps);

        // MLP
        let mlp_output = self.forward_mlp(&normed, layer, batch_size * seq_len);

        // Residual connection
        ops::add_inplace(&mut hidden, &mlp_output);
        (hidden, probs)
    }

    fn forward_attention(
        &self,
        hidden: &[f32],
        layer: &LayerWeights,
        batch_size: usize,
        seq_len: usize,
    ) -> (Vec<f32>, Vec<f32>) {
        let hidden_size = self.config.hidden_size;
        let num_heads = self.config.num_attention_heads;
        let head_dim = self.config.head_dim();
        let rows = batch_size * seq_len;

        // Q, K, V: (batch * seq_len, hidden_size)
        let q = ops::linear(hidden, layer.q_proj.as_slice(), rows, hidden_size, hidden_size);
        let k = ops::linear(hidden, layer.k_proj.as_slice(), rows, hidden_size, hidden_size);
        let v = ops::linear(hidden, layer.v_proj.as_slice(), rows, hidden_size, hidden_size);

        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / (head_dim as f32).sqrt();
        let seq_stride = seq_len * hidden_size;
        let mut attn = Vec::with_capacity(rows * hidden_size);
        let mut probs = Vec::with_capacity(batch_size * num_heads * seq_len * seq_len);

        // Sequences in a batch never attend to each other.
        for b in 0..batch_size {
            let range = b * seq_stride..(b + 1) * seq_stride;
            let AttentionOutput { output, probs: row_probs } = ops::bidirectional_attention(
                &q[range.clone()],
                &k[range.clone()],
                &v[range],
                seq_len,
                num_heads,
                head_dim,
                scale,
            );
            attn.extend_from_slice(&output);
            probs.extend_from_slice(&row_probs);
        }

        // Output projection
        let projected = ops::linear(&attn, layer.o_proj.as_slice(), rows, hidden_size, hidden_size);
        (projected, probs)
    }

    fn forward_mlp(&self, hidden: &[f32], layer: &LayerWeights, rows: usize) -> Vec<f32> {
        let hidden_size = self.config.hidden_size;
        let inter = self.config.intermediate_size;

        let mut up = ops::linear(hidden, layer.up_proj.as_slice(), rows, hidden_size, inter);
        ops::gelu_inplace(&mut up);
        ops::linear(&up, layer.down_proj.as_slice(), rows, inter, hidden_size)
    }

    /// Project hidden states to vocabulary logits through the tied embedding.
    fn lm_head_forward(&self, hidden: &[f32], rows: usize) -> Vec<f32> {
        let mut logits = ops::linear(
            hidden,
            self.weights.embed_tokens.as_slice(),
            rows,
            self.config.hidden_size,
            self.config.vocab_size,
        );
        ops::add_bias_inplace(&mut logits, self.weights.lm_head_bias.as_slice());
        logits
    }
}

impl MaskedLanguageModel for CpuEncoder {
    type Tensor = CpuTensor;

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn forward(
        &self,
        device: Device,
        batch: &TokenBatch,
        output_attentions: bool,
    ) -> Result<ForwardOutput<CpuTensor>> {
        if device != Device::Cpu {
            return Err(Error::DeviceMismatch {
                model: Device::Cpu,
                requested: device,
            });
        }
        let (batch_size, seq_len) = (batch.batch_size(), batch.seq_len());
        if batch_size == 0 || seq_len == 0 {
            return Err(Error::InputShape("cannot encode an empty batch".into()));
        }
        if seq_len > self.config.max_position_embeddings {
            return Err(Error::InputShape(format!(
                "sequence of {seq_len} tokens exceeds max_position_embeddings {}",
                self.config.max_position_embeddings
            )));
        }

        let mut hidden = self.embed(batch)?;
        let mut attentions = Vec::with_capacity(self.weights.layers.len());
        for layer in &self.weights.layers {
            let (next, probs) = self.forward_layer(&hidden, layer, batch_size, seq_len);
            hidden = next;
            if output_attentions {
                attentions.push(CpuTensor::from_vec(
                    &[batch_size, self.config.num_attention_heads, seq_len, seq_len],
                    probs,
                )?);
            }
        }

        // Final norm
        let hidden = ops::rms_norm(
            &hidden,
            self.weights.final_norm.as_slice(),
            self.config.norm_eps,
        );
        let logits = self.lm_head_forward(&hidden, batch_size * seq_len);

        Ok(ForwardOutput {
            logits: CpuTensor::from_vec(&[batch_size, seq_len, self.config.vocab_size], logits)?,
            attentions: output_attentions.then_some(attentions),
        })
    }
}
