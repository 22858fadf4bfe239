//! Encoder weights.
//!
//! Loading pretrained checkpoints is out of scope; weights are built in
//! memory, either field by field or from a seeded RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mlm_bias::tensor::Tensor;
use mlm_bias::{Error, Result};

use crate::config::EncoderConfig;
use crate::tensor::CpuTensor;

/// Weights of one encoder layer. Projections are `(out_features, in_features)`.
#[derive(Debug, Clone)]
pub struct LayerWeights {
    pub attn_norm: CpuTensor,
    pub q_proj: CpuTensor,
    pub k_proj: CpuTensor,
    pub v_proj: CpuTensor,
    pub o_proj: CpuTensor,
    pub mlp_norm: CpuTensor,
    pub up_proj: CpuTensor,
    pub down_proj: CpuTensor,
}

/// Full encoder weights. The LM head is tied to `embed_tokens`.
#[derive(Debug, Clone)]
pub struct EncoderWeights {
    /// `(vocab_size, hidden_size)`
    pub embed_tokens: CpuTensor,
    /// `(max_position_embeddings, hidden_size)`
    pub embed_positions: CpuTensor,
    pub layers: Vec<LayerWeights>,
    pub final_norm: CpuTensor,
    /// `(vocab_size,)`
    pub lm_head_bias: CpuTensor,
}

/// Uniform init in `[-scale, scale)` with `scale = 1/sqrt(fan_in)`.
struct Initializer {
    rng: StdRng,
}

impl Initializer {
    #[allow(clippy::cast_precision_loss)]
    fn matrix(&mut self, rows: usize, cols: usize) -> Result<CpuTensor> {
        let scale = 1.0 / (cols as f32).sqrt();
        let data = (0..rows * cols)
            .map(|_| self.rng.gen_range(-scale..scale))
            .collect();
        CpuTensor::from_vec(&[rows, cols], data)
    }

    fn vector(&mut self, len: usize, scale: f32) -> Result<CpuTensor> {
        let data = (0..len).map(|_| self.rng.gen_range(-scale..scale)).collect();
        CpuTensor::from_vec(&[len], data)
    }
}

impl EncoderWeights {
    /// Deterministic random weights: the same config and seed always give
    /// the same weights. Norm weights start at 1.
    ///
    /// # Errors
    /// Returns an error if `config` is inconsistent.
    pub fn random(config: &EncoderConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let mut init = Initializer {
            rng: StdRng::seed_from_u64(seed),
        };
        let hidden = config.hidden_size;
        let inter = config.intermediate_size;
        let ones = |len: usize| CpuTensor::from_vec(&[len], vec![1.0; len]);

        let embed_tokens = init.matrix(config.vocab_size, hidden)?;
        let embed_positions = init.matrix(config.max_position_embeddings, hidden)?;

        let layers = (0..config.num_hidden_layers)
            .map(|_| -> Result<LayerWeights> {
                Ok(LayerWeights {
                    attn_norm: ones(hidden)?,
                    q_proj: init.matrix(hidden, hidden)?,
                    k_proj: init.matrix(hidden, hidden)?,
                    v_proj: init.matrix(hidden, hidden)?,
                    o_proj: init.matrix(hidden, hidden)?,
                    mlp_norm: ones(hidden)?,
                    up_proj: init.matrix(inter, hidden)?,
                    down_proj: init.matrix(hidden, inter)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embed_tokens,
            embed_positions,
            layers,
            final_norm: ones(hidden)?,
            lm_head_bias: init.vector(config.vocab_size, 0.1)?,
        })
    }

    /// Check every tensor against the shapes `config` implies.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` for the first tensor with the wrong shape,
    /// or `Other` if the layer count differs.
    pub fn validate(&self, config: &EncoderConfig) -> Result<()> {
        let hidden = config.hidden_size;
        let inter = config.intermediate_size;
        check_shape(&self.embed_tokens, &[config.vocab_size, hidden])?;
        check_shape(
            &self.embed_positions,
            &[config.max_position_embeddings, hidden],
        )?;
        check_shape(&self.final_norm, &[hidden])?;
        check_shape(&self.lm_head_bias, &[config.vocab_size])?;

        if self.layers.len() != config.num_hidden_layers {
            return Err(Error::Other(format!(
                "expected {} encoder layers, got {}",
                config.num_hidden_layers,
                self.layers.len()
            )));
        }
        for layer in &self.layers {
            check_shape(&layer.attn_norm, &[hidden])?;
            check_shape(&layer.q_proj, &[hidden, hidden])?;
            check_shape(&layer.k_proj, &[hidden, hidden])?;
            check_shape(&layer.v_proj, &[hidden, hidden])?;
            check_shape(&layer.o_proj, &[hidden, hidden])?;
            check_shape(&layer.mlp_norm, &[hidden])?;
            check_shape(&layer.up_proj, &[inter, hidden])?;
            check_shape(&layer.down_proj, &[hidden, inter])?;
        }
        Ok(())
    }
}

fn check_shape(tensor: &CpuTensor, expected: &[usize]) -> Result<()> {
    if tensor.shape() == expected {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            expected: expected.to_vec(),
            got: tensor.shape().to_vec(),
        })
    }
}
