//! Shared helpers for CPU encoder integration tests.
//!
//! Provides a tiny randomly initialized encoder and sentences over its
//! vocabulary. Ids `0` and `1` serve as the boundary tokens, `2` as the mask.

#![allow(dead_code)]

use mlm_bias_cpu::{CpuEncoder, EncoderConfig};

pub const CLS: u32 = 0;
pub const SEP: u32 = 1;
pub const MASK: u32 = 2;

pub const SEED: u64 = 0x5eed;

pub const CONFIG_JSON: &str = r#"{
    "vocab_size": 24,
    "hidden_size": 16,
    "num_hidden_layers": 2,
    "num_attention_heads": 4,
    "intermediate_size": 32,
    "max_position_embeddings": 12
}"#;

pub fn tiny_config() -> EncoderConfig {
    EncoderConfig::from_str(CONFIG_JSON).unwrap()
}

pub fn tiny_encoder() -> CpuEncoder {
    CpuEncoder::random(tiny_config(), SEED).unwrap()
}

/// `[CLS] 7 12 5 19 [SEP]`
pub fn sentence() -> Vec<u32> {
    vec![CLS, 7, 12, 5, 19, SEP]
}
