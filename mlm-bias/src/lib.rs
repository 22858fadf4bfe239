//! mlm-bias: bias evaluation measures for masked language models
//!
//! This crate provides the model boundary ([`MaskedLanguageModel`]) and the
//! measures computed against it: CRR/DP, AUL/AULA, CSPS and SSS. Backend
//! implementations (CPU, etc.) are in separate crates.

#![allow(clippy::module_name_repetitions)]

pub mod attention;
pub mod config;
pub mod device;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod host;
pub mod logits;
pub mod measures;
pub mod model;
pub mod ops;
pub mod tensor;
pub mod tokenizer;

pub use attention::Attentions;
pub use config::{
    AulOptions, CrrAttentionFormula, CrrDpMeasures, CrrDpOptions, EmptySpanPolicy, MeasureConfig,
    SpanOptions,
};
pub use device::Device;
pub use dtype::DType;
pub use engine::{MeasureEngine, MeasureRequest};
pub use error::{Error, Result};
pub use host::HostTensor;
pub use logits::Logits;
pub use measures::{
    compute_aul, compute_crr_dp, compute_csps, compute_sss, mask_position, AulResult,
    CrrDpResult, CspsResult, MaskedTokenScore, MeasureResult, SssResult, TokenScore,
    EMPTY_SPAN_RANK,
};
pub use model::{forward_pass, ForwardOutput, HostForward, MaskedLanguageModel, TokenBatch};
pub use ops::Normalization;
pub use tensor::Tensor;
pub use tokenizer::Tokenizer;
