//! CPU backend for mlm-bias.
//!
//! Provides a reference masked-language encoder that runs on the host in
//! f32, so measures can be exercised end to end against a real forward
//! pass. Weights are built in memory; checkpoint loading is not supported.
//!
//! This backend is intended for testing and small experiments. It is not
//! optimised for throughput.

#![allow(
    clippy::doc_markdown,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod config;
pub mod encoder;
pub mod ops;
pub mod tensor;
pub mod weights;

pub use config::EncoderConfig;
pub use encoder::CpuEncoder;
pub use tensor::CpuTensor;
pub use weights::{EncoderWeights, LayerWeights};
