//! Measure options and the engine configuration file.
//!
//! Defaults mirror the keyword defaults of the published measures: CRR/DP
//! score with softmax and attention weighting on, AUL/AULA with
//! log-softmax and attention on, CSPS and SSS with log-softmax.

#![allow(clippy::should_implement_trait)]

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::ops::Normalization;
use crate::Result;

/// Which of CRR and DP to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrrDpMeasures {
    pub crr: bool,
    pub dp: bool,
}

impl Default for CrrDpMeasures {
    fn default() -> Self {
        Self { crr: true, dp: true }
    }
}

/// Arithmetic used for the attention-weighted CRR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrrAttentionFormula {
    /// `w * (1 - ln(1 / rank))`, as published.
    #[default]
    Reference,
    /// `w * (1 - 1 / rank)`, i.e. the weight times CRR.
    Consistent,
}

impl CrrAttentionFormula {
    /// The rank term the attention weight multiplies.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rank_term(self, rank: usize) -> f64 {
        let reciprocal = 1.0 / rank as f64;
        match self {
            Self::Reference => 1.0 - reciprocal.ln(),
            Self::Consistent => 1.0 - reciprocal,
        }
    }
}

/// Options for [`crate::measures::compute_crr_dp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrrDpOptions {
    pub measures: CrrDpMeasures,
    /// Also compute the attention-weighted variants (`crra`, `dpa`).
    pub attention: bool,
    pub normalization: Normalization,
    pub crr_attention_formula: CrrAttentionFormula,
}

impl Default for CrrDpOptions {
    fn default() -> Self {
        Self {
            measures: CrrDpMeasures::default(),
            attention: true,
            normalization: Normalization::Softmax,
            crr_attention_formula: CrrAttentionFormula::Reference,
        }
    }
}

/// Options for [`crate::measures::compute_aul`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AulOptions {
    /// Also compute AULA.
    pub attention: bool,
    pub normalization: Normalization,
}

impl Default for AulOptions {
    fn default() -> Self {
        Self {
            attention: true,
            normalization: Normalization::LogSoftmax,
        }
    }
}

/// What a span measure does when it has no span positions to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySpanPolicy {
    /// Return the measure's defined empty result without a forward pass.
    #[default]
    Fallback,
    /// Fail with `DegenerateInput`.
    Error,
}

/// Options for [`crate::measures::compute_csps`] and
/// [`crate::measures::compute_sss`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanOptions {
    pub normalization: Normalization,
    pub empty_spans: EmptySpanPolicy,
}

impl Default for SpanOptions {
    fn default() -> Self {
        Self {
            normalization: Normalization::LogSoftmax,
            empty_spans: EmptySpanPolicy::Fallback,
        }
    }
}

/// Configuration for a [`crate::engine::MeasureEngine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    /// Execution context every forward pass targets.
    pub device: Device,
    pub crr_dp: CrrDpOptions,
    pub aul: AulOptions,
    pub csps: SpanOptions,
    pub sss: SpanOptions,
}

impl MeasureConfig {
    /// Parse a JSON configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    /// Parse a JSON string. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or a value is unknown.
    pub fn from_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
