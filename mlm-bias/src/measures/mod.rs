//! Bias measures for masked language models.
//!
//! Each measure runs exactly one forward pass (CSPS batches its masked
//! copies into that one pass) and derives its scores from normalized
//! vocabulary distributions.
//!
//! | measure | masking | forward pass | score |
//! |---------|---------|--------------|-------|
//! | CRR/DP  | caller masks one position | 1 sequence | rank / log-probability gap of the true token |
//! | AUL/AULA| none | 1 sequence | mean true-token score over interior tokens |
//! | CSPS    | one span position per copy | N copies | sum of true-token scores |
//! | SSS     | all span positions at once | 1 sequence | mean of true-token scores |

mod aul;
mod crr_dp;
mod csps;
mod sss;

use serde::{Deserialize, Serialize};

pub use aul::compute_aul;
pub use crr_dp::{compute_crr_dp, mask_position};
pub use csps::compute_csps;
pub use sss::compute_sss;

use crate::{Error, Result};

/// SSS rank list reported when there are no span positions.
pub const EMPTY_SPAN_RANK: i64 = -1;

/// A vocabulary entry with its score and 1-based rank at a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenScore {
    pub token_id: u32,
    pub score: f64,
    pub rank: usize,
}

/// The true token at a masked position, with the requested measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskedTokenScore {
    pub token_id: u32,
    pub score: f64,
    pub rank: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crra: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpa: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrrDpResult {
    /// The model's top prediction (always rank 1).
    pub prediction: TokenScore,
    pub masked_token: MaskedTokenScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AulResult {
    pub aul: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aula: Option<f64>,
    /// One rank per interior token, in sequence order.
    pub ranks: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CspsResult {
    /// Sum (not mean) of the true-token scores.
    pub csps: f64,
    /// One rank per scored span position.
    pub ranks: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SssResult {
    /// Mean of the true-token scores; `None` when there were no spans.
    pub sss: Option<f64>,
    /// One rank per span position, or `[EMPTY_SPAN_RANK]`.
    pub ranks: Vec<i64>,
}

/// Output of any measure, tagged by measure name when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "measure", rename_all = "snake_case")]
pub enum MeasureResult {
    CrrDp(CrrDpResult),
    Aul(AulResult),
    Csps(CspsResult),
    Sss(SssResult),
}

/// Check that every position lies inside a sequence of `len` tokens.
fn check_positions(positions: &[usize], len: usize) -> Result<()> {
    match positions.iter().find(|&&p| p >= len) {
        Some(p) => Err(Error::InputShape(format!(
            "span position {p} is outside a sequence of {len} tokens"
        ))),
        None => Ok(()),
    }
}

/// Check that `token_id` indexes the vocabulary and return it as an index.
fn vocab_index(token_id: u32, vocab_size: usize) -> Result<usize> {
    let index = token_id as usize;
    if index >= vocab_size {
        return Err(Error::InputShape(format!(
            "token id {token_id} is outside a vocabulary of {vocab_size}"
        )));
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_measures_are_not_serialized() {
        let score = MaskedTokenScore {
            token_id: 2,
            score: 0.5,
            rank: 1,
            crr: Some(0.0),
            crra: None,
            dp: None,
            dpa: None,
        };
        let json = serde_json::to_value(score).unwrap();
        assert_eq!(json["crr"], 0.0);
        assert!(json.get("crra").is_none());
        assert!(json.get("dp").is_none());
    }

    #[test]
    fn test_measure_result_is_tagged() {
        let result = MeasureResult::Sss(SssResult {
            sss: None,
            ranks: vec![EMPTY_SPAN_RANK],
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["measure"], "sss");
        assert!(json["sss"].is_null());
        assert_eq!(json["ranks"][0], -1);

        let back: MeasureResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_check_positions() {
        assert!(check_positions(&[0, 4], 5).is_ok());
        assert!(matches!(
            check_positions(&[1, 5], 5),
            Err(Error::InputShape(_))
        ));
    }

    #[test]
    fn test_vocab_index() {
        assert_eq!(vocab_index(4, 5).unwrap(), 4);
        assert!(vocab_index(5, 5).is_err());
    }
}
