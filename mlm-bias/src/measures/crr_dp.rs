//! CRR (completion rank ratio) and DP (log-probability gap) at one masked
//! position.

use crate::config::CrrDpOptions;
use crate::device::Device;
use crate::model::{forward_pass, MaskedLanguageModel, TokenBatch};
use crate::ops::{rank_of, top_prediction, Normalization};
use crate::{Error, Result};

use super::{vocab_index, CrrDpResult, MaskedTokenScore, TokenScore};

/// Replace the token at `index` with `mask_id`.
///
/// Returns the masked sequence and the token that was replaced, ready to be
/// passed to [`compute_crr_dp`].
///
/// # Errors
/// Returns `InputShape` if `index` is outside the sequence.
pub fn mask_position(token_ids: &[u32], index: usize, mask_id: u32) -> Result<(Vec<u32>, u32)> {
    let Some(&original) = token_ids.get(index) else {
        return Err(Error::InputShape(format!(
            "mask index {index} is outside a sequence of {} tokens",
            token_ids.len()
        )));
    };
    let mut masked = token_ids.to_vec();
    masked[index] = mask_id;
    Ok((masked, original))
}

/// Score how far the true token at a masked position is from the model's
/// top prediction.
///
/// `token_ids` must already carry the mask token at `mask_index`;
/// `true_token` is the id that was masked out. With attention enabled the
/// scores are also weighted by the average attention the masked position
/// receives.
///
/// # Errors
/// Returns `InputShape` if `mask_index` or `true_token` is out of range, or
/// if attention weighting is requested for a boundary position. Errors from
/// the forward pass are returned unchanged.
#[allow(clippy::cast_precision_loss)]
pub fn compute_crr_dp<M: MaskedLanguageModel + ?Sized>(
    model: &M,
    device: Device,
    token_ids: &[u32],
    mask_index: usize,
    true_token: u32,
    options: &CrrDpOptions,
) -> Result<CrrDpResult> {
    let len = token_ids.len();
    if mask_index >= len {
        return Err(Error::InputShape(format!(
            "mask index {mask_index} is outside a sequence of {len} tokens"
        )));
    }
    if options.attention && (mask_index == 0 || mask_index + 1 == len) {
        return Err(Error::InputShape(format!(
            "mask index {mask_index} is a boundary position and has no attention weight"
        )));
    }

    let output = forward_pass(
        model,
        device,
        &TokenBatch::single(token_ids),
        options.attention,
    )?;
    let logits = &output.logits;
    let true_index = vocab_index(true_token, logits.vocab_size())?;

    // Rank and gap come from log-probabilities; exponentiated scores can
    // underflow to 0 and tie.
    let log_probs = logits.normalized(0, mask_index, Normalization::LogSoftmax);
    let (top_index, top_log_prob) = top_prediction(&log_probs);
    let rank = rank_of(&log_probs, true_index);
    let log_gap = top_log_prob - log_probs[true_index];

    let scores = match options.normalization {
        Normalization::LogSoftmax => log_probs,
        Normalization::Softmax => logits.normalized(0, mask_index, Normalization::Softmax),
    };
    let top_score = scores[top_index];
    let true_score = scores[true_index];
    let measures = options.measures;
    let mut masked_token = MaskedTokenScore {
        token_id: true_token,
        score: true_score,
        rank,
        crr: measures.crr.then(|| 1.0 - 1.0 / rank as f64),
        crra: None,
        dp: measures.dp.then_some(log_gap),
        dpa: None,
    };

    if options.attention {
        let weight = output.require_attentions()?.interior_token_weights(0)[mask_index - 1];
        masked_token.crra = measures
            .crr
            .then(|| weight * options.crr_attention_formula.rank_term(rank));
        masked_token.dpa = measures.dp.then(|| weight * log_gap);
    }

    tracing::debug!(
        mask_index,
        rank,
        crr = ?masked_token.crr,
        dp = ?masked_token.dp,
        "computed CRR/DP"
    );

    #[allow(clippy::cast_possible_truncation)]
    let prediction = TokenScore {
        token_id: top_index as u32,
        score: top_score,
        rank: 1,
    };
    Ok(CrrDpResult {
        prediction,
        masked_token,
    })
}
