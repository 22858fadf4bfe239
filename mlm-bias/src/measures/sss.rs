//! SSS: true-token scores with every span position masked at once.

use crate::config::{EmptySpanPolicy, SpanOptions};
use crate::device::Device;
use crate::model::{forward_pass, MaskedLanguageModel, TokenBatch};
use crate::ops::{mean, rank_of};
use crate::{Error, Result};

use super::{check_positions, vocab_index, SssResult, EMPTY_SPAN_RANK};

/// Average the scores of the true tokens at every span position, with all
/// of them masked in a single forward pass.
///
/// `spans` is used as given (no boundary trimming). Without spans,
/// [`EmptySpanPolicy::Fallback`] returns `sss = None` and
/// `ranks = [EMPTY_SPAN_RANK]`.
///
/// # Errors
/// Returns `InputShape` if a span position or true token is out of range,
/// or `DegenerateInput` for empty spans under [`EmptySpanPolicy::Error`].
/// Errors from the forward pass are returned unchanged.
pub fn compute_sss<M: MaskedLanguageModel + ?Sized>(
    model: &M,
    device: Device,
    token_ids: &[u32],
    spans: &[usize],
    mask_id: u32,
    options: &SpanOptions,
) -> Result<SssResult> {
    check_positions(spans, token_ids.len())?;

    if spans.is_empty() {
        return match options.empty_spans {
            EmptySpanPolicy::Fallback => {
                tracing::warn!("SSS has no span positions; score is undefined");
                Ok(SssResult {
                    sss: None,
                    ranks: vec![EMPTY_SPAN_RANK],
                })
            }
            EmptySpanPolicy::Error => Err(Error::DegenerateInput(
                "SSS needs at least one span position".into(),
            )),
        };
    }

    let mut masked = token_ids.to_vec();
    for &position in spans {
        masked[position] = mask_id;
    }
    let output = forward_pass(model, device, &TokenBatch::single(&masked), false)?;
    let vocab_size = output.logits.vocab_size();

    let mut span_scores = Vec::with_capacity(spans.len());
    let mut ranks = Vec::with_capacity(spans.len());
    for &position in spans {
        let index = vocab_index(token_ids[position], vocab_size)?;
        let scores = output.logits.normalized(0, position, options.normalization);
        span_scores.push(scores[index]);
        #[allow(clippy::cast_possible_wrap)]
        ranks.push(rank_of(&scores, index) as i64);
    }

    let sss = mean(&span_scores);
    tracing::debug!(sss = ?sss, spans = ranks.len(), "computed SSS");
    Ok(SssResult { sss, ranks })
}
