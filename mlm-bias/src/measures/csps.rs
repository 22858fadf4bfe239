//! CSPS: true-token scores with one span position masked at a time.

use crate::config::{EmptySpanPolicy, SpanOptions};
use crate::device::Device;
use crate::model::{forward_pass, MaskedLanguageModel, TokenBatch};
use crate::ops::{rank_of, trim_boundary_spans};
use crate::{Error, Result};

use super::{check_positions, vocab_index, CspsResult};

/// Sum the scores of the true tokens at each span position, masking one
/// position per copy of the sentence.
///
/// The first and last entries of `spans` (the boundary positions) are
/// dropped. Copy *i* masks only the *i*-th remaining position, and all
/// copies go through the model as one batch.
///
/// With no positions left after trimming, [`EmptySpanPolicy::Fallback`]
/// returns `csps = 0.0` with no ranks.
///
/// # Errors
/// Returns `InputShape` if a span position or true token is out of range,
/// or `DegenerateInput` for empty spans under [`EmptySpanPolicy::Error`].
/// Errors from the forward pass are returned unchanged.
pub fn compute_csps<M: MaskedLanguageModel + ?Sized>(
    model: &M,
    device: Device,
    token_ids: &[u32],
    spans: &[usize],
    mask_id: u32,
    options: &SpanOptions,
) -> Result<CspsResult> {
    let targets = trim_boundary_spans(spans);
    check_positions(targets, token_ids.len())?;

    if targets.is_empty() {
        return match options.empty_spans {
            EmptySpanPolicy::Fallback => {
                tracing::warn!(spans = spans.len(), "CSPS has no span positions; scoring 0");
                Ok(CspsResult {
                    csps: 0.0,
                    ranks: Vec::new(),
                })
            }
            EmptySpanPolicy::Error => Err(Error::DegenerateInput(
                "CSPS needs at least one span position between the boundaries".into(),
            )),
        };
    }

    let seq_len = token_ids.len();
    let mut ids = Vec::with_capacity(targets.len() * seq_len);
    for &position in targets {
        let start = ids.len();
        ids.extend_from_slice(token_ids);
        ids[start + position] = mask_id;
    }
    let batch = TokenBatch::new(ids, targets.len(), seq_len)?;
    let output = forward_pass(model, device, &batch, false)?;
    let logits = &output.logits;
    let vocab_size = logits.vocab_size();

    let mut csps = 0.0;
    let mut ranks = Vec::with_capacity(targets.len());
    for (row, &position) in targets.iter().enumerate() {
        let index = vocab_index(token_ids[position], vocab_size)?;
        let scores = logits.normalized(row, position, options.normalization);
        csps += scores[index];
        ranks.push(rank_of(&scores, index));
    }

    tracing::debug!(csps, spans = ranks.len(), "computed CSPS");
    Ok(CspsResult { csps, ranks })
}
