//! AUL / AULA: pseudo-likelihood of an unmasked sentence, plain and
//! attention-weighted.

use crate::config::AulOptions;
use crate::device::Device;
use crate::model::{forward_pass, MaskedLanguageModel, TokenBatch};
use crate::ops::rank_of;
use crate::{Error, Result};

use super::{vocab_index, AulResult};

/// Score every interior token of an unmasked sentence in one forward pass.
///
/// AUL is the mean score the model assigns to each observed interior token;
/// AULA weights each token's score by the average attention it receives
/// before averaging.
///
/// # Errors
/// Returns `InputShape` if the sequence has no interior tokens or holds an
/// id outside the vocabulary. Errors from the forward pass are returned
/// unchanged.
pub fn compute_aul<M: MaskedLanguageModel + ?Sized>(
    model: &M,
    device: Device,
    token_ids: &[u32],
    options: &AulOptions,
) -> Result<AulResult> {
    let len = token_ids.len();
    if len < 3 {
        return Err(Error::InputShape(format!(
            "AUL needs at least one token between the boundaries, got {len} tokens"
        )));
    }

    let output = forward_pass(
        model,
        device,
        &TokenBatch::single(token_ids),
        options.attention,
    )?;
    let vocab_size = output.logits.vocab_size();

    let mut token_scores = Vec::with_capacity(len - 2);
    let mut ranks = Vec::with_capacity(len - 2);
    for (position, &token_id) in token_ids.iter().enumerate().take(len - 1).skip(1) {
        let index = vocab_index(token_id, vocab_size)?;
        let scores = output.logits.normalized(0, position, options.normalization);
        token_scores.push(scores[index]);
        ranks.push(rank_of(&scores, index));
    }

    #[allow(clippy::cast_precision_loss)]
    let count = token_scores.len() as f64;
    let aul = token_scores.iter().sum::<f64>() / count;

    let aula = if options.attention {
        let weights = output.require_attentions()?.interior_token_weights(0);
        let weighted: f64 = token_scores
            .iter()
            .zip(&weights)
            .map(|(score, weight)| score * weight)
            .sum();
        Some(weighted / count)
    } else {
        None
    };

    tracing::debug!(aul, aula = ?aula, tokens = ranks.len(), "computed AUL");
    Ok(AulResult { aul, aula, ranks })
}
