//! Measure engine: one model, one configuration, any measure.
//!
//! The measure functions in [`crate::measures`] are stateless; the engine
//! binds the arguments that stay fixed across a study (model, device,
//! options, mask token) so callers only supply the sentence and positions.

use serde::{Deserialize, Serialize};

use crate::config::MeasureConfig;
use crate::measures::{self, AulResult, CrrDpResult, CspsResult, MeasureResult, SssResult};
use crate::model::MaskedLanguageModel;
use crate::tokenizer::Tokenizer;
use crate::Result;

/// A request for one measure, tagged by measure name when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "measure", rename_all = "snake_case")]
pub enum MeasureRequest {
    /// Without `true_token`, `token_ids` is taken as unmasked and the engine
    /// masks `mask_index` itself.
    CrrDp {
        token_ids: Vec<u32>,
        mask_index: usize,
        #[serde(default)]
        true_token: Option<u32>,
    },
    Aul {
        token_ids: Vec<u32>,
    },
    Csps {
        token_ids: Vec<u32>,
        spans: Vec<usize>,
    },
    Sss {
        token_ids: Vec<u32>,
        spans: Vec<usize>,
    },
}

/// Runs measures against one model with a fixed configuration.
pub struct MeasureEngine<'m, M: MaskedLanguageModel + ?Sized> {
    model: &'m M,
    config: MeasureConfig,
    mask_token_id: u32,
}

impl<'m, M: MaskedLanguageModel + ?Sized> MeasureEngine<'m, M> {
    #[must_use]
    pub fn new(model: &'m M, mask_token_id: u32, config: MeasureConfig) -> Self {
        Self {
            model,
            config,
            mask_token_id,
        }
    }

    /// Take the mask token from `tokenizer`.
    #[must_use]
    pub fn with_tokenizer<T: Tokenizer + ?Sized>(
        model: &'m M,
        tokenizer: &T,
        config: MeasureConfig,
    ) -> Self {
        Self::new(model, tokenizer.mask_token_id(), config)
    }

    #[must_use]
    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    #[must_use]
    pub fn mask_token_id(&self) -> u32 {
        self.mask_token_id
    }

    /// CRR/DP on a sequence already masked at `mask_index`.
    ///
    /// # Errors
    /// See [`measures::compute_crr_dp`].
    pub fn crr_dp(
        &self,
        token_ids: &[u32],
        mask_index: usize,
        true_token: u32,
    ) -> Result<CrrDpResult> {
        measures::compute_crr_dp(
            self.model,
            self.config.device,
            token_ids,
            mask_index,
            true_token,
            &self.config.crr_dp,
        )
    }

    /// CRR/DP on an unmasked sequence: masks `mask_index` and scores the
    /// token that was there.
    ///
    /// # Errors
    /// See [`measures::compute_crr_dp`].
    pub fn crr_dp_unmasked(&self, token_ids: &[u32], mask_index: usize) -> Result<CrrDpResult> {
        let (masked, true_token) =
            measures::mask_position(token_ids, mask_index, self.mask_token_id)?;
        self.crr_dp(&masked, mask_index, true_token)
    }

    /// # Errors
    /// See [`measures::compute_aul`].
    pub fn aul(&self, token_ids: &[u32]) -> Result<AulResult> {
        measures::compute_aul(self.model, self.config.device, token_ids, &self.config.aul)
    }

    /// # Errors
    /// See [`measures::compute_csps`].
    pub fn csps(&self, token_ids: &[u32], spans: &[usize]) -> Result<CspsResult> {
        measures::compute_csps(
            self.model,
            self.config.device,
            token_ids,
            spans,
            self.mask_token_id,
            &self.config.csps,
        )
    }

    /// # Errors
    /// See [`measures::compute_sss`].
    pub fn sss(&self, token_ids: &[u32], spans: &[usize]) -> Result<SssResult> {
        measures::compute_sss(
            self.model,
            self.config.device,
            token_ids,
            spans,
            self.mask_token_id,
            &self.config.sss,
        )
    }

    /// Run whichever measure `request` names.
    ///
    /// # Errors
    /// Returns the selected measure's error.
    pub fn evaluate(&self, request: &MeasureRequest) -> Result<MeasureResult> {
        match request {
            MeasureRequest::CrrDp {
                token_ids,
                mask_index,
                true_token: Some(true_token),
            } => self
                .crr_dp(token_ids, *mask_index, *true_token)
                .map(MeasureResult::CrrDp),
            MeasureRequest::CrrDp {
                token_ids,
                mask_index,
                true_token: None,
            } => self
                .crr_dp_unmasked(token_ids, *mask_index)
                .map(MeasureResult::CrrDp),
            MeasureRequest::Aul { token_ids } => self.aul(token_ids).map(MeasureResult::Aul),
            MeasureRequest::Csps { token_ids, spans } => {
                self.csps(token_ids, spans).map(MeasureResult::Csps)
            }
            MeasureRequest::Sss { token_ids, spans } => {
                self.sss(token_ids, spans).map(MeasureResult::Sss)
            }
        }
    }
}
