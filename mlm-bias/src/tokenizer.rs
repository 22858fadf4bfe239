//! Tokenizer boundary
//!
//! The engine never tokenizes text itself. Callers bring a tokenizer that
//! produces ids with a boundary token at each end and knows its mask token.

use crate::Result;

/// Trait for tokenizers that feed masked-language-model measures.
pub trait Tokenizer {
    /// Encode text to token IDs, including the leading and trailing
    /// boundary tokens (e.g. `[CLS]` ... `[SEP]`).
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token IDs to text.
    ///
    /// # Errors
    /// Returns an error if decoding fails.
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// Get the mask token ID.
    fn mask_token_id(&self) -> u32;
}
