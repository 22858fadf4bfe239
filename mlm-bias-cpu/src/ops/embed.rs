//! Embedding lookup.

use mlm_bias::{Error, Result};

/// Gather rows of `table` (shape `(vocab, hidden_size)`) for each id.
///
/// # Errors
/// Returns `InputShape` for an id outside the table.
pub fn embedding_gather(table: &[f32], hidden_size: usize, indices: &[u32]) -> Result<Vec<f32>> {
    let vocab_size = table.len() / hidden_size;
    let mut out = Vec::with_capacity(indices.len() * hidden_size);
    for &idx in indices {
        let row = idx as usize;
        if row >= vocab_size {
            return Err(Error::InputShape(format!(
                "token id {idx} is outside the vocabulary of {vocab_size}"
            )));
        }
        let start = row * hidden_size;
        out.extend_from_slice(&table[start..start + hidden_size]);
    }
    Ok(out)
}
