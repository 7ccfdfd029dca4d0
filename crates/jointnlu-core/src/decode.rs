//! # Slot Decoding
//!
//! Turns per-token predicted slot ids back into one tag string per word.

use serde::{Deserialize, Serialize};

use crate::encode::word_start_positions;
use crate::labels::{LabelVocab, OUTSIDE};

/// How per-token predictions are read back as per-word tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotReadout {
    /// Drop the leading special token and keep the next `word_count`
    /// positions.
    #[default]
    Leading,
    /// Keep the prediction at each word-start sub-word.
    FirstPiece,
}

impl SlotReadout {
    /// Decode predicted ids for one utterance.
    ///
    /// # Arguments
    /// * `predicted` - Predicted slot id per sub-word token
    /// * `offsets` - Sub-word offsets, only used by [`SlotReadout::FirstPiece`]
    /// * `word_count` - Words in the source utterance
    /// * `vocab` - Slot vocabulary
    ///
    /// # Returns
    /// Exactly `word_count` tags; positions the sequence does not cover
    /// (e.g. after truncation) are filled with `O`.
    pub fn decode(
        &self,
        predicted: &[u32],
        offsets: &[(usize, usize)],
        word_count: usize,
        vocab: &LabelVocab,
    ) -> Vec<String> {
        let ids: Vec<u32> = match self {
            SlotReadout::Leading => predicted.iter().skip(1).take(word_count).copied().collect(),
            SlotReadout::FirstPiece => word_start_positions(offsets)
                .into_iter()
                .filter_map(|pos| predicted.get(pos).copied())
                .take(word_count)
                .collect(),
        };

        let mut tags: Vec<String> = ids
            .into_iter()
            .map(|id| vocab.label(id as usize).unwrap_or(OUTSIDE).to_string())
            .collect();
        tags.resize(word_count, OUTSIDE.to_string());
        tags
    }
}
