//! # Sub-word Label Alignment
//!
//! Projects word-level slot tag ids onto sub-word token positions. Only the
//! first piece of each word carries the word's tag; continuation pieces,
//! special tokens and padding carry [`IGNORE_INDEX`] so the slot loss skips
//! them.

use crate::error::{JointNluError, Result};
use crate::labels::IGNORE_INDEX;

/// Whether a sub-word offset marks the first piece of a word.
///
/// Offsets are relative to the originating word. Special and padding tokens
/// report `(0, 0)`, so a start of 0 alone is not enough.
#[inline]
pub fn is_word_start(offset: (usize, usize)) -> bool {
    offset.0 == 0 && offset.1 != 0
}

/// Align word tag ids to sub-word positions.
///
/// # Arguments
/// * `tag_ids` - One tag id per word, in word order
/// * `offsets` - Per sub-word `(start, end)` within its word
///
/// # Returns
/// One label per sub-word: the next unconsumed word tag at word starts,
/// [`IGNORE_INDEX`] elsewhere.
///
/// # Errors
/// [`JointNluError::AlignmentMismatch`] when the number of word-start
/// positions differs from the number of tags, which happens when a word
/// produced no non-empty piece or the sequence was truncated.
///
/// # Examples
/// ```
/// use jointnlu_core::encode::align_slot_labels;
/// use jointnlu_core::labels::IGNORE_INDEX;
///
/// let labels = align_slot_labels(&[2], &[(0, 0), (0, 3), (3, 5), (0, 0)]).unwrap();
/// assert_eq!(labels, vec![IGNORE_INDEX, 2, IGNORE_INDEX, IGNORE_INDEX]);
/// ```
pub fn align_slot_labels(tag_ids: &[usize], offsets: &[(usize, usize)]) -> Result<Vec<i64>> {
    let starts = offsets.iter().filter(|&&o| is_word_start(o)).count();
    if starts != tag_ids.len() {
        return Err(JointNluError::AlignmentMismatch {
            tags: tag_ids.len(),
            starts,
        });
    }

    let mut tags = tag_ids.iter();
    let labels = offsets
        .iter()
        .map(|&offset| {
            if is_word_start(offset) {
                // Counted above, so every start has a tag.
                tags.next().map_or(IGNORE_INDEX, |&id| id as i64)
            } else {
                IGNORE_INDEX
            }
        })
        .collect();

    Ok(labels)
}

/// Positions of word-start sub-words, in order.
pub fn word_start_positions(offsets: &[(usize, usize)]) -> Vec<usize> {
    offsets
        .iter()
        .enumerate()
        .filter(|&(_, &o)| is_word_start(o))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabelKind;
    use crate::labels::LabelVocab;

    #[test]
    fn test_single_word_two_pieces() {
        let vocab = LabelVocab::from_sequences(LabelKind::Slot, [vec!["O", "B-city", "I-city"]]);
        let city = vocab.id("B-city").unwrap();

        let labels = align_slot_labels(&[city], &[(0, 3), (3, 5)]).unwrap();
        assert_eq!(labels, vec![city as i64, IGNORE_INDEX]);
    }

    #[test]
    fn test_length_matches_offsets() {
        let offsets = [(0, 0), (0, 4), (0, 7), (0, 2), (2, 6), (0, 0), (0, 0)];
        let labels = align_slot_labels(&[0, 2, 3], &offsets).unwrap();
        assert_eq!(labels.len(), offsets.len());
    }

    #[test]
    fn test_tags_consumed_left_to_right() {
        // [CLS] show flights to bos ##ton [SEP] [PAD]
        let offsets = [(0, 0), (0, 4), (0, 7), (0, 2), (0, 3), (3, 6), (0, 0), (0, 0)];
        let labels = align_slot_labels(&[0, 0, 0, 5], &offsets).unwrap();
        assert_eq!(
            labels,
            vec![IGNORE_INDEX, 0, 0, 0, 5, IGNORE_INDEX, IGNORE_INDEX, IGNORE_INDEX]
        );
    }

    #[test]
    fn test_non_start_positions_are_ignored() {
        let offsets = [(0, 0), (0, 2), (2, 4), (4, 5), (0, 1), (0, 0)];
        let labels = align_slot_labels(&[7, 8], &offsets).unwrap();
        for (label, &offset) in labels.iter().zip(offsets.iter()) {
            if !is_word_start(offset) {
                assert_eq!(*label, IGNORE_INDEX);
            }
        }
        assert_eq!(word_start_positions(&offsets), vec![1, 4]);
    }

    #[test]
    fn test_missing_word_start_is_an_error() {
        // Second word produced no non-empty piece.
        let err = align_slot_labels(&[1, 2], &[(0, 0), (0, 3), (0, 0)]).unwrap_err();
        assert!(matches!(
            err,
            JointNluError::AlignmentMismatch { tags: 2, starts: 1 }
        ));
    }

    #[test]
    fn test_empty_utterance() {
        let labels = align_slot_labels(&[], &[(0, 0), (0, 0)]).unwrap();
        assert_eq!(labels, vec![IGNORE_INDEX, IGNORE_INDEX]);
    }
}
