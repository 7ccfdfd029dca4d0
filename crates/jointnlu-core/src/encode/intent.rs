//! Multi-label intent encoding and decoding.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::labels::{LabelVocab, NO_INTENT};

/// Default probability a label must reach to be predicted.
pub const DEFAULT_INTENT_THRESHOLD: f32 = 0.4;

/// One-hot encode an intent label set over the vocabulary.
///
/// Fails with `UnknownLabel` for intents the vocabulary has never seen.
pub fn encode_intents<S: AsRef<str>>(intents: &[S], vocab: &LabelVocab) -> Result<Vec<f32>> {
    let mut one_hot = vec![0.0f32; vocab.len()];
    for intent in intents {
        one_hot[vocab.require_id(intent.as_ref())?] = 1.0;
    }
    Ok(one_hot)
}

/// Rule turning per-label intent probabilities into label strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentDecoding {
    /// Every label at or above the threshold; [`NO_INTENT`] if none is.
    Threshold(f32),
    /// The single highest-scoring label.
    ArgMax,
}

impl Default for IntentDecoding {
    fn default() -> Self {
        IntentDecoding::Threshold(DEFAULT_INTENT_THRESHOLD)
    }
}

impl IntentDecoding {
    /// Decode sigmoid probabilities (one per vocabulary entry).
    pub fn decode(&self, probabilities: &[f32], vocab: &LabelVocab) -> Vec<String> {
        let ids: Vec<usize> = match *self {
            IntentDecoding::Threshold(threshold) => probabilities
                .iter()
                .enumerate()
                .filter(|&(_, &p)| p >= threshold)
                .map(|(i, _)| i)
                .collect(),
            IntentDecoding::ArgMax => argmax(probabilities).into_iter().collect(),
        };

        let labels: Vec<String> = ids
            .into_iter()
            .filter_map(|id| vocab.label(id).map(str::to_string))
            .collect();

        if labels.is_empty() {
            vec![NO_INTENT.to_string()]
        } else {
            labels
        }
    }
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{JointNluError, LabelKind};

    fn intent_vocab() -> LabelVocab {
        LabelVocab::from_sequences(
            LabelKind::Intent,
            [
                vec!["movie.starring.actor"],
                vec!["movie.directed_by", "movie.starring.actor"],
                vec![NO_INTENT],
            ],
        )
    }

    #[test]
    fn test_encode_multi_label() {
        let vocab = intent_vocab();
        let one_hot =
            encode_intents(&["movie.directed_by", "movie.starring.actor"], &vocab).unwrap();
        assert_eq!(one_hot.len(), vocab.len());
        assert_eq!(one_hot, vec![0.0, 0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_encode_unseen_intent_fails() {
        let vocab = intent_vocab();
        let err = encode_intents(&["movie.gross"], &vocab).unwrap_err();
        assert!(matches!(err, JointNluError::UnknownLabel { .. }));
    }

    #[test]
    fn test_threshold_recovers_single_label() {
        let vocab = intent_vocab();
        for id in 0..vocab.len() {
            let mut one_hot = vec![0.0; vocab.len()];
            one_hot[id] = 1.0;
            let decoded = IntentDecoding::Threshold(0.4).decode(&one_hot, &vocab);
            assert_eq!(decoded, vec![vocab.label(id).unwrap().to_string()]);
        }
    }

    #[test]
    fn test_all_zero_decodes_to_no_intent() {
        let vocab = intent_vocab();
        let decoded = IntentDecoding::default().decode(&vec![0.0; vocab.len()], &vocab);
        assert_eq!(decoded, vec![NO_INTENT.to_string()]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let vocab = intent_vocab();
        let decoded = IntentDecoding::Threshold(0.4).decode(&[0.1, 0.2, 0.4, 0.39, 0.9], &vocab);
        assert_eq!(decoded, vec!["movie.starring.actor", NO_INTENT]);
    }

    #[test]
    fn test_argmax_picks_one() {
        let vocab = intent_vocab();
        let decoded = IntentDecoding::ArgMax.decode(&[0.1, 0.2, 0.3, 0.8, 0.7], &vocab);
        assert_eq!(decoded, vec!["movie.directed_by"]);
    }

    #[test]
    fn test_argmax_ties_and_empty() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_config_names() {
        let rule: IntentDecoding = serde_json::from_str(r#"{"threshold":0.5}"#).unwrap();
        assert_eq!(rule, IntentDecoding::Threshold(0.5));
        let rule: IntentDecoding = serde_json::from_str(r#""arg_max""#).unwrap();
        assert_eq!(rule, IntentDecoding::ArgMax);
    }
}
