//! # Evaluation Metrics
//!
//! Compares predicted label lines with gold label lines: slot token
//! accuracy, slot span P/R/F1, intent exact match and intent micro P/R/F1.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::data::LabelLine;
use crate::error::{JointNluError, Result};
use crate::labels::{extract_spans, SlotTag};

/// Precision / recall / F1 triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Prf {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

impl Prf {
    fn from_counts(true_pos: usize, predicted: usize, gold: usize) -> Self {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f32 / den as f32 };
        let precision = ratio(true_pos, predicted);
        let recall = ratio(true_pos, gold);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            precision,
            recall,
            f1,
        }
    }
}

/// Aggregate scores over a split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub utterances: usize,
    /// Fraction of words whose predicted tag equals the gold tag.
    pub slot_token_accuracy: f32,
    /// Exact span matches (same slot, same word range).
    pub slot_spans: Prf,
    /// Fraction of utterances whose intent set equals the gold set.
    pub intent_exact_match: f32,
    /// Micro-averaged over individual intent labels.
    pub intents: Prf,
    /// Predicted tag sequences containing an `I-x` without a preceding `B-x`/`I-x`.
    pub ill_formed_slot_sequences: usize,
}

/// Whether a tag sequence respects BIO transitions.
pub fn is_well_formed<S: AsRef<str>>(tags: &[S]) -> bool {
    let parsed: Vec<SlotTag> = tags.iter().map(|t| SlotTag::parse(t.as_ref())).collect();
    parsed
        .iter()
        .enumerate()
        .all(|(i, tag)| SlotTag::is_valid_transition(i.checked_sub(1).map(|p| &parsed[p]), tag))
}

/// Score predictions against gold labels, line by line.
pub fn score(gold: &[LabelLine], predicted: &[LabelLine]) -> Result<Scores> {
    if gold.len() != predicted.len() {
        return Err(JointNluError::MalformedLine {
            line: gold.len().min(predicted.len()) + 1,
            reason: format!(
                "gold has {} lines but predictions have {}",
                gold.len(),
                predicted.len()
            ),
        });
    }

    let mut correct_tokens = 0usize;
    let mut total_tokens = 0usize;
    let (mut span_tp, mut span_pred, mut span_gold) = (0usize, 0usize, 0usize);
    let (mut intent_tp, mut intent_pred, mut intent_gold) = (0usize, 0usize, 0usize);
    let mut exact = 0usize;
    let mut ill_formed = 0usize;

    for (g, p) in gold.iter().zip(predicted) {
        total_tokens += g.slots.len();
        correct_tokens += g
            .slots
            .iter()
            .zip(&p.slots)
            .filter(|(a, b)| a == b)
            .count();

        let gold_spans: HashSet<_> = extract_spans(&g.slots).into_iter().collect();
        let pred_spans: HashSet<_> = extract_spans(&p.slots).into_iter().collect();
        span_tp += gold_spans.intersection(&pred_spans).count();
        span_gold += gold_spans.len();
        span_pred += pred_spans.len();

        if !is_well_formed(&p.slots) {
            ill_formed += 1;
        }

        let gold_intents: HashSet<&str> = g.intents.iter().map(String::as_str).collect();
        let pred_intents: HashSet<&str> = p.intents.iter().map(String::as_str).collect();
        intent_tp += gold_intents.intersection(&pred_intents).count();
        intent_gold += gold_intents.len();
        intent_pred += pred_intents.len();
        if gold_intents == pred_intents {
            exact += 1;
        }
    }

    let n = gold.len();
    Ok(Scores {
        utterances: n,
        slot_token_accuracy: if total_tokens == 0 {
            0.0
        } else {
            correct_tokens as f32 / total_tokens as f32
        },
        slot_spans: Prf::from_counts(span_tp, span_pred, span_gold),
        intent_exact_match: if n == 0 { 0.0 } else { exact as f32 / n as f32 },
        intents: Prf::from_counts(intent_tp, intent_pred, intent_gold),
        ill_formed_slot_sequences: ill_formed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(slots: &str, intents: &str) -> LabelLine {
        LabelLine::new(
            slots.split_whitespace().map(String::from).collect(),
            intents.split_whitespace().map(String::from).collect(),
        )
    }

    #[test]
    fn test_perfect_predictions() {
        let gold = vec![
            line("O O B-movie.name", "movie.directed_by"),
            line("O B-actor I-actor", "movie.starring.actor person.date_of_birth"),
        ];
        let scores = score(&gold, &gold).unwrap();
        assert_eq!(scores.utterances, 2);
        assert_eq!(scores.slot_token_accuracy, 1.0);
        assert_eq!(scores.slot_spans.f1, 1.0);
        assert_eq!(scores.intent_exact_match, 1.0);
        assert_eq!(scores.intents.f1, 1.0);
        assert_eq!(scores.ill_formed_slot_sequences, 0);
    }

    #[test]
    fn test_partial_predictions() {
        let gold = vec![line("O B-actor I-actor O", "a b")];
        let pred = vec![line("O B-actor O O", "a")];
        let scores = score(&gold, &pred).unwrap();

        assert_eq!(scores.slot_token_accuracy, 0.75);
        // Span (actor, 1..3) vs (actor, 1..2): no exact match.
        assert_eq!(scores.slot_spans.precision, 0.0);
        assert_eq!(scores.slot_spans.recall, 0.0);
        assert_eq!(scores.intent_exact_match, 0.0);
        assert_eq!(scores.intents.precision, 1.0);
        assert_eq!(scores.intents.recall, 0.5);
        assert!((scores.intents.f1 - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_ill_formed_counted() {
        let gold = vec![line("O B-city", "x")];
        let pred = vec![line("I-city O", "x")];
        let scores = score(&gold, &pred).unwrap();
        assert_eq!(scores.ill_formed_slot_sequences, 1);
        assert!(is_well_formed(&["B-city", "I-city", "O"]));
        assert!(!is_well_formed(&["O", "I-city"]));
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let gold = vec![line("O", "x"), line("O", "y")];
        let pred = vec![line("O", "x")];
        assert!(score(&gold, &pred).is_err());
    }

    #[test]
    fn test_empty_split() {
        let scores = score(&[], &[]).unwrap();
        assert_eq!(scores, Scores::default());
    }
}
