//! # Label Vocabularies
//!
//! Bidirectional maps between label strings and dense ids. Ids are assigned
//! in first-occurrence order after the sentinel entries, so building the same
//! vocabulary from the same training split always yields the same ids.

use std::collections::HashMap;

use crate::error::{JointNluError, LabelKind, Result};

/// Outside tag, also the first sentinel of every vocabulary.
pub const OUTSIDE: &str = "O";

/// Padding sentinel.
pub const PAD: &str = "PAD";

/// Label assigned when no intent clears the decision threshold.
pub const NO_INTENT: &str = "no_intent";

/// Sentinel written into aligned slot labels for positions the loss must skip.
///
/// Negative, so it can never collide with a vocabulary id.
pub const IGNORE_INDEX: i64 = -100;

/// Dense label inventory for one label kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocab {
    kind: LabelKind,
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelVocab {
    /// Create a vocabulary holding only the `O` and `PAD` sentinels.
    pub fn with_sentinels(kind: LabelKind) -> Self {
        let mut vocab = Self {
            kind,
            labels: Vec::new(),
            index: HashMap::new(),
        };
        vocab.insert(OUTSIDE);
        vocab.insert(PAD);
        vocab
    }

    /// Build a vocabulary from label sequences, in first-occurrence order.
    pub fn from_sequences<I, S, L>(kind: LabelKind, sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let mut vocab = Self::with_sentinels(kind);
        for sequence in sequences {
            for label in sequence {
                vocab.insert(label.as_ref());
            }
        }
        vocab
    }

    /// Insert a label if it is new, returning its id either way.
    pub fn insert(&mut self, label: &str) -> usize {
        if let Some(&id) = self.index.get(label) {
            return id;
        }
        let id = self.labels.len();
        self.labels.push(label.to_string());
        self.index.insert(label.to_string(), id);
        id
    }

    pub fn id(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Look up a label, failing with [`JointNluError::UnknownLabel`].
    pub fn require_id(&self, label: &str) -> Result<usize> {
        self.id(label).ok_or_else(|| JointNluError::UnknownLabel {
            kind: self.kind,
            label: label.to_string(),
        })
    }

    pub fn label(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Map a label sequence to ids.
    pub fn encode<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels.iter().map(|l| self.require_id(l.as_ref())).collect()
    }

    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_come_first() {
        let vocab = LabelVocab::with_sentinels(LabelKind::Slot);
        assert_eq!(vocab.id(OUTSIDE), Some(0));
        assert_eq!(vocab.id(PAD), Some(1));
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn test_first_occurrence_order() {
        let vocab = LabelVocab::from_sequences(
            LabelKind::Slot,
            [
                vec!["O", "B-city", "I-city"],
                vec!["B-date", "O", "B-city"],
            ],
        );
        assert_eq!(
            vocab.labels(),
            &["O", "PAD", "B-city", "I-city", "B-date"]
        );
        assert_eq!(vocab.id("B-date"), Some(4));
        assert_eq!(vocab.label(3), Some("I-city"));
        assert_eq!(vocab.label(99), None);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut vocab = LabelVocab::with_sentinels(LabelKind::Intent);
        let a = vocab.insert("movie.starring.actor");
        let b = vocab.insert("movie.starring.actor");
        assert_eq!(a, b);
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn test_unknown_label_is_typed_error() {
        let vocab = LabelVocab::with_sentinels(LabelKind::Intent);
        let err = vocab.require_id("movie.gross").unwrap_err();
        assert!(matches!(
            err,
            JointNluError::UnknownLabel {
                kind: LabelKind::Intent,
                ..
            }
        ));
    }

    #[test]
    fn test_ignore_index_is_never_an_id() {
        let vocab = LabelVocab::from_sequences(LabelKind::Slot, [vec!["B-city"]]);
        assert!(IGNORE_INDEX < 0);
        assert!(vocab.labels().iter().all(|l| vocab.id(l).unwrap() as i64 != IGNORE_INDEX));
    }
}
