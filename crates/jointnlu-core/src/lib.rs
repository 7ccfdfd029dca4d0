//! # JointNLU Core
//!
//! Data side of a joint intent-classification and slot-tagging model:
//! ATIS CSV loading, label vocabularies, BIO tag alignment onto sub-word
//! tokens, multi-label intent encoding, batching, decoding and scoring.
//!
//! ## Quick Start
//!
//! ```rust
//! use jointnlu_core::encode::align_slot_labels;
//! use jointnlu_core::labels::{LabelVocab, IGNORE_INDEX};
//! use jointnlu_core::LabelKind;
//!
//! let vocab = LabelVocab::from_sequences(LabelKind::Slot, [["O", "B-city", "I-city"]]);
//! let city = vocab.id("B-city").unwrap();
//!
//! // One word split into two sub-word pieces.
//! let labels = align_slot_labels(&[city], &[(0, 3), (3, 5)]).unwrap();
//! assert_eq!(labels, vec![city as i64, IGNORE_INDEX]);
//! ```
pub mod data;
pub mod decode;
pub mod encode;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod tokenize;

// Re-export primary API
pub use data::{AtisDataset, AtisRecord, Batch, BatchLoader, EncodedExample, LabelLine};
pub use decode::SlotReadout;
pub use encode::{align_slot_labels, encode_intents, IntentDecoding};
pub use error::{JointNluError, LabelKind, Result};
pub use labels::{LabelVocab, SlotTag, IGNORE_INDEX, NO_INTENT};
pub use metrics::{score, Scores};
pub use tokenize::{SubwordTokenizer, WordEncoding};
