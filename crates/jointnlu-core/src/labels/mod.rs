pub mod bio;
pub mod vocab;

pub use bio::{extract_spans, SlotSpan, SlotTag};
pub use vocab::{LabelVocab, IGNORE_INDEX, NO_INTENT, OUTSIDE, PAD};
