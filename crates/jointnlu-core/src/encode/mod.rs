pub mod align;
pub mod intent;

pub use align::{align_slot_labels, is_word_start, word_start_positions};
pub use intent::{argmax, encode_intents, IntentDecoding, DEFAULT_INTENT_THRESHOLD};
