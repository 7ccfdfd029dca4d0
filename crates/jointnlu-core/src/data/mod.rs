pub mod corpus;
pub mod dataset;
pub mod output;

pub use corpus::{load_labeled, load_utterances, shuffle, train_dev_split, AtisRecord};
pub use dataset::{AtisDataset, Batch, BatchLoader, EncodedExample};
pub use output::{read_label_lines, write_gold_labels, write_label_lines, LabelLine};
