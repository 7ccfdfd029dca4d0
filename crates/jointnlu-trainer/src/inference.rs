//! Prediction with a trained joint model.

use candle_core::{Device, Tensor, D};
use jointnlu_core::{IntentDecoding, LabelLine, LabelVocab, SlotReadout, SubwordTokenizer};
use tracing::debug;

use crate::model::{padding_mask, JointModel};

/// Per-utterance predictor.
pub struct Predictor<'a> {
    model: &'a JointModel,
    tokenizer: &'a SubwordTokenizer,
    slot_vocab: &'a LabelVocab,
    intent_vocab: &'a LabelVocab,
    readout: SlotReadout,
    device: Device,
}

impl<'a> Predictor<'a> {
    pub fn new(
        model: &'a JointModel,
        tokenizer: &'a SubwordTokenizer,
        slot_vocab: &'a LabelVocab,
        intent_vocab: &'a LabelVocab,
        device: Device,
    ) -> Self {
        Self {
            model,
            tokenizer,
            slot_vocab,
            intent_vocab,
            readout: SlotReadout::default(),
            device,
        }
    }

    pub fn with_readout(mut self, readout: SlotReadout) -> Self {
        self.readout = readout;
        self
    }

    /// Predict one tag per word and the intent set of one utterance.
    pub fn predict<S: AsRef<str>>(
        &self,
        words: &[S],
        intent_rule: IntentDecoding,
    ) -> anyhow::Result<LabelLine> {
        let encoding = self.tokenizer.encode_words(words)?;
        let seq_len = encoding.len();

        let input_ids = Tensor::from_vec(encoding.ids.clone(), (1, seq_len), &self.device)?;
        let mask = padding_mask(&encoding.attention_mask, 1, seq_len, &self.device)?;
        let output = self.model.forward(&input_ids, &mask, None, None, false)?;

        let slot_ids = candle_nn::ops::softmax_last_dim(&output.slot_logits)?
            .argmax(D::Minus1)?
            .squeeze(0)?
            .to_vec1::<u32>()?;
        let slots = self.readout.decode(
            &slot_ids,
            &encoding.offsets,
            encoding.word_count,
            self.slot_vocab,
        );

        let probabilities = candle_nn::ops::sigmoid(&output.intent_logits)?
            .squeeze(0)?
            .to_vec1::<f32>()?;
        let intents = intent_rule.decode(&probabilities, self.intent_vocab);

        debug!(words = encoding.word_count, ?intents, "predicted");
        Ok(LabelLine::new(slots, intents))
    }

    /// Predict every utterance in order.
    pub fn predict_all<W, S>(
        &self,
        utterances: &[W],
        intent_rule: IntentDecoding,
    ) -> anyhow::Result<Vec<LabelLine>>
    where
        W: AsRef<[S]>,
        S: AsRef<str>,
    {
        utterances
            .iter()
            .map(|words| self.predict(words.as_ref(), intent_rule))
            .collect()
    }
}
