//! # Joint Intent / Slot Model
//!
//! DistilBERT encoder with two heads: a multi-label intent classifier over
//! the pooled first-token representation and a per-token slot classifier.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use candle_core::{DType, Device, IndexOp, Result, Tensor, D};
use candle_nn::{linear, Dropout, Linear, Module, VarBuilder, VarMap};
use jointnlu_core::IGNORE_INDEX;
use tracing::{debug, info, warn};

use crate::encoder::{DistilBertConfig, DistilBertEncoder};

/// Parameter prefixes of the layers this model adds on top of the encoder.
const HEAD_PREFIXES: &[&str] = &["pooler.", "intent_classifier.", "slot_classifier."];

/// Outputs of one forward pass.
///
/// Losses are zero scalars when the matching labels were not supplied.
pub struct JointOutput {
    /// `[batch, num_intent_labels]`
    pub intent_logits: Tensor,
    /// `[batch, seq_len, num_slot_labels]`
    pub slot_logits: Tensor,
    pub slot_loss: Tensor,
    pub intent_loss: Tensor,
}

/// Pretrained encoder plus intent and slot heads.
pub struct JointModel {
    encoder: DistilBertEncoder,
    pooler: Linear,
    dropout: Dropout,
    intent_classifier: Linear,
    slot_classifier: Linear,
    num_intent_labels: usize,
    num_slot_labels: usize,
}

impl JointModel {
    /// Build the model, creating or fetching parameters through `vb`.
    pub fn new(
        vb: VarBuilder,
        config: &DistilBertConfig,
        dropout: f32,
        num_intent_labels: usize,
        num_slot_labels: usize,
    ) -> Result<Self> {
        let hidden = config.dim;
        let encoder = DistilBertEncoder::new(config, vb.pp("distilbert"))?;
        let pooler = linear(hidden, hidden, vb.pp("pooler").pp("dense"))?;
        let intent_classifier = linear(hidden, num_intent_labels, vb.pp("intent_classifier"))?;
        let slot_classifier = linear(hidden, num_slot_labels, vb.pp("slot_classifier"))?;

        Ok(Self {
            encoder,
            pooler,
            dropout: Dropout::new(dropout),
            intent_classifier,
            slot_classifier,
            num_intent_labels,
            num_slot_labels,
        })
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// * `input_ids` - `[batch, seq_len]` u32 token ids
    /// * `padding_mask` - `[batch, 1, 1, seq_len]` u8, non-zero on padding
    /// * `intent_labels` - `[batch, num_intent_labels]` f32 one-hot
    /// * `slot_labels` - `[batch, seq_len]` i64, [`IGNORE_INDEX`] where masked
    /// * `train` - Enables dropout
    pub fn forward(
        &self,
        input_ids: &Tensor,
        padding_mask: &Tensor,
        intent_labels: Option<&Tensor>,
        slot_labels: Option<&Tensor>,
        train: bool,
    ) -> Result<JointOutput> {
        let hidden_states = self.encoder.forward(input_ids, padding_mask)?;

        let first_token = hidden_states.i((.., 0))?;
        let pooled = self.pooler.forward(&first_token)?.tanh()?;

        let intent_logits = self
            .intent_classifier
            .forward(&self.dropout.forward(&pooled, train)?)?;
        let slot_logits = self
            .slot_classifier
            .forward(&self.dropout.forward(&hidden_states, train)?)?;

        let device = input_ids.device();
        let intent_loss = match intent_labels {
            Some(labels) => binary_cross_entropy_with_logits(&intent_logits, labels)?,
            None => zero_loss(device)?,
        };
        let slot_loss = match slot_labels {
            Some(labels) => masked_cross_entropy(&slot_logits, labels)?,
            None => zero_loss(device)?,
        };

        Ok(JointOutput {
            intent_logits,
            slot_logits,
            slot_loss,
            intent_loss,
        })
    }

    pub fn num_intent_labels(&self) -> usize {
        self.num_intent_labels
    }

    pub fn num_slot_labels(&self) -> usize {
        self.num_slot_labels
    }
}

fn zero_loss(device: &Device) -> Result<Tensor> {
    Tensor::zeros((), DType::F32, device)
}

/// Mean binary cross-entropy on logits.
///
/// Uses `max(x, 0) - x * t + ln(1 + e^-|x|)`, which stays finite for any
/// logit magnitude.
pub fn binary_cross_entropy_with_logits(logits: &Tensor, targets: &Tensor) -> Result<Tensor> {
    let softplus = (logits.abs()?.neg()?.exp()? + 1.0)?.log()?;
    let loss = ((logits.relu()? - (logits * targets)?)? + softplus)?;
    loss.mean_all()
}

/// Cross-entropy over the positions whose label is not [`IGNORE_INDEX`].
///
/// Returns a zero scalar when every position is ignored.
pub fn masked_cross_entropy(logits: &Tensor, labels: &Tensor) -> Result<Tensor> {
    let num_labels = logits.dim(D::Minus1)?;
    let logits = logits.reshape(((), num_labels))?;
    let labels = labels.flatten_all()?.to_vec1::<i64>()?;

    let (positions, targets): (Vec<u32>, Vec<u32>) = labels
        .iter()
        .enumerate()
        .filter(|&(_, &label)| label != IGNORE_INDEX && label >= 0)
        .map(|(pos, &label)| (pos as u32, label as u32))
        .unzip();

    let device = logits.device();
    if positions.is_empty() {
        return zero_loss(device);
    }

    let positions = Tensor::new(positions.as_slice(), device)?;
    let targets = Tensor::new(targets.as_slice(), device)?;
    let active_logits = logits.index_select(&positions, 0)?;
    candle_nn::loss::cross_entropy(&active_logits, &targets)
}

/// Build the encoder's padding mask from a 0/1 attention mask.
///
/// The encoder penalises attention to positions where this mask is
/// non-zero, so padding positions get 1.
pub fn padding_mask(
    attention_mask: &[u32],
    batch_size: usize,
    seq_len: usize,
    device: &Device,
) -> Result<Tensor> {
    let mask: Vec<u8> = attention_mask.iter().map(|&m| u8::from(m == 0)).collect();
    Tensor::from_vec(mask, (batch_size, 1, 1, seq_len), device)
}

/// Summary of copying pretrained weights into a [`VarMap`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Head parameters, freshly initialised.
    pub initialised: Vec<String>,
    /// Encoder parameters absent from the checkpoint.
    pub missing: Vec<String>,
}

/// Copy matching tensors from a safetensors checkpoint into `varmap`.
pub fn load_pretrained(
    varmap: &VarMap,
    weights_path: &Path,
    device: &Device,
) -> anyhow::Result<LoadReport> {
    let tensors = candle_core::safetensors::load(weights_path, device)
        .with_context(|| format!("Failed to read {}", weights_path.display()))?;
    copy_into_varmap(varmap, &tensors)
}

/// Copy tensors into the variables of the same name.
pub fn copy_into_varmap(
    varmap: &VarMap,
    tensors: &HashMap<String, Tensor>,
) -> anyhow::Result<LoadReport> {
    let vars = varmap
        .data()
        .lock()
        .map_err(|_| anyhow::anyhow!("Variable map lock poisoned"))?;

    let mut report = LoadReport::default();
    for (name, var) in vars.iter() {
        // Bare encoder checkpoints omit the `distilbert.` prefix.
        let source = tensors
            .get(name)
            .or_else(|| name.strip_prefix("distilbert.").and_then(|n| tensors.get(n)));
        match source {
            Some(tensor) => {
                var.set(&tensor.to_dtype(var.dtype())?)
                    .with_context(|| format!("Shape mismatch for {name}"))?;
                report.loaded += 1;
            }
            None if HEAD_PREFIXES.iter().any(|p| name.starts_with(p)) => {
                report.initialised.push(name.clone())
            }
            None => report.missing.push(name.clone()),
        }
    }
    report.initialised.sort();
    report.missing.sort();

    info!(
        "Loaded {} pretrained tensors, initialised {} head tensors",
        report.loaded,
        report.initialised.len()
    );
    if !report.missing.is_empty() {
        warn!(
            "{} encoder tensors missing from checkpoint, left at random init",
            report.missing.len()
        );
        debug!("Missing tensors: {:?}", report.missing);
    }
    Ok(report)
}

/// Build a trainable model from pretrained files.
pub fn build_model(
    config: &DistilBertConfig,
    weights_path: &Path,
    dropout: f32,
    num_intent_labels: usize,
    num_slot_labels: usize,
    device: &Device,
) -> anyhow::Result<(JointModel, VarMap)> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = JointModel::new(vb, config, dropout, num_intent_labels, num_slot_labels)
        .context("Failed to construct joint model")?;
    load_pretrained(&varmap, weights_path, device)?;
    Ok((model, varmap))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TINY_CONFIG: &str = r#"{
        "vocab_size": 14,
        "dim": 8,
        "n_layers": 1,
        "n_heads": 2,
        "hidden_dim": 16,
        "activation": "gelu",
        "max_position_embeddings": 32,
        "initializer_range": 0.02,
        "pad_token_id": 0,
        "model_type": "distilbert"
    }"#;

    pub(crate) fn tiny_model(dropout: f32) -> (JointModel, VarMap) {
        let config = DistilBertConfig::from_json(TINY_CONFIG).unwrap();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = JointModel::new(vb, &config, dropout, 5, 4).unwrap();
        (model, varmap)
    }

    fn inputs() -> (Tensor, Tensor) {
        let ids = Tensor::new(&[[2u32, 5, 6, 7, 8, 3]], &Device::Cpu).unwrap();
        let mask = padding_mask(&[1; 6], 1, 6, &Device::Cpu).unwrap();
        (ids, mask)
    }

    #[test]
    fn test_config_ignores_unused_fields() {
        let config = DistilBertConfig::from_json(TINY_CONFIG).unwrap();
        assert_eq!(config.dim, 8);
        assert_eq!(config.n_layers, 1);
    }

    #[test]
    fn test_bce_stays_finite_for_large_logits() {
        let logits = Tensor::new(&[[20f32, -3.0]], &Device::Cpu).unwrap();
        let targets = Tensor::new(&[[1f32, 0.0]], &Device::Cpu).unwrap();
        let loss = binary_cross_entropy_with_logits(&logits, &targets)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(loss.is_finite());
        // (ln(1 + e^-20) + ln(1 + e^-3)) / 2
        let expected = ((-20f32).exp().ln_1p() + (-3f32).exp().ln_1p()) / 2.0;
        assert!((loss - expected).abs() < 1e-5);

        let logits = Tensor::new(&[[-100f32, 100.0]], &Device::Cpu).unwrap();
        let loss = binary_cross_entropy_with_logits(&logits, &targets)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!((loss - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_bce_matches_definition_for_moderate_logits() {
        let logits = Tensor::new(&[[0.5f32, -1.0], [2.0, 0.0]], &Device::Cpu).unwrap();
        let targets = Tensor::new(&[[1f32, 0.0], [0.0, 1.0]], &Device::Cpu).unwrap();
        let loss = binary_cross_entropy_with_logits(&logits, &targets)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();

        let sigmoid = |x: f32| 1.0 / (1.0 + (-x).exp());
        let expected = -(sigmoid(0.5).ln()
            + (1.0 - sigmoid(-1.0)).ln()
            + (1.0 - sigmoid(2.0)).ln()
            + sigmoid(0.0).ln())
            / 4.0;
        assert!((loss - expected).abs() < 1e-5);
    }

    #[test]
    fn test_forward_shapes_without_labels() {
        let (model, _varmap) = tiny_model(0.2);
        let (ids, mask) = inputs();
        let out = model.forward(&ids, &mask, None, None, false).unwrap();

        assert_eq!(out.intent_logits.dims(), &[1, 5]);
        assert_eq!(out.slot_logits.dims(), &[1, 6, 4]);
        assert_eq!(out.slot_loss.to_scalar::<f32>().unwrap(), 0.0);
        assert_eq!(out.intent_loss.to_scalar::<f32>().unwrap(), 0.0);
    }

    #[test]
    fn test_forward_losses_are_finite() {
        let (model, _varmap) = tiny_model(0.0);
        let (ids, mask) = inputs();
        let intents = Tensor::new(&[[0f32, 0., 1., 0., 1.]], &Device::Cpu).unwrap();
        let slots = Tensor::new(&[[IGNORE_INDEX, 0, 0, 2, IGNORE_INDEX, IGNORE_INDEX]], &Device::Cpu)
            .unwrap();

        let out = model
            .forward(&ids, &mask, Some(&intents), Some(&slots), true)
            .unwrap();
        let slot_loss = out.slot_loss.to_scalar::<f32>().unwrap();
        let intent_loss = out.intent_loss.to_scalar::<f32>().unwrap();
        assert!(slot_loss.is_finite() && slot_loss > 0.0);
        assert!(intent_loss.is_finite() && intent_loss > 0.0);
    }

    #[test]
    fn test_masked_cross_entropy_ignores_sentinel() {
        let logits = Tensor::new(&[[[0f32, 10.0], [10.0, 0.0], [0.0, 0.0]]], &Device::Cpu).unwrap();

        let all_ignored = Tensor::new(&[[IGNORE_INDEX; 3]], &Device::Cpu).unwrap();
        let loss = masked_cross_entropy(&logits, &all_ignored).unwrap();
        assert_eq!(loss.to_scalar::<f32>().unwrap(), 0.0);

        // Only the confident, correct first position counts.
        let labels = Tensor::new(&[[1i64, IGNORE_INDEX, IGNORE_INDEX]], &Device::Cpu).unwrap();
        let loss = masked_cross_entropy(&logits, &labels).unwrap();
        assert!(loss.to_scalar::<f32>().unwrap() < 1e-3);

        // The uniform third position costs ln(2).
        let labels = Tensor::new(&[[IGNORE_INDEX, IGNORE_INDEX, 0i64]], &Device::Cpu).unwrap();
        let loss = masked_cross_entropy(&logits, &labels).unwrap();
        assert!((loss.to_scalar::<f32>().unwrap() - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_padding_mask_marks_padding() {
        let mask = padding_mask(&[1, 1, 0, 1, 0, 0], 2, 3, &Device::Cpu).unwrap();
        assert_eq!(mask.dims(), &[2, 1, 1, 3]);
        let flat = mask.flatten_all().unwrap().to_vec1::<u8>().unwrap();
        assert_eq!(flat, vec![0, 0, 1, 0, 1, 1]);
    }

    #[test]
    fn test_copy_into_varmap() {
        let (_model, varmap) = tiny_model(0.0);
        let mut tensors = HashMap::new();
        tensors.insert(
            "slot_classifier.bias".to_string(),
            Tensor::new(&[1f32, 2., 3., 4.], &Device::Cpu).unwrap(),
        );

        let report = copy_into_varmap(&varmap, &tensors).unwrap();
        assert_eq!(report.loaded, 1);
        assert!(report.initialised.iter().any(|n| n == "intent_classifier.weight"));
        assert!(report.missing.iter().all(|n| n.starts_with("distilbert.")));

        let vars = varmap.data().lock().unwrap();
        let bias = vars["slot_classifier.bias"].as_tensor().to_vec1::<f32>().unwrap();
        assert_eq!(bias, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_copy_accepts_bare_encoder_names() {
        let (_model, varmap) = tiny_model(0.0);
        let mut tensors = HashMap::new();
        tensors.insert(
            "embeddings.LayerNorm.bias".to_string(),
            Tensor::full(0.5f32, 8, &Device::Cpu).unwrap(),
        );

        let report = copy_into_varmap(&varmap, &tensors).unwrap();
        assert_eq!(report.loaded, 1);
        let vars = varmap.data().lock().unwrap();
        let bias = vars["distilbert.embeddings.LayerNorm.bias"]
            .as_tensor()
            .to_vec1::<f32>()
            .unwrap();
        assert_eq!(bias, vec![0.5; 8]);
    }

    #[test]
    fn test_copy_rejects_shape_mismatch() {
        let (_model, varmap) = tiny_model(0.0);
        let mut tensors = HashMap::new();
        tensors.insert(
            "slot_classifier.bias".to_string(),
            Tensor::new(&[1f32, 2.], &Device::Cpu).unwrap(),
        );
        assert!(copy_into_varmap(&varmap, &tensors).is_err());
    }
}
