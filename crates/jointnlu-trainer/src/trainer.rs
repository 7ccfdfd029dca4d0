//! Training loop for the joint model.

use anyhow::Context;
use candle_core::{Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use jointnlu_core::{AtisDataset, Batch, BatchLoader};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::TrainConfig;
use crate::model::{padding_mask, JointModel};

/// Losses of one optimisation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepLoss {
    pub slot: f32,
    pub intent: f32,
}

impl StepLoss {
    pub fn total(&self) -> f32 {
        self.slot + self.intent
    }
}

/// Mean losses over one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub steps: usize,
    pub mean_slot_loss: f32,
    pub mean_intent_loss: f32,
}

/// Device tensors of one [`Batch`].
pub struct BatchTensors {
    pub input_ids: Tensor,
    pub padding_mask: Tensor,
    pub slot_labels: Tensor,
    pub intent_labels: Tensor,
}

impl BatchTensors {
    pub fn new(batch: &Batch, device: &Device) -> candle_core::Result<Self> {
        let shape = (batch.batch_size, batch.seq_len);
        Ok(Self {
            input_ids: Tensor::from_vec(batch.input_ids.clone(), shape, device)?,
            padding_mask: padding_mask(
                &batch.attention_mask,
                batch.batch_size,
                batch.seq_len,
                device,
            )?,
            slot_labels: Tensor::from_vec(batch.slot_labels.clone(), shape, device)?,
            intent_labels: Tensor::from_vec(
                batch.intent_labels.clone(),
                (batch.batch_size, batch.num_intents),
                device,
            )?,
        })
    }
}

pub struct Trainer {
    model: JointModel,
    // Owns the parameters the optimizer updates.
    varmap: VarMap,
    optimizer: AdamW,
    device: Device,
    epochs: usize,
    batch_size: usize,
    seed: u64,
    log_every: usize,
}

impl Trainer {
    pub fn new(
        model: JointModel,
        varmap: VarMap,
        device: Device,
        config: &TrainConfig,
    ) -> anyhow::Result<Self> {
        let params = ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: config.weight_decay,
            ..Default::default()
        };
        let optimizer =
            AdamW::new(varmap.all_vars(), params).context("Failed to create AdamW optimizer")?;

        Ok(Self {
            model,
            varmap,
            optimizer,
            device,
            epochs: config.epochs,
            batch_size: config.batch_size,
            seed: config.seed,
            log_every: config.log_every,
        })
    }

    /// One forward/backward pass and parameter update.
    ///
    /// Both losses are summed before the backward pass, so their gradients
    /// accumulate into one update.
    pub fn train_step(&mut self, batch: &Batch) -> anyhow::Result<StepLoss> {
        let tensors = BatchTensors::new(batch, &self.device)?;
        let output = self.model.forward(
            &tensors.input_ids,
            &tensors.padding_mask,
            Some(&tensors.intent_labels),
            Some(&tensors.slot_labels),
            true,
        )?;

        let total = (&output.slot_loss + &output.intent_loss)?;
        self.optimizer.backward_step(&total)?;

        Ok(StepLoss {
            slot: output.slot_loss.to_scalar::<f32>()?,
            intent: output.intent_loss.to_scalar::<f32>()?,
        })
    }

    /// Train for the configured number of epochs.
    ///
    /// The example order is reshuffled each epoch with `seed + epoch`.
    pub fn fit(&mut self, dataset: &AtisDataset, pad_id: u32) -> anyhow::Result<Vec<EpochStats>> {
        if dataset.is_empty() {
            anyhow::bail!("Training set is empty");
        }
        info!(
            "Training on {} examples for {} epochs (batch size {})",
            dataset.len(),
            self.epochs,
            self.batch_size
        );

        let mut history = Vec::with_capacity(self.epochs);
        for epoch in 0..self.epochs {
            let loader = BatchLoader::new(
                dataset,
                self.batch_size,
                pad_id,
                Some(self.seed.wrapping_add(epoch as u64)),
            )?;
            let num_batches = loader.num_batches();

            let mut slot_sum = 0f32;
            let mut intent_sum = 0f32;
            let mut steps = 0usize;

            for batch in loader {
                let loss = self.train_step(&batch?)?;
                slot_sum += loss.slot;
                intent_sum += loss.intent;
                steps += 1;

                if self.log_every > 0 && steps % self.log_every == 0 {
                    info!(
                        "Epoch {}/{}, Step {}/{}, slot loss {:.4}, intent loss {:.4}",
                        epoch + 1,
                        self.epochs,
                        steps,
                        num_batches,
                        slot_sum / steps as f32,
                        intent_sum / steps as f32
                    );
                } else {
                    debug!(step = steps, loss = loss.total(), "train step");
                }
            }

            let stats = EpochStats {
                epoch: epoch + 1,
                steps,
                mean_slot_loss: slot_sum / steps.max(1) as f32,
                mean_intent_loss: intent_sum / steps.max(1) as f32,
            };
            info!(
                "Epoch {}/{} complete - slot loss {:.4}, intent loss {:.4}",
                stats.epoch, self.epochs, stats.mean_slot_loss, stats.mean_intent_loss
            );
            history.push(stats);
        }

        Ok(history)
    }

    pub fn model(&self) -> &JointModel {
        &self.model
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Hand back the trained model for inference.
    pub fn into_model(self) -> JointModel {
        self.model
    }
}
