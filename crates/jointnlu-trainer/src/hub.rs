//! Pretrained model resolution and device selection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_core::Device;
use tracing::info;

/// Paths of the files a pretrained encoder needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub weights_path: PathBuf,
}

impl ModelFiles {
    /// Files laid out in a local directory.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let files = Self {
            config_path: dir.join("config.json"),
            tokenizer_path: dir.join("tokenizer.json"),
            weights_path: dir.join("model.safetensors"),
        };
        for path in [&files.config_path, &files.tokenizer_path, &files.weights_path] {
            if !path.exists() {
                anyhow::bail!("Model file not found: {}", path.display());
            }
        }
        Ok(files)
    }
}

/// Download (or reuse from the local cache) a model from the Hugging Face Hub.
pub fn download_model(repo_id: &str) -> Result<ModelFiles> {
    let api = hf_hub::api::sync::Api::new().context("Failed to initialize HuggingFace Hub API")?;
    let repo = api.model(repo_id.to_string());

    let config_path = repo
        .get("config.json")
        .context("Failed to download config.json")?;
    let tokenizer_path = repo
        .get("tokenizer.json")
        .context("Failed to download tokenizer.json")?;
    let weights_path = repo
        .get("model.safetensors")
        .context("Failed to download model.safetensors")?;

    Ok(ModelFiles {
        config_path,
        tokenizer_path,
        weights_path,
    })
}

/// Resolve model files from a local directory if given, else from the hub.
pub fn resolve_model(repo_id: &str, local_dir: Option<&Path>) -> Result<ModelFiles> {
    match local_dir {
        Some(dir) => {
            info!("Using local model files from {}", dir.display());
            ModelFiles::from_dir(dir)
        }
        None => {
            info!("Resolving {} from the model hub", repo_id);
            download_model(repo_id)
        }
    }
}

/// Pick the compute device once for the whole run.
pub fn select_device(prefer_gpu: bool) -> Result<Device> {
    if prefer_gpu {
        let device = Device::cuda_if_available(0).context("Failed to query CUDA device")?;
        if device.is_cuda() {
            info!("Running on CUDA device 0");
            return Ok(device);
        }
    }
    info!("Running on CPU");
    Ok(Device::Cpu)
}
