//! # DistilBERT Encoder
//!
//! Trainable DistilBERT built from primitive candle ops so gradients reach
//! every encoder weight. Parameter names follow the Hugging Face checkpoint
//! layout (`embeddings.*`, `transformer.layer.N.*`), so `model.safetensors`
//! loads unchanged under the `distilbert.` prefix.

use std::path::Path;

use anyhow::Context;
use candle_core::{DType, Module, Result, Tensor, D};
use candle_nn::{embedding, linear, Embedding, Init, Linear, VarBuilder};
use serde::Deserialize;

const LAYER_NORM_EPS: f64 = 1e-12;
/// Added to attention scores at padding positions.
const MASK_PENALTY: f64 = -1e4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Gelu,
    Relu,
}

impl Activation {
    fn apply(&self, xs: &Tensor) -> Result<Tensor> {
        match self {
            Activation::Gelu => xs.gelu_erf(),
            Activation::Relu => xs.relu(),
        }
    }
}

/// Fields of a DistilBERT `config.json` the encoder needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DistilBertConfig {
    pub vocab_size: usize,
    pub dim: usize,
    pub n_layers: usize,
    pub n_heads: usize,
    pub hidden_dim: usize,
    pub activation: Activation,
    pub max_position_embeddings: usize,
}

impl DistilBertConfig {
    /// Parse a DistilBERT `config.json`.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse DistilBERT config")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
        Self::from_json(&json)
    }
}

/// Layer norm over the last dimension.
struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
}

impl LayerNorm {
    fn new(dim: usize, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            weight: vb.get_with_hints(dim, "weight", Init::Const(1.0))?,
            bias: vb.get_with_hints(dim, "bias", Init::Const(0.0))?,
        })
    }
}

impl Module for LayerNorm {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mean = xs.mean_keepdim(D::Minus1)?;
        let centered = xs.broadcast_sub(&mean)?;
        let variance = centered.sqr()?.mean_keepdim(D::Minus1)?;
        let std = (variance + LAYER_NORM_EPS)?.sqrt()?;
        centered
            .broadcast_div(&std)?
            .broadcast_mul(&self.weight)?
            .broadcast_add(&self.bias)
    }
}

struct Embeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    layer_norm: LayerNorm,
}

impl Embeddings {
    fn new(config: &DistilBertConfig, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            word_embeddings: embedding(config.vocab_size, config.dim, vb.pp("word_embeddings"))?,
            position_embeddings: embedding(
                config.max_position_embeddings,
                config.dim,
                vb.pp("position_embeddings"),
            )?,
            layer_norm: LayerNorm::new(config.dim, vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, input_ids: &Tensor) -> Result<Tensor> {
        let (_, seq_len) = input_ids.dims2()?;
        let positions = Tensor::arange(0u32, seq_len as u32, input_ids.device())?;
        let words = self.word_embeddings.forward(input_ids)?;
        let positions = self.position_embeddings.forward(&positions)?;
        self.layer_norm.forward(&words.broadcast_add(&positions)?)
    }
}

struct SelfAttention {
    q_lin: Linear,
    k_lin: Linear,
    v_lin: Linear,
    out_lin: Linear,
    n_heads: usize,
    head_dim: usize,
}

impl SelfAttention {
    fn new(config: &DistilBertConfig, vb: VarBuilder) -> Result<Self> {
        let dim = config.dim;
        Ok(Self {
            q_lin: linear(dim, dim, vb.pp("q_lin"))?,
            k_lin: linear(dim, dim, vb.pp("k_lin"))?,
            v_lin: linear(dim, dim, vb.pp("v_lin"))?,
            out_lin: linear(dim, dim, vb.pp("out_lin"))?,
            n_heads: config.n_heads,
            head_dim: dim / config.n_heads,
        })
    }

    fn forward(&self, xs: &Tensor, mask_bias: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, dim) = xs.dims3()?;
        let heads = |t: Tensor| {
            t.reshape((batch, seq_len, self.n_heads, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()
        };

        let q = (heads(self.q_lin.forward(xs)?)? / (self.head_dim as f64).sqrt())?;
        let k = heads(self.k_lin.forward(xs)?)?;
        let v = heads(self.v_lin.forward(xs)?)?;

        let scores = q.matmul(&k.t()?.contiguous()?)?.broadcast_add(mask_bias)?;
        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;
        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq_len, dim))?;
        self.out_lin.forward(&context)
    }
}

struct TransformerBlock {
    attention: SelfAttention,
    sa_layer_norm: LayerNorm,
    lin1: Linear,
    lin2: Linear,
    activation: Activation,
    output_layer_norm: LayerNorm,
}

impl TransformerBlock {
    fn new(config: &DistilBertConfig, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            attention: SelfAttention::new(config, vb.pp("attention"))?,
            sa_layer_norm: LayerNorm::new(config.dim, vb.pp("sa_layer_norm"))?,
            lin1: linear(config.dim, config.hidden_dim, vb.pp("ffn").pp("lin1"))?,
            lin2: linear(config.hidden_dim, config.dim, vb.pp("ffn").pp("lin2"))?,
            activation: config.activation,
            output_layer_norm: LayerNorm::new(config.dim, vb.pp("output_layer_norm"))?,
        })
    }

    fn forward(&self, xs: &Tensor, mask_bias: &Tensor) -> Result<Tensor> {
        let attended = self.attention.forward(xs, mask_bias)?;
        let xs = self.sa_layer_norm.forward(&(attended + xs)?)?;
        let hidden = self.activation.apply(&self.lin1.forward(&xs)?)?;
        let ffn = self.lin2.forward(&hidden)?;
        self.output_layer_norm.forward(&(ffn + xs)?)
    }
}

/// Embeddings plus a stack of transformer blocks.
pub struct DistilBertEncoder {
    embeddings: Embeddings,
    layers: Vec<TransformerBlock>,
}

impl DistilBertEncoder {
    pub fn new(config: &DistilBertConfig, vb: VarBuilder) -> Result<Self> {
        if config.n_heads == 0 || config.dim % config.n_heads != 0 {
            candle_core::bail!(
                "dim {} is not divisible by n_heads {}",
                config.dim,
                config.n_heads
            );
        }
        let embeddings = Embeddings::new(config, vb.pp("embeddings"))?;
        let vb_layers = vb.pp("transformer").pp("layer");
        let layers = (0..config.n_layers)
            .map(|i| TransformerBlock::new(config, vb_layers.pp(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { embeddings, layers })
    }

    /// Hidden states `[batch, seq_len, dim]`.
    ///
    /// `padding_mask` is `[batch, 1, 1, seq_len]`, non-zero on padding.
    pub fn forward(&self, input_ids: &Tensor, padding_mask: &Tensor) -> Result<Tensor> {
        let mask_bias = (padding_mask.to_dtype(DType::F32)? * MASK_PENALTY)?;
        let mut xs = self.embeddings.forward(input_ids)?;
        for layer in &self.layers {
            xs = layer.forward(&xs, &mask_bias)?;
        }
        Ok(xs)
    }
}
