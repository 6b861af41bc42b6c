//! GPT-2 forward pass with a per-call key/value cache.

use candle_core::{Device, IndexOp, Module, Result, Tensor, D};
use candle_nn::{embedding, layer_norm, Embedding, LayerNorm, Linear, VarBuilder};

use super::config::Gpt2Config;

/// Cached keys and values of one attention layer, `(batch, heads, seq, head_dim)`.
pub(crate) type LayerCache = Option<(Tensor, Tensor)>;

/// GPT-2 checkpoints store projections as Conv1D, i.e. a linear layer with
/// the weight laid out `(in, out)`.
fn conv1d(in_dim: usize, out_dim: usize, vb: VarBuilder) -> Result<Linear> {
    let weight = vb.get((in_dim, out_dim), "weight")?.t()?.contiguous()?;
    let bias = vb.get(out_dim, "bias")?;
    Ok(Linear::new(weight, Some(bias)))
}

struct Attention {
    c_attn: Linear,
    c_proj: Linear,
    n_head: usize,
    head_dim: usize,
}

impl Attention {
    fn load(config: &Gpt2Config, vb: VarBuilder) -> Result<Self> {
        let dim = config.n_embd;
        Ok(Self {
            c_attn: conv1d(dim, 3 * dim, vb.pp("c_attn"))?,
            c_proj: conv1d(dim, dim, vb.pp("c_proj"))?,
            n_head: config.n_head,
            head_dim: config.head_dim(),
        })
    }

    fn split_heads(&self, xs: Tensor, b: usize, t: usize) -> Result<Tensor> {
        xs.reshape((b, t, self.n_head, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, xs: &Tensor, mask: Option<&Tensor>, cache: &mut LayerCache) -> Result<Tensor> {
        let (b, t, dim) = xs.dims3()?;
        let qkv = self.c_attn.forward(xs)?;
        let q = self.split_heads(qkv.narrow(D::Minus1, 0, dim)?, b, t)?;
        let k = self.split_heads(qkv.narrow(D::Minus1, dim, dim)?, b, t)?;
        let v = self.split_heads(qkv.narrow(D::Minus1, 2 * dim, dim)?, b, t)?;

        let (k, v) = match cache.take() {
            Some((past_k, past_v)) => (
                Tensor::cat(&[&past_k, &k], 2)?,
                Tensor::cat(&[&past_v, &v], 2)?,
            ),
            None => (k, v),
        };
        *cache = Some((k.clone(), v.clone()));

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (q.matmul(&k.t()?)? * scale)?;
        let scores = match mask {
            Some(mask) => scores.broadcast_add(mask)?,
            None => scores,
        };
        let weights = candle_nn::ops::softmax_last_dim(&scores)?;
        let ys = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((b, t, dim))?;
        self.c_proj.forward(&ys)
    }
}

struct Mlp {
    c_fc: Linear,
    c_proj: Linear,
}

impl Mlp {
    fn load(config: &Gpt2Config, vb: VarBuilder) -> Result<Self> {
        let dim = config.n_embd;
        Ok(Self {
            c_fc: conv1d(dim, 4 * dim, vb.pp("c_fc"))?,
            c_proj: conv1d(4 * dim, dim, vb.pp("c_proj"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        // gelu_new, the tanh approximation
        self.c_proj.forward(&self.c_fc.forward(xs)?.gelu()?)
    }
}

struct Block {
    ln_1: LayerNorm,
    attn: Attention,
    ln_2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    fn load(config: &Gpt2Config, vb: VarBuilder) -> Result<Self> {
        let eps = config.layer_norm_epsilon;
        Ok(Self {
            ln_1: layer_norm(config.n_embd, eps, vb.pp("ln_1"))?,
            attn: Attention::load(config, vb.pp("attn"))?,
            ln_2: layer_norm(config.n_embd, eps, vb.pp("ln_2"))?,
            mlp: Mlp::load(config, vb.pp("mlp"))?,
        })
    }

    fn forward(&self, xs: &Tensor, mask: Option<&Tensor>, cache: &mut LayerCache) -> Result<Tensor> {
        let xs = (xs + self.attn.forward(&self.ln_1.forward(xs)?, mask, cache)?)?;
        &xs + self.mlp.forward(&self.ln_2.forward(&xs)?)?
    }
}

pub(crate) struct Gpt2 {
    wte: Embedding,
    wpe: Embedding,
    blocks: Vec<Block>,
    ln_f: LayerNorm,
    lm_head: Linear,
    config: Gpt2Config,
}

impl Gpt2 {
    pub(crate) fn load(config: &Gpt2Config, vb: VarBuilder) -> Result<Self> {
        // GPT2LMHeadModel checkpoints nest the body under `transformer.`,
        // bare GPT2Model ones do not.
        let vb = if vb.contains_tensor("transformer.wte.weight") {
            vb.pp("transformer")
        } else {
            vb
        };

        let wte = embedding(config.vocab_size, config.n_embd, vb.pp("wte"))?;
        let wpe = embedding(config.n_positions, config.n_embd, vb.pp("wpe"))?;
        let blocks = (0..config.n_layer)
            .map(|i| Block::load(config, vb.pp(format!("h.{i}"))))
            .collect::<Result<Vec<_>>>()?;
        let ln_f = layer_norm(config.n_embd, config.layer_norm_epsilon, vb.pp("ln_f"))?;
        // weights are tied
        let lm_head = Linear::new(wte.embeddings().clone(), None);

        Ok(Self {
            wte,
            wpe,
            blocks,
            ln_f,
            lm_head,
            config: config.clone(),
        })
    }

    pub(crate) fn config(&self) -> &Gpt2Config {
        &self.config
    }

    pub(crate) fn empty_cache(&self) -> Vec<LayerCache> {
        vec![None; self.blocks.len()]
    }

    /// Run `tokens` (shape `(1, t)`) sitting at positions `offset..offset + t`
    /// and return the logits of the last position, shape `(vocab_size,)`.
    pub(crate) fn forward(
        &self,
        tokens: &Tensor,
        offset: usize,
        cache: &mut [LayerCache],
    ) -> Result<Tensor> {
        let (_b, t) = tokens.dims2()?;
        let device = tokens.device();

        let positions =
            Tensor::arange(offset as u32, (offset + t) as u32, device)?.unsqueeze(0)?;
        let mut xs = (self.wte.forward(tokens)? + self.wpe.forward(&positions)?)?;

        let mask = if t > 1 {
            Some(causal_mask(t, offset, device)?)
        } else {
            None
        };
        for (block, layer_cache) in self.blocks.iter().zip(cache.iter_mut()) {
            xs = block.forward(&xs, mask.as_ref(), layer_cache)?;
        }

        let xs = self.ln_f.forward(&xs)?;
        let last = xs.i((.., t - 1, ..))?;
        self.lm_head.forward(&last)?.squeeze(0)
    }
}

/// Additive mask of shape `(t, offset + t)`: query `i` may attend to keys up
/// to and including absolute position `offset + i`.
fn causal_mask(t: usize, offset: usize, device: &Device) -> Result<Tensor> {
    let total = offset + t;
    let mask: Vec<f32> = (0..t)
        .flat_map(|i| {
            (0..total).map(move |j| {
                if j > offset + i {
                    f32::NEG_INFINITY
                } else {
                    0.0
                }
            })
        })
        .collect();
    Tensor::from_vec(mask, (t, total), device)
}
