//! Typed invocation surface with the host's bounded ranges.

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, Result};
use crate::image::ImageBatch;
use crate::{DEFAULT_PROMPT, DEFAULT_SYSTEM_PROMPT, FALLBACK_GGUF_VARIANTS};

/// Bounded ranges enforced on every call, matching what the host UI offers.
pub mod bounds {
    pub const MAX_TOKENS: (u32, u32) = (32, 2048);
    pub const TEMPERATURE: (f32, f32) = (0.0, 1.5);
    pub const TOP_P: (f32, f32) = (0.0, 1.0);
    pub const N_CTX: (u32, u32) = (1024, 16384);
    /// -1 offloads all layers to the GPU.
    pub const N_GPU_LAYERS: (i32, i32) = (-1, 128);
    /// 0 lets the engine pick its own default.
    pub const N_THREADS: (i32, i32) = (0, 64);
    pub const SEED_MAX: u32 = 2_147_483_647;
}

/// Keyword arguments of one `process` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessInputs {
    pub gguf_variant: String,
    pub prompt: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub n_ctx: u32,
    pub n_gpu_layers: i32,
    pub n_threads: i32,
    pub seed: u32,
    pub keep_model_loaded: bool,
    #[serde(skip)]
    pub image: Option<ImageBatch>,
}

impl Default for ProcessInputs {
    fn default() -> Self {
        Self {
            gguf_variant: FALLBACK_GGUF_VARIANTS[0].to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 512,
            temperature: 0.6,
            top_p: 0.9,
            n_ctx: 4096,
            n_gpu_layers: 0,
            n_threads: 0,
            seed: 1,
            keep_model_loaded: true,
            image: None,
        }
    }
}

impl ProcessInputs {
    /// Reject out-of-range values before any download or engine work.
    pub fn validate(&self) -> Result<()> {
        if self.gguf_variant.trim().is_empty() {
            return Err(NodeError::InvalidInput(
                "A GGUF variant must be selected".to_string(),
            ));
        }

        check_range("max_tokens", self.max_tokens, bounds::MAX_TOKENS)?;
        check_range_f32("temperature", self.temperature, bounds::TEMPERATURE)?;
        check_range_f32("top_p", self.top_p, bounds::TOP_P)?;
        check_range("n_ctx", self.n_ctx, bounds::N_CTX)?;
        check_range("n_gpu_layers", self.n_gpu_layers, bounds::N_GPU_LAYERS)?;
        check_range("n_threads", self.n_threads, bounds::N_THREADS)?;

        if self.seed > bounds::SEED_MAX {
            return Err(NodeError::InvalidInput(format!(
                "seed {} outside 0..={}",
                self.seed,
                bounds::SEED_MAX
            )));
        }

        Ok(())
    }
}

fn check_range<T: PartialOrd + std::fmt::Display + Copy>(
    name: &str,
    value: T,
    (min, max): (T, T),
) -> Result<()> {
    if value < min || value > max {
        return Err(NodeError::InvalidInput(format!(
            "{} {} outside {}..={}",
            name, value, min, max
        )));
    }
    Ok(())
}

fn check_range_f32(name: &str, value: f32, range: (f32, f32)) -> Result<()> {
    if !value.is_finite() {
        return Err(NodeError::InvalidInput(format!(
            "{} must be a finite number",
            name
        )));
    }
    check_range(name, value, range)
}
