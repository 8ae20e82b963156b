//! The host-facing node: one `process` operation.

use std::path::Path;

use serde_json::{json, Value};

use qwenvl_engine::{
    EngineLoader, LlamaEngineLoader, LoadRequest, ModelResolver, SamplingParams, SessionManager,
};

use crate::error::Result;
use crate::inputs::{bounds, ProcessInputs};
use crate::messages::build_messages;
use crate::resolver::HubResolver;
use crate::{DEFAULT_PROMPT, DEFAULT_SYSTEM_PROMPT, FALLBACK_GGUF_VARIANTS};

/// Identifier the node registers under in the host graph.
pub const NODE_NAME: &str = "Qwen3_VL_GGUF";
/// Human-readable name shown in the host UI.
pub const NODE_DISPLAY_NAME: &str = "Qwen3-VL GGUF (2B Thinking)";

/// Vision-language node backed by a cached llama session.
///
/// The node may leave an engine resident between calls
/// (`keep_model_loaded`), so one instance lives per graph node and the host
/// invokes it sequentially.
pub struct QwenVlNode<L: EngineLoader, R: ModelResolver> {
    manager: SessionManager<L, R>,
}

impl QwenVlNode<LlamaEngineLoader, HubResolver> {
    /// Default wiring: artifacts under the host's `models_dir`, the llama
    /// shared library at `library_path`.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(models_dir: P, library_path: Q) -> Result<Self> {
        let resolver = HubResolver::for_models_dir(models_dir)?;
        let loader = LlamaEngineLoader::new(library_path);
        Ok(Self::with_parts(loader, resolver))
    }
}

impl<L: EngineLoader, R: ModelResolver> QwenVlNode<L, R> {
    pub fn with_parts(loader: L, resolver: R) -> Self {
        Self {
            manager: SessionManager::new(loader, resolver),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.manager.is_loaded()
    }

    /// Drop any resident engine.
    pub fn unload(&mut self) {
        self.manager.release();
    }

    /// Run one generation. Validates inputs and assembles the chat payload
    /// before any artifact or engine work, so empty input can never trigger
    /// a download.
    pub async fn process(&mut self, inputs: &ProcessInputs) -> Result<String> {
        inputs.validate()?;
        let messages = build_messages(&inputs.prompt, &inputs.system_prompt, inputs.image.as_ref())?;

        let request = LoadRequest {
            filename: inputs.gguf_variant.clone(),
            n_ctx: inputs.n_ctx,
            n_threads: inputs.n_threads,
            n_gpu_layers: inputs.n_gpu_layers,
            seed: inputs.seed,
        };
        self.manager.ensure_loaded(&request).await?;

        let sampling = SamplingParams {
            max_tokens: inputs.max_tokens,
            temperature: inputs.temperature,
            top_p: inputs.top_p,
        };
        let text = self.manager.generate(&messages, &sampling)?;

        if !inputs.keep_model_loaded {
            self.manager.release();
        }

        Ok(text)
    }

    /// Input descriptor for host registration: parameter types, bounded
    /// ranges, and defaults.
    pub fn input_spec(variants: &[String]) -> Value {
        let default_variant = variants
            .first()
            .cloned()
            .unwrap_or_else(|| FALLBACK_GGUF_VARIANTS[0].to_string());

        json!({
            "required": {
                "gguf_variant": [variants, {"default": default_variant}],
                "prompt": ["STRING", {"default": DEFAULT_PROMPT, "multiline": true}],
                "system_prompt": ["STRING", {"default": DEFAULT_SYSTEM_PROMPT, "multiline": true}],
                "max_tokens": ["INT", {"default": 512, "min": bounds::MAX_TOKENS.0, "max": bounds::MAX_TOKENS.1}],
                "temperature": ["FLOAT", {"default": 0.6, "min": bounds::TEMPERATURE.0, "max": bounds::TEMPERATURE.1}],
                "top_p": ["FLOAT", {"default": 0.9, "min": bounds::TOP_P.0, "max": bounds::TOP_P.1}],
                "n_ctx": ["INT", {"default": 4096, "min": bounds::N_CTX.0, "max": bounds::N_CTX.1}],
                "n_gpu_layers": ["INT", {"default": 0, "min": bounds::N_GPU_LAYERS.0, "max": bounds::N_GPU_LAYERS.1}],
                "n_threads": ["INT", {"default": 0, "min": bounds::N_THREADS.0, "max": bounds::N_THREADS.1}],
                "seed": ["INT", {"default": 1, "min": 0, "max": bounds::SEED_MAX}],
                "keep_model_loaded": ["BOOLEAN", {"default": true}],
            },
            "optional": {
                "image": ["IMAGE"],
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_spec_lists_every_parameter() {
        let variants = vec!["a.gguf".to_string(), "b.gguf".to_string()];
        let spec = QwenVlNode::<LlamaEngineLoader, HubResolver>::input_spec(&variants);

        let required = spec["required"].as_object().expect("required map");
        for key in [
            "gguf_variant",
            "prompt",
            "system_prompt",
            "max_tokens",
            "temperature",
            "top_p",
            "n_ctx",
            "n_gpu_layers",
            "n_threads",
            "seed",
            "keep_model_loaded",
        ] {
            assert!(required.contains_key(key), "missing required input {}", key);
        }
        assert_eq!(spec["required"]["gguf_variant"][1]["default"], "a.gguf");
        assert_eq!(spec["optional"]["image"][0], "IMAGE");
    }
}
