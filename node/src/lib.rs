//! Qwen3-VL GGUF node for node-graph workflow hosts.
//!
//! Exposes a single `process` operation: pick a quantized variant, hand over
//! a prompt and an optional image batch, get generated text back. Artifacts
//! download lazily on first use and the loaded engine stays resident between
//! calls with identical structural parameters.

pub mod error;
pub mod image;
pub mod inputs;
pub mod messages;
pub mod node;
pub mod resolver;
pub mod variants;

pub use error::{NodeError, Result};
pub use image::ImageBatch;
pub use inputs::ProcessInputs;
pub use messages::build_messages;
pub use node::{QwenVlNode, NODE_DISPLAY_NAME, NODE_NAME};
pub use resolver::HubResolver;
pub use variants::{discover_gguf_variants, fallback_variants};

/// Source repository for all artifact downloads.
pub const GGUF_REPO_ID: &str = "Qwen/Qwen3-VL-2B-Thinking-GGUF";

/// Companion projector shared by every variant of the repo.
pub const VISION_PROJECTOR_FILENAME: &str = "mmproj-model-f16.gguf";

pub const DEFAULT_PROMPT: &str = "Describe the visual content in detail.";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Qwen3-VL-2B-Thinking, a helpful multimodal \
     assistant that reasons carefully about every detail.";

/// Known-good variants used when the hub listing is unavailable.
pub const FALLBACK_GGUF_VARIANTS: [&str; 5] = [
    "Qwen3-VL-2B-Thinking-Q4_K_M.gguf",
    "Qwen3-VL-2B-Thinking-Q5_K_M.gguf",
    "Qwen3-VL-2B-Thinking-Q6_K.gguf",
    "Qwen3-VL-2B-Thinking-Q8_0.gguf",
    "Qwen3-VL-2B-Thinking-F16.gguf",
];
