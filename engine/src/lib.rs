//! Backend wrapper and session management for Qwen3-VL GGUF inference.
//!
//! This crate provides safe Rust wrappers around the MMVQ-enabled llama.cpp
//! shared library, a capability probe that fails fast (with remediation
//! instructions) on text-only builds, and the [`SessionManager`] that keeps
//! at most one engine resident and reuses it across calls with identical
//! structural parameters.

pub mod chat;
pub mod error;
pub mod ffi;
pub mod llama;
pub mod probe;
pub mod session;

pub use chat::{
    ChatCompletion, ChatMessage, CompletionChoice, CompletionMessage, ContentBlock, ImageUrl,
    Role, SamplingParams,
};
pub use error::{EngineError, Result};
pub use llama::{default_library_name, LlamaEngineLoader, LlamaVlm};
pub use probe::{ensure_vision_support, reset_vision_probe, MMVQ_INSTALL_HINT};
pub use session::{
    ConstructArgs, EngineLoader, LoadRequest, ModelResolver, ResolvedModel, SessionManager,
    SessionSignature, VlmEngine,
};
