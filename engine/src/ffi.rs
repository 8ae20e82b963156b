//! Low-level FFI bindings to the MMVQ-enabled llama.cpp C API.
//!
//! All function signatures match the C API of the multimodal build. Symbols
//! are resolved dynamically from the shared library; a plain (text-only)
//! build lacks the `vlm_model_load_mm` entry point, which is what the
//! capability probe keys on.

use std::os::raw::{c_char, c_float, c_int};

use libloading::Library;

use crate::error::{EngineError, Result};

/// Opaque pointer to a loaded multimodal model
#[repr(C)]
pub struct VlmModel {
    _private: [u8; 0],
}

/// Structural load parameters (matches vlm_model_params in C)
#[repr(C)]
#[derive(Debug, Clone)]
pub struct VlmModelParams {
    pub n_ctx: u32,
    pub n_threads: c_int,
    pub n_gpu_layers: c_int,
    pub seed: u32,
    pub logits_all: bool,
}

impl Default for VlmModelParams {
    fn default() -> Self {
        Self {
            n_ctx: 4096,
            n_threads: 4,
            n_gpu_layers: 0,
            seed: 0,
            logits_all: false,
        }
    }
}

/// FFI function table for the multimodal llama build.
///
/// Loaded dynamically so the node can report a missing or incompatible
/// library instead of failing at link time.
pub struct VlmFunctions {
    // Backend initialization
    pub vlm_backend_init: unsafe extern "C" fn(),
    pub vlm_backend_free: unsafe extern "C" fn(),

    // Model loading (MMVQ builds only)
    pub vlm_model_load_mm: unsafe extern "C" fn(
        model_path: *const c_char,
        mmproj_path: *const c_char,
        chat_template: *const c_char,
        params: VlmModelParams,
    ) -> *mut VlmModel,
    pub vlm_model_free: unsafe extern "C" fn(model: *mut VlmModel),

    // Per-call controls
    pub vlm_set_seed: unsafe extern "C" fn(model: *mut VlmModel, seed: u32),

    // Chat completion: takes the message list as JSON, returns a completion
    // JSON string owned by the library (release via vlm_string_free).
    pub vlm_chat_completion: unsafe extern "C" fn(
        model: *mut VlmModel,
        messages_json: *const c_char,
        max_tokens: c_int,
        temperature: c_float,
        top_p: c_float,
    ) -> *mut c_char,
    pub vlm_string_free: unsafe extern "C" fn(text: *mut c_char),

    // Last failure description, if any
    pub vlm_last_error: unsafe extern "C" fn() -> *const c_char,
}

impl VlmFunctions {
    /// Load all required function symbols from the library
    pub fn load(library: &Library) -> Result<Self> {
        unsafe {
            Ok(Self {
                vlm_backend_init: *library
                    .get(b"vlm_backend_init\0")
                    .map_err(|e| EngineError::LibraryLoad(format!("Missing vlm_backend_init: {}", e)))?,

                vlm_backend_free: *library
                    .get(b"vlm_backend_free\0")
                    .map_err(|e| EngineError::LibraryLoad(format!("Missing vlm_backend_free: {}", e)))?,

                vlm_model_load_mm: *library
                    .get(b"vlm_model_load_mm\0")
                    .map_err(|e| EngineError::LibraryLoad(format!("Missing vlm_model_load_mm: {}", e)))?,

                vlm_model_free: *library
                    .get(b"vlm_model_free\0")
                    .map_err(|e| EngineError::LibraryLoad(format!("Missing vlm_model_free: {}", e)))?,

                vlm_set_seed: *library
                    .get(b"vlm_set_seed\0")
                    .map_err(|e| EngineError::LibraryLoad(format!("Missing vlm_set_seed: {}", e)))?,

                vlm_chat_completion: *library
                    .get(b"vlm_chat_completion\0")
                    .map_err(|e| EngineError::LibraryLoad(format!("Missing vlm_chat_completion: {}", e)))?,

                vlm_string_free: *library
                    .get(b"vlm_string_free\0")
                    .map_err(|e| EngineError::LibraryLoad(format!("Missing vlm_string_free: {}", e)))?,

                vlm_last_error: *library
                    .get(b"vlm_last_error\0")
                    .map_err(|e| EngineError::LibraryLoad(format!("Missing vlm_last_error: {}", e)))?,
            })
        }
    }
}
