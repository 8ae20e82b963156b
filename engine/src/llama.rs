//! Real engine implementation on top of the MMVQ llama.cpp library.

use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use libloading::Library;
use once_cell::sync::OnceCell;

use crate::chat::{ChatCompletion, ChatMessage, SamplingParams};
use crate::error::{EngineError, Result};
use crate::ffi::{VlmFunctions, VlmModel, VlmModelParams};
use crate::probe;
use crate::session::{ConstructArgs, EngineLoader, VlmEngine};

/// Chat template baked into the Qwen3-VL GGUF releases.
const QWEN_VL_CHAT_TEMPLATE: &str = "qwen2_vl";

static BACKEND_INIT: Once = Once::new();

/// Platform-specific name of the backend shared library.
pub fn default_library_name() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "llama.dll"
    }

    #[cfg(target_os = "linux")]
    {
        "libllama.so"
    }

    #[cfg(target_os = "macos")]
    {
        "libllama.dylib"
    }
}

/// A loaded Qwen3-VL model (weights + vision projector).
pub struct LlamaVlm {
    model_ptr: *mut VlmModel,
    functions: Arc<VlmFunctions>,
    _library: Arc<Library>,
    model_path: PathBuf,
}

impl LlamaVlm {
    /// Load the weights/projector pair into the backend.
    ///
    /// Construction failures carry the backend's own error text; callers
    /// decide whether the message indicates a missing multimodal build.
    pub fn load(library: Arc<Library>, args: &ConstructArgs) -> Result<Self> {
        if !args.model_path.exists() {
            return Err(EngineError::ModelNotFound(
                args.model_path.display().to_string(),
            ));
        }
        if !args.projector_path.exists() {
            return Err(EngineError::ModelNotFound(
                args.projector_path.display().to_string(),
            ));
        }

        let functions = Arc::new(VlmFunctions::load(&library)?);

        BACKEND_INIT.call_once(|| unsafe {
            (functions.vlm_backend_init)();
        });

        let model_cstr = path_cstring(&args.model_path)?;
        let projector_cstr = path_cstring(&args.projector_path)?;
        let template_cstr = CString::new(QWEN_VL_CHAT_TEMPLATE)
            .map_err(|e| EngineError::InvalidParameter(format!("Invalid chat template: {}", e)))?;

        let params = VlmModelParams {
            n_ctx: args.n_ctx,
            // None = engine default: all physical cores.
            n_threads: args.n_threads.unwrap_or_else(|| num_cpus::get() as c_int),
            n_gpu_layers: args.n_gpu_layers,
            seed: args.seed,
            logits_all: false,
        };

        let model_ptr = unsafe {
            (functions.vlm_model_load_mm)(
                model_cstr.as_ptr(),
                projector_cstr.as_ptr(),
                template_cstr.as_ptr(),
                params,
            )
        };

        if model_ptr.is_null() {
            return Err(EngineError::Construction(last_error_message(&functions)));
        }

        log::info!("Successfully loaded model: {}", args.model_path.display());

        Ok(Self {
            model_ptr,
            functions,
            _library: library,
            model_path: args.model_path.clone(),
        })
    }
}

impl VlmEngine for LlamaVlm {
    fn try_set_seed(&mut self, seed: u32) -> bool {
        unsafe {
            (self.functions.vlm_set_seed)(self.model_ptr, seed);
        }
        true
    }

    fn chat_completion(
        &mut self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String> {
        let payload = serde_json::to_string(messages)?;
        let payload_cstr = CString::new(payload)
            .map_err(|e| EngineError::InvalidParameter(format!("Invalid message payload: {}", e)))?;

        let raw = unsafe {
            (self.functions.vlm_chat_completion)(
                self.model_ptr,
                payload_cstr.as_ptr(),
                params.max_tokens as c_int,
                params.temperature,
                params.top_p,
            )
        };

        if raw.is_null() {
            return Err(EngineError::Inference(last_error_message(&self.functions)));
        }

        let response = unsafe { CStr::from_ptr(raw).to_string_lossy().into_owned() };
        unsafe {
            (self.functions.vlm_string_free)(raw);
        }

        let completion: ChatCompletion = serde_json::from_str(&response)?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| EngineError::Inference("completion contained no choices".to_string()))
    }
}

impl Drop for LlamaVlm {
    fn drop(&mut self) {
        if !self.model_ptr.is_null() {
            unsafe {
                (self.functions.vlm_model_free)(self.model_ptr);
            }
            log::info!("Freed model: {}", self.model_path.display());
        }
    }
}

// LlamaVlm is Send because the model handle may move between threads.
unsafe impl Send for LlamaVlm {}
// LlamaVlm is NOT Sync - completions mutate backend state.

/// Loads the shared library once and hands out engine instances.
pub struct LlamaEngineLoader {
    library_path: PathBuf,
    library: OnceCell<Arc<Library>>,
}

impl LlamaEngineLoader {
    pub fn new<P: AsRef<Path>>(library_path: P) -> Self {
        Self {
            library_path: library_path.as_ref().to_path_buf(),
            library: OnceCell::new(),
        }
    }

    /// Convenience constructor using the platform's default library name
    /// under `dir`.
    pub fn with_default_library<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(default_library_name()))
    }

    fn library(&self) -> Result<&Arc<Library>> {
        self.library.get_or_try_init(|| {
            let library = unsafe { Library::new(&self.library_path) }.map_err(|e| {
                EngineError::LibraryLoad(format!(
                    "Failed to load {}: {}",
                    self.library_path.display(),
                    e
                ))
            })?;
            Ok(Arc::new(library))
        })
    }
}

impl EngineLoader for LlamaEngineLoader {
    fn ensure_vision_support(&self) -> Result<()> {
        probe::ensure_vision_support(self.library()?)
    }

    fn construct(&self, args: &ConstructArgs) -> Result<Box<dyn VlmEngine>> {
        let library = Arc::clone(self.library()?);
        Ok(Box::new(LlamaVlm::load(library, args)?))
    }
}

fn path_cstring(path: &Path) -> Result<CString> {
    CString::new(path.to_string_lossy().as_bytes())
        .map_err(|e| EngineError::InvalidParameter(format!("Invalid path: {}", e)))
}

fn last_error_message(functions: &VlmFunctions) -> String {
    unsafe {
        let ptr = (functions.vlm_last_error)();
        if ptr.is_null() {
            "unknown backend error".to_string()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}
