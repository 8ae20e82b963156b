//! Session management: a cache-of-one around the loaded backend.
//!
//! The manager owns at most one loaded engine. A request whose structural
//! parameters match the resident session reuses it (reseeding in place when
//! the engine supports it); any structural change tears the session down and
//! reconstructs it from freshly resolved artifacts.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::chat::{ChatMessage, SamplingParams};
use crate::error::{EngineError, Result};
use crate::probe::MMVQ_INSTALL_HINT;

/// A loaded multimodal engine instance.
pub trait VlmEngine: Send {
    /// Reseed the sampler in place. Returns `false` when the engine does not
    /// support reseeding; the requested seed then has no effect until the
    /// next structural reload.
    fn try_set_seed(&mut self, _seed: u32) -> bool {
        false
    }

    /// Run a chat completion and return the raw (untrimmed) text of the
    /// first choice.
    fn chat_completion(
        &mut self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String>;
}

/// Constructs engine instances from resolved artifacts.
pub trait EngineLoader: Send {
    /// Fail fast, before any construction, when the backend lacks the
    /// multimodal capability.
    fn ensure_vision_support(&self) -> Result<()>;

    fn construct(&self, args: &ConstructArgs) -> Result<Box<dyn VlmEngine>>;
}

/// Resolves a variant filename to local artifact paths, downloading when
/// absent.
#[async_trait]
pub trait ModelResolver: Send + Sync {
    async fn resolve(&self, filename: &str) -> Result<ResolvedModel>;
}

/// Local paths for a weights file and its companion vision projector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub model_path: PathBuf,
    pub projector_path: PathBuf,
}

/// Structural parameters handed to the engine loader.
///
/// `n_threads: None` means "engine default"; a requested thread count of 0
/// is normalized to `None` and never passed through literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructArgs {
    pub model_path: PathBuf,
    pub projector_path: PathBuf,
    pub n_ctx: u32,
    pub n_threads: Option<i32>,
    pub n_gpu_layers: i32,
    pub seed: u32,
}

/// Identity key for cache validity. Holds the raw requested values (a thread
/// count of 0 stays 0 here); seed and sampling parameters are excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSignature {
    pub filename: String,
    pub n_ctx: u32,
    pub n_threads: i32,
    pub n_gpu_layers: i32,
}

/// One load request from the host.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub filename: String,
    pub n_ctx: u32,
    pub n_threads: i32,
    pub n_gpu_layers: i32,
    pub seed: u32,
}

impl LoadRequest {
    pub fn signature(&self) -> SessionSignature {
        SessionSignature {
            filename: self.filename.clone(),
            n_ctx: self.n_ctx,
            n_threads: self.n_threads,
            n_gpu_layers: self.n_gpu_layers,
        }
    }
}

struct Session {
    engine: Box<dyn VlmEngine>,
    signature: SessionSignature,
}

/// Owns at most one live session and decides reuse vs. reconstruction.
pub struct SessionManager<L: EngineLoader, R: ModelResolver> {
    loader: L,
    resolver: R,
    session: Option<Session>,
}

impl<L: EngineLoader, R: ModelResolver> SessionManager<L, R> {
    pub fn new(loader: L, resolver: R) -> Self {
        Self {
            loader,
            resolver,
            session: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Make a session for `request` resident.
    ///
    /// On a signature match the existing engine is reseeded in place and no
    /// artifact resolution or construction happens. Otherwise the current
    /// session is released, artifacts are resolved (downloading if absent),
    /// the multimodal capability is validated, and a new engine is
    /// constructed.
    pub async fn ensure_loaded(&mut self, request: &LoadRequest) -> Result<()> {
        let signature = request.signature();

        if let Some(session) = self.session.as_mut() {
            if session.signature == signature {
                if !session.engine.try_set_seed(request.seed) {
                    log::debug!("Engine does not support reseeding; seed change has no effect");
                }
                return Ok(());
            }
        }

        self.release();

        let resolved = self.resolver.resolve(&request.filename).await?;
        self.loader.ensure_vision_support()?;

        let args = ConstructArgs {
            model_path: resolved.model_path,
            projector_path: resolved.projector_path,
            n_ctx: request.n_ctx,
            n_threads: if request.n_threads <= 0 {
                None
            } else {
                Some(request.n_threads)
            },
            n_gpu_layers: request.n_gpu_layers,
            seed: request.seed,
        };

        let engine = self
            .loader
            .construct(&args)
            .map_err(normalize_construction_error)?;

        log::info!(
            "Loaded {} (n_ctx={}, n_gpu_layers={})",
            signature.filename,
            signature.n_ctx,
            signature.n_gpu_layers
        );
        self.session = Some(Session { engine, signature });
        Ok(())
    }

    /// Drop the current session. No-op when nothing is loaded.
    pub fn release(&mut self) {
        if let Some(session) = self.session.take() {
            log::info!("Released session for {}", session.signature.filename);
        }
    }

    /// Run a chat completion against the resident session and return the
    /// trimmed text of the first choice.
    pub fn generate(
        &mut self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String> {
        let session = self.session.as_mut().ok_or(EngineError::ModelNotLoaded)?;
        let text = session.engine.chat_completion(messages, params)?;
        Ok(text.trim().to_string())
    }
}

/// Map construction failures that stem from a text-only backend build onto
/// the same actionable error the capability probe produces. Anything else
/// passes through untouched.
fn normalize_construction_error(err: EngineError) -> EngineError {
    match err {
        EngineError::Construction(message) => {
            let lower = message.to_lowercase();
            if lower.contains("mmvq") || lower.contains("vision") {
                EngineError::MissingVisionSupport(format!(
                    "The backend rejected the multimodal load ({}). {}",
                    message, MMVQ_INSTALL_HINT
                ))
            } else {
                EngineError::Construction(message)
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct LoaderState {
        constructions: AtomicUsize,
        probes: AtomicUsize,
        seeds: Mutex<Vec<u32>>,
        last_args: Mutex<Option<ConstructArgs>>,
    }

    struct MockEngine {
        state: Arc<LoaderState>,
        reseedable: bool,
        reply: String,
    }

    impl VlmEngine for MockEngine {
        fn try_set_seed(&mut self, seed: u32) -> bool {
            if self.reseedable {
                self.state.seeds.lock().unwrap().push(seed);
            }
            self.reseedable
        }

        fn chat_completion(
            &mut self,
            _messages: &[ChatMessage],
            _params: &SamplingParams,
        ) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    struct MockLoader {
        state: Arc<LoaderState>,
        vision_ok: bool,
        construct_error: Option<String>,
        reseedable: bool,
        reply: String,
    }

    impl MockLoader {
        fn new(state: Arc<LoaderState>) -> Self {
            Self {
                state,
                vision_ok: true,
                construct_error: None,
                reseedable: true,
                reply: "ok".to_string(),
            }
        }
    }

    impl EngineLoader for MockLoader {
        fn ensure_vision_support(&self) -> Result<()> {
            self.state.probes.fetch_add(1, Ordering::SeqCst);
            if self.vision_ok {
                Ok(())
            } else {
                Err(EngineError::MissingVisionSupport(
                    "no multimodal loader symbol".to_string(),
                ))
            }
        }

        fn construct(&self, args: &ConstructArgs) -> Result<Box<dyn VlmEngine>> {
            if let Some(message) = &self.construct_error {
                return Err(EngineError::Construction(message.clone()));
            }
            self.state.constructions.fetch_add(1, Ordering::SeqCst);
            *self.state.last_args.lock().unwrap() = Some(args.clone());
            self.state.seeds.lock().unwrap().push(args.seed);
            Ok(Box::new(MockEngine {
                state: Arc::clone(&self.state),
                reseedable: self.reseedable,
                reply: self.reply.clone(),
            }))
        }
    }

    struct MockResolver;

    #[async_trait]
    impl ModelResolver for MockResolver {
        async fn resolve(&self, filename: &str) -> Result<ResolvedModel> {
            Ok(ResolvedModel {
                model_path: PathBuf::from(format!("/models/{}", filename)),
                projector_path: PathBuf::from("/models/mmproj-model-f16.gguf"),
            })
        }
    }

    fn request(filename: &str, seed: u32) -> LoadRequest {
        LoadRequest {
            filename: filename.to_string(),
            n_ctx: 4096,
            n_threads: 0,
            n_gpu_layers: 0,
            seed,
        }
    }

    #[tokio::test]
    async fn same_signature_reseeds_without_reconstruction() {
        let state = Arc::new(LoaderState::default());
        let mut manager = SessionManager::new(MockLoader::new(Arc::clone(&state)), MockResolver);

        manager.ensure_loaded(&request("a.gguf", 1)).await.unwrap();
        manager.ensure_loaded(&request("a.gguf", 2)).await.unwrap();
        manager.ensure_loaded(&request("a.gguf", 3)).await.unwrap();

        assert_eq!(state.constructions.load(Ordering::SeqCst), 1);
        // First seed at construction, the rest via reseeding.
        assert_eq!(*state.seeds.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn structural_change_reconstructs_exactly_once() {
        let state = Arc::new(LoaderState::default());
        let mut manager = SessionManager::new(MockLoader::new(Arc::clone(&state)), MockResolver);

        manager.ensure_loaded(&request("a.gguf", 1)).await.unwrap();

        let mut changed = request("a.gguf", 1);
        changed.n_ctx = 8192;
        manager.ensure_loaded(&changed).await.unwrap();
        assert_eq!(state.constructions.load(Ordering::SeqCst), 2);

        manager.ensure_loaded(&request("b.gguf", 1)).await.unwrap();
        assert_eq!(state.constructions.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn seed_is_ignored_on_hit_when_engine_cannot_reseed() {
        let state = Arc::new(LoaderState::default());
        let mut loader = MockLoader::new(Arc::clone(&state));
        loader.reseedable = false;
        let mut manager = SessionManager::new(loader, MockResolver);

        manager.ensure_loaded(&request("a.gguf", 1)).await.unwrap();
        manager.ensure_loaded(&request("a.gguf", 9)).await.unwrap();

        // Still a cache hit; only the construction-time seed was applied.
        assert_eq!(state.constructions.load(Ordering::SeqCst), 1);
        assert_eq!(*state.seeds.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn release_without_session_is_a_noop() {
        let state = Arc::new(LoaderState::default());
        let mut manager = SessionManager::new(MockLoader::new(state), MockResolver);

        assert!(!manager.is_loaded());
        manager.release();
        manager.release();
        assert!(!manager.is_loaded());
    }

    #[tokio::test]
    async fn zero_thread_count_is_omitted_from_construct_args() {
        let state = Arc::new(LoaderState::default());
        let mut manager = SessionManager::new(MockLoader::new(Arc::clone(&state)), MockResolver);

        manager.ensure_loaded(&request("a.gguf", 1)).await.unwrap();
        let args = state.last_args.lock().unwrap().clone().unwrap();
        assert_eq!(args.n_threads, None);

        let mut explicit = request("a.gguf", 1);
        explicit.n_threads = 8;
        manager.ensure_loaded(&explicit).await.unwrap();
        let args = state.last_args.lock().unwrap().clone().unwrap();
        assert_eq!(args.n_threads, Some(8));
    }

    #[tokio::test]
    async fn missing_vision_support_blocks_construction() {
        let state = Arc::new(LoaderState::default());
        let mut loader = MockLoader::new(Arc::clone(&state));
        loader.vision_ok = false;
        let mut manager = SessionManager::new(loader, MockResolver);

        let err = manager.ensure_loaded(&request("a.gguf", 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingVisionSupport(_)));
        assert_eq!(state.constructions.load(Ordering::SeqCst), 0);
        assert!(!manager.is_loaded());
    }

    #[tokio::test]
    async fn vision_related_construction_failure_is_normalized() {
        let state = Arc::new(LoaderState::default());
        let mut loader = MockLoader::new(Arc::clone(&state));
        loader.construct_error = Some("model requires MMVQ vision kernels".to_string());
        let mut manager = SessionManager::new(loader, MockResolver);

        let err = manager.ensure_loaded(&request("a.gguf", 1)).await.unwrap_err();
        match err {
            EngineError::MissingVisionSupport(message) => {
                assert!(message.contains("Rebuild llama.cpp"));
            }
            other => panic!("expected MissingVisionSupport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unrelated_construction_failure_passes_through() {
        let state = Arc::new(LoaderState::default());
        let mut loader = MockLoader::new(Arc::clone(&state));
        loader.construct_error = Some("out of memory".to_string());
        let mut manager = SessionManager::new(loader, MockResolver);

        let err = manager.ensure_loaded(&request("a.gguf", 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Construction(_)));
    }

    #[tokio::test]
    async fn generate_requires_a_loaded_session() {
        let state = Arc::new(LoaderState::default());
        let mut manager = SessionManager::new(MockLoader::new(state), MockResolver);

        let err = manager
            .generate(&[ChatMessage::system("hi")], &SamplingParams::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::ModelNotLoaded));
    }

    #[tokio::test]
    async fn generate_trims_the_reply() {
        let state = Arc::new(LoaderState::default());
        let mut loader = MockLoader::new(Arc::clone(&state));
        loader.reply = "  a quiet scene \n".to_string();
        let mut manager = SessionManager::new(loader, MockResolver);

        manager.ensure_loaded(&request("a.gguf", 1)).await.unwrap();
        let text = manager
            .generate(&[ChatMessage::system("hi")], &SamplingParams::default())
            .unwrap();
        assert_eq!(text, "a quiet scene");
    }
}
