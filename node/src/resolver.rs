//! Adapter from the artifact store to the engine's resolver seam.

use std::path::Path;

use async_trait::async_trait;
use qwenvl_engine::{EngineError, ModelResolver, ResolvedModel};
use qwenvl_model_cache::ArtifactStore;

use crate::{GGUF_REPO_ID, VISION_PROJECTOR_FILENAME};

/// Resolves variant filenames through the HuggingFace-backed artifact store.
pub struct HubResolver {
    store: ArtifactStore,
}

impl HubResolver {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Store rooted at the host's models directory, wired to this node's
    /// fixed repo and projector.
    pub fn for_models_dir<P: AsRef<Path>>(models_dir: P) -> qwenvl_model_cache::Result<Self> {
        let store = ArtifactStore::new(models_dir, GGUF_REPO_ID, VISION_PROJECTOR_FILENAME)?;
        Ok(Self::new(store))
    }
}

#[async_trait]
impl ModelResolver for HubResolver {
    async fn resolve(&self, filename: &str) -> qwenvl_engine::Result<ResolvedModel> {
        let artifacts = self
            .store
            .ensure_local(filename)
            .await
            .map_err(|e| EngineError::Artifact(e.to_string()))?;

        Ok(ResolvedModel {
            model_path: artifacts.model_path,
            projector_path: artifacts.projector_path,
        })
    }
}
