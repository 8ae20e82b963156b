//! Local artifact resolution: weights + vision projector as a pair.

use std::path::{Path, PathBuf};

use crate::download::{ModelDownloader, ProgressCallback};
use crate::error::{ModelCacheError, Result};
use crate::hub;

/// Resolved local paths for one model variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifacts {
    pub model_path: PathBuf,
    pub projector_path: PathBuf,
}

/// Download-if-absent store for a single repo's GGUF artifacts.
///
/// Every variant of the repo shares one fixed companion projector file; a
/// variant is only usable once both files are on disk.
#[derive(Debug)]
pub struct ArtifactStore {
    base_dir: PathBuf,
    repo_id: String,
    projector_filename: String,
    downloader: ModelDownloader,
}

impl ArtifactStore {
    /// Create a store rooted at `base_dir` for the given repo.
    ///
    /// # Errors
    /// `ModelCacheError::InvalidRepo` when `repo_id` is not `owner/repo`.
    pub fn new<P: AsRef<Path>>(
        base_dir: P,
        repo_id: &str,
        projector_filename: &str,
    ) -> Result<Self> {
        if !hub::is_valid_repo_id(repo_id) {
            return Err(ModelCacheError::InvalidRepo(repo_id.to_string()));
        }

        Ok(Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            repo_id: repo_id.to_string(),
            projector_filename: projector_filename.to_string(),
            downloader: ModelDownloader::new(),
        })
    }

    /// Deterministic local directory for this repo's files:
    /// `<base_dir>/<repo name>`.
    pub fn local_dir(&self) -> PathBuf {
        let repo_name = self.repo_id.rsplit('/').next().unwrap_or(&self.repo_id);
        self.base_dir.join(repo_name)
    }

    /// Ensure the named weights file and the companion projector exist
    /// locally, downloading whichever is absent. Present files are never
    /// re-downloaded.
    pub async fn ensure_local(&self, filename: &str) -> Result<LocalArtifacts> {
        self.ensure_local_with_progress(filename, None).await
    }

    /// Like [`ensure_local`](Self::ensure_local), reporting download progress
    /// through `progress_callback`.
    pub async fn ensure_local_with_progress(
        &self,
        filename: &str,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<LocalArtifacts> {
        if !hub::is_safe_file_path(filename) {
            return Err(ModelCacheError::InvalidArtifactName(filename.to_string()));
        }

        let local_dir = self.local_dir();
        tokio::fs::create_dir_all(&local_dir).await?;

        let model_path = local_dir.join(filename);
        let projector_path = local_dir.join(&self.projector_filename);

        if model_path.exists() {
            log::debug!("Weights already cached: {}", model_path.display());
        } else {
            self.downloader
                .download_to_path(&self.repo_id, filename, &model_path, progress_callback.clone())
                .await?;
        }

        if projector_path.exists() {
            log::debug!("Projector already cached: {}", projector_path.display());
        } else {
            self.downloader
                .download_to_path(
                    &self.repo_id,
                    &self.projector_filename,
                    &projector_path,
                    progress_callback,
                )
                .await?;
        }

        if !model_path.exists() {
            return Err(ModelCacheError::MissingArtifact(filename.to_string()));
        }
        if !projector_path.exists() {
            return Err(ModelCacheError::MissingArtifact(
                self.projector_filename.clone(),
            ));
        }

        Ok(LocalArtifacts {
            model_path,
            projector_path,
        })
    }
}
