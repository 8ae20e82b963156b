//! Streamed artifact downloads from HuggingFace.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::{ModelCacheError, Result};
use crate::hub;

const HUGGINGFACE_BASE: &str = "https://huggingface.co";

/// Progress callback for downloads: (bytes_downloaded, total_bytes).
///
/// `total_bytes` is 0 when the server did not report a Content-Length.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Downloader for HuggingFace model files
#[derive(Debug)]
pub struct ModelDownloader {
    client: Client,
}

impl ModelDownloader {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(concat!("qwenvl-model-cache/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Download a single repo file to `dest`, streaming to a `.part` file
    /// first and renaming on completion so interrupted downloads never leave
    /// a truncated artifact behind.
    ///
    /// # Errors
    /// `ModelCacheError::Download` on validation failure or a non-success
    /// HTTP status, `Network`/`Io` for transport and filesystem failures.
    pub async fn download_to_path(
        &self,
        repo_id: &str,
        file_path: &str,
        dest: &Path,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<()> {
        if !hub::is_valid_repo_id(repo_id) {
            return Err(ModelCacheError::InvalidRepo(repo_id.to_string()));
        }
        if !hub::is_safe_file_path(file_path) {
            return Err(ModelCacheError::InvalidArtifactName(file_path.to_string()));
        }

        let url = format!("{}/{}/resolve/main/{}", HUGGINGFACE_BASE, repo_id, file_path);
        log::info!("Downloading {} from {}", file_path, url);

        let mut request = self.client.get(&url);
        if let Some(token) = hub::hub_token() {
            log::debug!("Using HuggingFace token for authentication");
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ModelCacheError::Download(format!(
                "HTTP {} while downloading {}",
                response.status(),
                file_path
            )));
        }

        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part_path = partial_path(dest);
        let mut file = tokio::fs::File::create(&part_path).await?;

        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(ref callback) = progress_callback {
                callback(downloaded, total_size);
            }
        }

        file.flush().await?;
        drop(file);
        tokio::fs::rename(&part_path, dest).await?;

        log::info!("Downloaded {} ({} bytes)", file_path, downloaded);
        Ok(())
    }
}

impl Default for ModelDownloader {
    fn default() -> Self {
        Self::new()
    }
}

/// In-progress sibling of `dest`: `model.gguf` -> `model.gguf.part`.
fn partial_path(dest: &Path) -> std::path::PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    dest.with_file_name(format!("{}.part", name))
}
