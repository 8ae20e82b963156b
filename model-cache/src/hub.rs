//! Hugging Face hub queries and repo/file validation.

use serde::Deserialize;

use crate::error::{ModelCacheError, Result};

/// HuggingFace API endpoint
const HF_API_BASE: &str = "https://huggingface.co/api";

/// File entry from a HuggingFace repo listing
#[derive(Debug, Clone, Deserialize)]
pub struct HubFile {
    /// Relative path in the repo (e.g., "Qwen3-VL-2B-Thinking-Q4_K_M.gguf")
    #[serde(rename = "rfilename")]
    pub path: String,
    /// File size in bytes, when the API reports it
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct HubRepo {
    #[serde(default)]
    siblings: Vec<HubFile>,
}

/// Resolve the HuggingFace auth token from the environment.
///
/// Checked in order: `HF_TOKEN`, then `HUGGINGFACE_TOKEN`. Empty values are
/// treated as unset.
pub fn hub_token() -> Option<String> {
    std::env::var("HF_TOKEN")
        .or_else(|_| std::env::var("HUGGINGFACE_TOKEN"))
        .ok()
        .filter(|token| !token.is_empty())
}

/// List all files in a HuggingFace repository.
///
/// # Errors
/// Returns `ModelCacheError::Download` when the API responds with a non-success
/// status, `ModelCacheError::Network` when the request itself fails.
pub async fn fetch_repo_files(repo_id: &str) -> Result<Vec<String>> {
    if !is_valid_repo_id(repo_id) {
        return Err(ModelCacheError::InvalidRepo(repo_id.to_string()));
    }

    let url = format!("{}/models/{}", HF_API_BASE, repo_id);
    log::info!("Fetching file list for repo: {}", repo_id);

    let client = reqwest::Client::new();
    let mut request = client.get(&url);
    if let Some(token) = hub_token() {
        log::debug!("Using HuggingFace token for authentication");
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(ModelCacheError::Download(format!(
            "HTTP {} while listing files for {}",
            response.status(),
            repo_id
        )));
    }

    let repo: HubRepo = response.json().await?;
    let files: Vec<String> = repo.siblings.into_iter().map(|f| f.path).collect();
    log::info!("Found {} files in {}", files.len(), repo_id);

    Ok(files)
}

/// Check whether a file is a GGUF weights file.
pub fn is_gguf_file(path: &str) -> bool {
    path.to_lowercase().ends_with(".gguf")
}

/// Filter a repo listing down to loadable GGUF weight variants.
///
/// Excludes the vision projector (it is a companion file, not a selectable
/// variant) and returns the names sorted ascending.
pub fn list_gguf_variants(files: &[String], projector: &str) -> Vec<String> {
    let mut variants: Vec<String> = files
        .iter()
        .filter(|f| is_gguf_file(f) && f.as_str() != projector)
        .cloned()
        .collect();
    variants.sort();
    variants
}

/// Validate repo_id format (owner/repo)
pub fn is_valid_repo_id(repo_id: &str) -> bool {
    let parts: Vec<&str> = repo_id.split('/').collect();

    // Must be exactly owner/repo
    if parts.len() != 2 {
        return false;
    }

    // No empty parts
    if parts[0].is_empty() || parts[1].is_empty() {
        return false;
    }

    // No path traversal
    if repo_id.contains("..") || repo_id.contains("//") {
        return false;
    }

    repo_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '/')
}

/// Validate a file path for safety (no path traversal)
pub fn is_safe_file_path(file_path: &str) -> bool {
    if file_path.is_empty() {
        return false;
    }

    if file_path.contains("..") || file_path.starts_with('/') || file_path.starts_with('\\') {
        return false;
    }

    if file_path.contains("//") || file_path.contains("\\\\") {
        return false;
    }

    !file_path.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_repo_id() {
        assert!(is_valid_repo_id("Qwen/Qwen3-VL-2B-Thinking-GGUF"));
        assert!(is_valid_repo_id("owner/repo.name"));
        assert!(!is_valid_repo_id("no-slash"));
        assert!(!is_valid_repo_id("a/b/c"));
        assert!(!is_valid_repo_id("/repo"));
        assert!(!is_valid_repo_id("owner/"));
        assert!(!is_valid_repo_id("owner/../repo"));
        assert!(!is_valid_repo_id("owner//repo"));
    }

    #[test]
    fn test_is_safe_file_path() {
        assert!(is_safe_file_path("model-Q4_K_M.gguf"));
        assert!(is_safe_file_path("subdir/model.gguf"));
        assert!(!is_safe_file_path(""));
        assert!(!is_safe_file_path("../model.gguf"));
        assert!(!is_safe_file_path("/etc/passwd"));
        assert!(!is_safe_file_path("a//b.gguf"));
        assert!(!is_safe_file_path("a\0b"));
    }

    #[test]
    fn test_is_gguf_file() {
        assert!(is_gguf_file("Qwen3-VL-2B-Thinking-Q4_K_M.gguf"));
        assert!(is_gguf_file("MODEL.GGUF"));
        assert!(!is_gguf_file("config.json"));
        assert!(!is_gguf_file("model.gguf.part"));
    }

    #[test]
    fn test_list_gguf_variants_filters_and_sorts() {
        let files = vec![
            "Qwen3-VL-2B-Thinking-Q8_0.gguf".to_string(),
            "mmproj-model-f16.gguf".to_string(),
            "README.md".to_string(),
            "Qwen3-VL-2B-Thinking-Q4_K_M.gguf".to_string(),
        ];
        let variants = list_gguf_variants(&files, "mmproj-model-f16.gguf");
        assert_eq!(
            variants,
            vec![
                "Qwen3-VL-2B-Thinking-Q4_K_M.gguf".to_string(),
                "Qwen3-VL-2B-Thinking-Q8_0.gguf".to_string(),
            ]
        );
    }

    #[tokio::test]
    #[ignore] // Needs network access
    async fn test_fetch_repo_files_live() {
        let files = fetch_repo_files("hf-internal-testing/tiny-random-gpt2")
            .await
            .expect("listing should succeed");
        assert!(files.iter().any(|f| f.contains("config.json")));
    }
}
