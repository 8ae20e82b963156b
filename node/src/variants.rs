//! GGUF variant discovery with a hardcoded fallback.

use qwenvl_model_cache::{fetch_repo_files, list_gguf_variants};

use crate::{FALLBACK_GGUF_VARIANTS, GGUF_REPO_ID, VISION_PROJECTOR_FILENAME};

/// List the repo's selectable GGUF variants.
///
/// Hub failures (offline hosts, rate limits) and empty listings degrade to
/// the fallback list instead of erroring: variant discovery is a UI concern
/// and must never block the node from registering.
pub async fn discover_gguf_variants() -> Vec<String> {
    match fetch_repo_files(GGUF_REPO_ID).await {
        Ok(files) => {
            let variants = list_gguf_variants(&files, VISION_PROJECTOR_FILENAME);
            if variants.is_empty() {
                log::warn!(
                    "No GGUF variants listed for {}; using the fallback list",
                    GGUF_REPO_ID
                );
                fallback_variants()
            } else {
                variants
            }
        }
        Err(e) => {
            log::warn!("Failed to fetch variants list: {}; using the fallback list", e);
            fallback_variants()
        }
    }
}

pub fn fallback_variants() -> Vec<String> {
    FALLBACK_GGUF_VARIANTS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_list_is_usable() {
        let variants = fallback_variants();
        assert_eq!(variants.len(), FALLBACK_GGUF_VARIANTS.len());
        assert!(variants.iter().all(|v| v.ends_with(".gguf")));
        assert!(!variants.contains(&VISION_PROJECTOR_FILENAME.to_string()));
    }

    // Works online (live listing) and offline (fallback) alike.
    #[tokio::test]
    async fn test_discovery_always_yields_variants() {
        let variants = discover_gguf_variants().await;
        assert!(!variants.is_empty());
        assert!(variants.iter().all(|v| v.ends_with(".gguf")));
    }
}
