//! Artifact acquisition for quantized Qwen3-VL models.
//!
//! This crate resolves a GGUF variant name to local file paths, downloading
//! the weights and the companion vision projector from HuggingFace on first
//! use. Files are kept as plain files under a deterministic directory; there
//! is no manifest, checksum, or eviction layer.

pub mod artifacts;
pub mod download;
pub mod error;
pub mod hub;

pub use artifacts::{ArtifactStore, LocalArtifacts};
pub use download::{ModelDownloader, ProgressCallback};
pub use error::{ModelCacheError, Result};
pub use hub::{fetch_repo_files, is_gguf_file, list_gguf_variants, HubFile};
