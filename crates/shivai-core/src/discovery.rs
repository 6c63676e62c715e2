//! Manifest discovery on the filesystem.
//!
//! A plugin source is a directory; every immediate subdirectory holding a
//! `manifest.json` or `manifest.toml` is a plugin candidate. A manifest file
//! directly inside the source is accepted too.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use shivai_protocols::{PluginError, PluginManifest};

/// Manifest file names recognized during discovery.
pub const MANIFEST_FILES: [&str; 2] = ["manifest.json", "manifest.toml"];

/// A manifest read from disk, parsed or not.
#[derive(Debug)]
pub struct ManifestCandidate {
    pub path: PathBuf,
    pub manifest: Result<PluginManifest, PluginError>,
}

/// Finds and parses plugin manifests.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    max_depth: usize,
}

impl ManifestLoader {
    pub fn new() -> Self {
        Self { max_depth: 2 }
    }

    /// Read every manifest under `dir`, sorted by path.
    ///
    /// A missing directory yields nothing. Unreadable or malformed files are
    /// returned as failed candidates so the caller can report them.
    pub async fn scan(&self, dir: &Path) -> Vec<ManifestCandidate> {
        if !dir.exists() {
            debug!("Plugin directory does not exist: {}", dir.display());
            return Vec::new();
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| MANIFEST_FILES.contains(&n))
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let mut candidates = Vec::with_capacity(paths.len());
        for path in paths {
            let manifest = Self::read(&path).await;
            candidates.push(ManifestCandidate { path, manifest });
        }

        debug!("Found {} manifests in {}", candidates.len(), dir.display());
        candidates
    }

    /// Parse one manifest file; the format follows the extension.
    pub async fn read(path: &Path) -> Result<PluginManifest, PluginError> {
        let origin = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PluginError::manifest_invalid(&origin, format!("unreadable: {}", e)))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => PluginManifest::from_toml(&content, &origin),
            _ => PluginManifest::from_json(&content, &origin),
        }
    }
}

impl Default for ManifestLoader {
    fn default() -> Self {
        Self::new()
    }
}
