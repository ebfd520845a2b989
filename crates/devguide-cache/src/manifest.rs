//! On-disk cache bundle manifest

use devguide_types::{GuidelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Description of the bundle written by the rebuild job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub build_time: String,
    #[serde(default)]
    pub documents: BTreeMap<String, ManifestEntry>,
}

/// Files of one document; `sizes` lists only formats present on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub digest: String,
    pub sizes: BTreeMap<String, usize>,
}

impl Manifest {
    /// Read the manifest, `None` if the bundle does not exist or is unreadable
    pub async fn read(dir: &Path) -> Option<Self> {
        let path = dir.join(MANIFEST_FILE);
        let raw = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                debug!("Ignoring unreadable cache manifest {:?}: {}", path, e);
                None
            }
        }
    }

    /// Replace the manifest atomically (temp file, then rename)
    pub async fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));
        let json = serde_json::to_vec_pretty(self)?;

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| GuidelineError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| GuidelineError::io(&path, e))?;
        Ok(())
    }
}

/// Summary of the on-disk bundle
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub available: bool,
    pub message: Option<String>,
    pub version: Option<String>,
    pub build_time: Option<String>,
    pub formats: Vec<String>,
    pub sizes: BTreeMap<String, BTreeMap<String, usize>>,
}

impl CacheInfo {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            message: Some("No cache available".to_string()),
            version: None,
            build_time: None,
            formats: Vec::new(),
            sizes: BTreeMap::new(),
        }
    }

    pub fn from_manifest(manifest: Manifest) -> Self {
        let mut formats: Vec<String> = manifest
            .documents
            .values()
            .flat_map(|entry| entry.sizes.keys().cloned())
            .collect();
        formats.sort();
        formats.dedup();

        Self {
            available: true,
            message: None,
            version: Some(manifest.version),
            build_time: Some(manifest.build_time),
            formats,
            sizes: manifest
                .documents
                .into_iter()
                .map(|(name, entry)| (name, entry.sizes))
                .collect(),
        }
    }
}
