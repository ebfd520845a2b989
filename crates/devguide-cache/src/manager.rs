//! Cache manager
//!
//! Lookup order for `get`: in-memory entry, on-disk bundle, fresh encoding.
//! An entry is only served if it was built from the current document text
//! (same digest). Concurrent misses may encode the same document twice;
//! encoding is deterministic, so the last write wins harmlessly.

use crate::codec::{self, Encoded};
use crate::manifest::{CacheInfo, Manifest, ManifestEntry};
use devguide_docs::DocumentLibrary;
use devguide_types::{CacheFormat, Document, DocumentName, GuidelineError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

type EntryKey = (DocumentName, CacheFormat);

pub struct CacheManager {
    library: Arc<DocumentLibrary>,
    version: String,
    /// Directory of the on-disk bundle, if any
    dir: Option<PathBuf>,
    entries: RwLock<HashMap<EntryKey, Encoded>>,
    /// Serializes manifest read-modify-write within this process
    manifest_lock: Mutex<()>,
}

impl CacheManager {
    pub fn new(library: Arc<DocumentLibrary>, version: impl Into<String>) -> Self {
        Self {
            library,
            version: version.into(),
            dir: None,
            entries: RwLock::new(HashMap::new()),
            manifest_lock: Mutex::new(()),
        }
    }

    /// Use an on-disk bundle directory
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Get a document in the requested format
    pub async fn get(&self, name: DocumentName, format: CacheFormat) -> Result<Encoded> {
        let document = self.library.get(name)?;

        if let Some(hit) = self.entries.read().await.get(&(name, format)) {
            if hit.digest == document.digest {
                return Ok(hit.clone());
            }
            debug!("Stale {} entry for {}, regenerating", format, name);
        }

        let encoded = match self.read_disk(&document, format).await {
            Some(encoded) => encoded,
            None => codec::encode(&document, format, &self.version),
        };

        self.entries
            .write()
            .await
            .insert((name, format), encoded.clone());
        Ok(encoded)
    }

    /// Get by short name (`rules`, `skills`, `steering`)
    pub async fn lookup(&self, name: &str, format: CacheFormat) -> Result<Encoded> {
        self.get(name.parse()?, format).await
    }

    /// Fetch and decode back to text
    pub async fn text(&self, name: DocumentName, format: CacheFormat) -> Result<String> {
        let encoded = self.get(name, format).await?;
        codec::decode(&encoded)
    }

    /// The smallest available encoding of a document
    pub async fn smallest(&self, name: DocumentName) -> Result<Encoded> {
        let mut best: Option<Encoded> = None;
        for format in CacheFormat::ALL {
            let encoded = self.get(name, format).await?;
            if best.as_ref().map_or(true, |b| encoded.len() < b.len()) {
                best = Some(encoded);
            }
        }
        best.ok_or_else(|| GuidelineError::NotFound(name.to_string()))
    }

    /// Recompute every encoding of a document and refresh the on-disk bundle.
    ///
    /// Meant for the scheduled rebuild job, not for request handling.
    pub async fn rebuild(&self, name: DocumentName) -> Result<ManifestEntry> {
        let document = self.library.get(name)?;
        let encodings: Vec<Encoded> = CacheFormat::ALL
            .iter()
            .map(|format| codec::encode(&document, *format, &self.version))
            .collect();

        {
            let mut entries = self.entries.write().await;
            for (format, encoded) in CacheFormat::ALL.iter().zip(&encodings) {
                entries.insert((name, *format), encoded.clone());
            }
        }

        let mut entry = ManifestEntry {
            digest: document.digest.clone(),
            sizes: Default::default(),
        };
        for (format, encoded) in CacheFormat::ALL.iter().zip(&encodings) {
            // a fallback to plain is not written under a compressed name
            if encoded.format == *format {
                entry.sizes.insert(format.to_string(), encoded.len());
            }
        }

        if let Some(dir) = &self.dir {
            self.write_bundle(dir, &document, &encodings, &entry).await?;
        }

        info!(
            "Rebuilt cache for '{}': {}",
            name,
            entry
                .sizes
                .iter()
                .map(|(f, s)| format!("{f}={s}B"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(entry)
    }

    /// Rebuild every loaded document
    pub async fn rebuild_all(&self) -> Result<CacheInfo> {
        for document in self.library.documents() {
            self.rebuild(document.name).await?;
        }
        Ok(self.cache_info().await)
    }

    /// Describe the on-disk bundle
    pub async fn cache_info(&self) -> CacheInfo {
        let Some(dir) = &self.dir else {
            return CacheInfo::unavailable();
        };
        match Manifest::read(dir).await {
            Some(manifest) => CacheInfo::from_manifest(manifest),
            None => CacheInfo::unavailable(),
        }
    }

    async fn write_bundle(
        &self,
        dir: &Path,
        document: &Document,
        encodings: &[Encoded],
        entry: &ManifestEntry,
    ) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| GuidelineError::io(dir, e))?;

        for (format, encoded) in CacheFormat::ALL.iter().zip(encodings) {
            if encoded.format != *format {
                continue;
            }
            let path = bundle_path(dir, document.name, *format);
            tokio::fs::write(&path, &encoded.bytes[..])
                .await
                .map_err(|e| GuidelineError::io(&path, e))?;
        }

        let _guard = self.manifest_lock.lock().await;
        let mut manifest = Manifest::read(dir).await.unwrap_or_default();
        manifest.version = self.version.clone();
        manifest.build_time = chrono::Utc::now().to_rfc3339();
        manifest
            .documents
            .insert(document.name.to_string(), entry.clone());
        manifest.write(dir).await
    }

    /// Load an encoding from the bundle if it matches the current text
    async fn read_disk(&self, document: &Document, format: CacheFormat) -> Option<Encoded> {
        let dir = self.dir.as_ref()?;
        let manifest = Manifest::read(dir).await?;
        let entry = manifest.documents.get(document.name.as_str())?;
        if entry.digest != document.digest || !entry.sizes.contains_key(format.as_str()) {
            return None;
        }

        let path = bundle_path(dir, document.name, format);
        let bytes = tokio::fs::read(&path).await.ok()?;
        let encoded = Encoded {
            format,
            bytes: Arc::from(bytes),
            digest: document.digest.clone(),
        };

        match codec::decode(&encoded) {
            Ok(text) if text == document.content => Some(encoded),
            Ok(_) => {
                warn!("Cached {:?} does not match its document, ignoring", path);
                None
            }
            Err(e) => {
                warn!("Cached {:?} is unreadable, ignoring: {}", path, e);
                None
            }
        }
    }
}

fn bundle_path(dir: &Path, name: DocumentName, format: CacheFormat) -> PathBuf {
    dir.join(format!("{}.{}", name, format.extension()))
}
