//! Document loading
//!
//! Each document is read once at startup and kept as an immutable
//! [`Document`]. Titles come from YAML front matter, then the first
//! level-1 heading, then a per-document default.

use devguide_types::{Document, DocumentName, GuidelineError, Result};
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// File locations of the three documents
#[derive(Debug, Clone)]
pub struct DocumentSources {
    pub rules: PathBuf,
    pub skills: PathBuf,
    pub steering: PathBuf,
}

impl DocumentSources {
    pub fn path(&self, name: DocumentName) -> &Path {
        match name {
            DocumentName::Rules => &self.rules,
            DocumentName::Skills => &self.skills,
            DocumentName::Steering => &self.steering,
        }
    }
}

impl Default for DocumentSources {
    fn default() -> Self {
        Self {
            rules: PathBuf::from("docs/rules.md"),
            skills: PathBuf::from("docs/skills.md"),
            steering: PathBuf::from("docs/steering.md"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FrontMatter {
    title: Option<String>,
}

/// Reads named documents from the content store
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    sources: DocumentSources,
}

impl DocumentLoader {
    pub fn new(sources: DocumentSources) -> Self {
        Self { sources }
    }

    /// Load a document by its short name (`rules`, `skills`, `steering`)
    pub async fn load(&self, name: &str) -> Result<Document> {
        let name: DocumentName = name.parse()?;
        self.load_named(name).await
    }

    pub async fn load_named(&self, name: DocumentName) -> Result<Document> {
        let path = self.sources.path(name);
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GuidelineError::io(path, e))?;

        debug!("Loaded {} from {:?} ({} bytes)", name, path, content.len());
        Ok(build_document(name, content))
    }
}

/// Build a [`Document`] from raw text. The text is kept byte-for-byte.
pub fn build_document(name: DocumentName, content: String) -> Document {
    let title = extract_title(&content).unwrap_or_else(|| name.default_title().to_string());
    let char_count = content.chars().count();
    let digest = content_digest(&content);

    Document {
        name,
        title,
        content,
        char_count,
        digest,
    }
}

/// Hex SHA-256 of a text
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn extract_title(content: &str) -> Option<String> {
    front_matter_title(content).or_else(|| {
        content
            .lines()
            .find_map(|line| line.strip_prefix("# "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn front_matter_title(content: &str) -> Option<String> {
    let re = Regex::new(r"^---\s*\n([\s\S]*?)\n---\s*(\n|$)").ok()?;
    let yaml = re.captures(content)?.get(1)?.as_str();

    match serde_yaml::from_str::<FrontMatter>(yaml) {
        Ok(front) => front.title.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            debug!("Ignoring unparsable front matter: {}", e);
            None
        }
    }
}

/// The loaded document set, shared by every request handler
#[derive(Debug, Clone)]
pub struct DocumentLibrary {
    documents: HashMap<DocumentName, Arc<Document>>,
}

impl DocumentLibrary {
    /// Load every document once
    pub async fn load_all(loader: &DocumentLoader) -> Result<Self> {
        let mut documents = HashMap::new();
        for name in DocumentName::ALL {
            let document = loader.load_named(name).await?;
            info!(
                "Loaded document '{}' ({} chars): {}",
                name, document.char_count, document.title
            );
            documents.insert(name, Arc::new(document));
        }
        Ok(Self { documents })
    }

    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            documents: documents
                .into_iter()
                .map(|d| (d.name, Arc::new(d)))
                .collect(),
        }
    }

    pub fn get(&self, name: DocumentName) -> Result<Arc<Document>> {
        self.documents
            .get(&name)
            .cloned()
            .ok_or_else(|| GuidelineError::NotFound(name.to_string()))
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<Document>> {
        self.get(name.parse()?)
    }

    /// Documents in serving order (rules, skills, steering)
    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        DocumentName::ALL
            .iter()
            .filter_map(|name| self.documents.get(name))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
