//! On-disk form of the graph cache: one versioned JSON document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{KgcrawlError, Result};
use crate::graph::KnowledgeGraph;

pub(crate) const DOCUMENT_VERSION: u32 = 1;

/// One cached resource: its unlimited graph and when it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub graph: Arc<KnowledgeGraph>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(graph: KnowledgeGraph) -> Self {
        Self {
            graph: Arc::new(graph),
            fetched_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        (Utc::now() - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_older_than(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    entries: BTreeMap<&'a str, &'a CacheEntry>,
}

#[derive(Deserialize)]
struct Document {
    version: u32,
    #[serde(default)]
    entries: HashMap<String, CacheEntry>,
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read the document at `path`. `Ok(None)` if the file does not exist.
pub(crate) fn read_document(path: &Path) -> Result<Option<HashMap<String, CacheEntry>>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let document: Document = serde_json::from_str(&content)?;
    if document.version != DOCUMENT_VERSION {
        return Err(KgcrawlError::Cache(format!(
            "Unsupported cache document version {} (expected {})",
            document.version, DOCUMENT_VERSION
        )));
    }

    Ok(Some(document.entries))
}

/// Replace the document at `path` with `entries`.
///
/// Written to a sibling temp file first and renamed over the target, so a
/// crash mid-write leaves the previous document intact.
pub(crate) fn write_document(path: &Path, entries: &HashMap<String, CacheEntry>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let document = DocumentRef {
        version: DOCUMENT_VERSION,
        entries: entries.iter().map(|(k, v)| (k.as_str(), v)).collect(),
    };
    let json = serde_json::to_string_pretty(&document)?;

    let tmp = temp_path(path);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
