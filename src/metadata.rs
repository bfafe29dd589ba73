// Remote metadata model and the per-run metadata cache.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for a remote file or folder. Folders listed with `list=true`
/// carry their direct children in `contents`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Metadata {
    pub size: String,
    pub rev: String,
    pub bytes: u64,
    pub modified: String,
    pub path: String,
    pub is_dir: bool,
    pub root: String,
    pub revision: i64,
    pub hash: String,
    pub contents: Vec<Metadata>,
}

impl Metadata {
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    /// Last path component.
    pub fn base_name(&self) -> &str {
        base_name(&self.path)
    }

    /// Base names of the folder's children, in listing order.
    pub fn child_names(&self) -> Vec<&str> {
        self.contents.iter().map(Metadata::base_name).collect()
    }
}

pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Folder metadata fetched during this run, keyed by the path it was
/// requested with. The stored hash lets the server answer 304.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<String, Metadata>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&Metadata> {
        self.entries.get(path)
    }

    pub fn hash_for(&self, path: &str) -> Option<&str> {
        self.entries
            .get(path)
            .map(|m| m.hash.as_str())
            .filter(|h| !h.is_empty())
    }

    /// Only folders are kept; file metadata has no hash to revalidate.
    pub fn store(&mut self, path: &str, metadata: &Metadata) {
        if metadata.is_dir {
            self.entries.insert(path.to_string(), metadata.clone());
        }
    }
}
