//! Content-addressed cache for handler results.
//!
//! Entries are keyed by a SHA-256 fingerprint over the block type, a version
//! tag, the header's declaration (data, processors, attributes) and the body
//! text, and stored as one
//! `<hex-digest>.cache` JSON file per fingerprint. Because a value is a pure
//! function of its fingerprint, concurrent writers racing on the same entry
//! are harmless, and distinct fingerprints never contend.
//!
//! Reads of corrupted or unreadable entries are misses, never errors; the
//! handler simply runs again and overwrites the entry. Writes evict entries
//! older than the TTL first.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::errors::PolyblocksError;
use crate::model::Content;
use crate::syntax::header::Header;

/// Entries written by an incompatible tool version never match.
pub const VERSION_TAG: &str = env!("CARGO_PKG_VERSION");

/// Entries untouched for longer than this are purged before each write.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Computes the cache fingerprint for a block occurrence: the block type,
/// the header's declaration (data, processors, attributes) and the body
/// text. Attribute order is canonicalized so insertion order does not split
/// the key space; processor order is significant and hashed as-is.
pub fn fingerprint(type_id: &str, header: &Header, body: &str) -> String {
    let mut attrs: Vec<_> = header.attributes.to_vec();
    attrs.sort();
    let mut hasher = Sha256::new();
    hasher.update(VERSION_TAG.as_bytes());
    hasher.update([0]);
    hasher.update(type_id.as_bytes());
    hasher.update([0]);
    hasher.update(header.data.as_bytes());
    hasher.update([0]);
    for p in &header.processors {
        hasher.update(p.as_bytes());
        hasher.update([1]);
    }
    hasher.update([0]);
    for (k, v) in &attrs {
        hasher.update(k.as_bytes());
        hasher.update([1]);
        hasher.update(v.as_bytes());
        hasher.update([0]);
    }
    hasher.update([0]);
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A filesystem-backed, self-cleaning cache of [`Content`] snapshots.
#[derive(Debug)]
pub struct ContentCache {
    root: PathBuf,
    ttl: Duration,
}

impl ContentCache {
    /// Opens (and creates, if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PolyblocksError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| PolyblocksError::CacheIo {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self {
            root,
            ttl: DEFAULT_TTL,
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn has(&self, fingerprint: &str) -> bool {
        self.entry_path(fingerprint).exists()
    }

    /// Returns the cached content, or `None` on a miss. A corrupted or
    /// unreadable entry is a miss.
    pub fn get(&self, fingerprint: &str) -> Option<Content> {
        let text = fs::read_to_string(self.entry_path(fingerprint)).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Stores a content snapshot, evicting expired entries first.
    pub fn set(&self, fingerprint: &str, content: &Content) -> Result<(), PolyblocksError> {
        let _ = self.clean();
        let path = self.entry_path(fingerprint);
        let snapshot =
            serde_json::to_string(content).map_err(|source| PolyblocksError::OutputEncoding {
                source,
            })?;
        fs::write(&path, snapshot).map_err(|source| PolyblocksError::CacheIo {
            path: path.display().to_string(),
            source,
        })
    }

    /// Removes entries older than the TTL. Returns the number removed.
    pub fn clean(&self) -> Result<usize, PolyblocksError> {
        self.evict(|modified| modified.elapsed().map_or(false, |age| age > self.ttl))
    }

    /// Removes all entries regardless of age. Returns the number removed.
    pub fn wipe(&self) -> Result<usize, PolyblocksError> {
        self.evict(|_| true)
    }

    fn evict(
        &self,
        expired: impl Fn(std::time::SystemTime) -> bool,
    ) -> Result<usize, PolyblocksError> {
        let entries = fs::read_dir(&self.root).map_err(|source| PolyblocksError::CacheIo {
            path: self.root.display().to_string(),
            source,
        })?;
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |e| e != "cache") {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if expired(modified) && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.root.join(format!("{fingerprint}.cache"))
    }
}
