//! On-disk index cache keyed by project root and a content fingerprint.
//!
//! One JSON file per project root. The fingerprint hashes the sorted list of
//! source files with their sizes and modification times, so any added,
//! removed or touched file invalidates the entry.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IndexError, IndexResult, ParseFailure};
use crate::index::file_walker::SourceWalker;
use crate::index::project::ProjectIndex;

const CACHE_FORMAT: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    format: u32,
    root: PathBuf,
    fingerprint: String,
    skipped: Vec<ParseFailure>,
    index: ProjectIndex,
}

/// A directory holding cached indexes.
#[derive(Debug, Clone)]
pub struct IndexCache {
    dir: PathBuf,
}

impl IndexCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hash of the current source file set under `root`.
    pub fn fingerprint(root: &Path, extensions: &[String]) -> IndexResult<String> {
        let mut hasher = blake3::Hasher::new();
        for ext in extensions {
            hasher.update(ext.as_bytes());
            hasher.update(b"\0");
        }

        for path in SourceWalker::new(root, extensions).source_files() {
            let meta = std::fs::metadata(&path)?;
            let modified = meta
                .modified()?
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            let relative = path.strip_prefix(root).unwrap_or(&path);

            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update(&meta.len().to_le_bytes());
            hasher.update(&modified.to_le_bytes());
        }

        Ok(hasher.finalize().to_hex().to_string())
    }

    fn entry_path(&self, root: &Path) -> PathBuf {
        let key = blake3::hash(root.to_string_lossy().as_bytes());
        self.dir.join(format!("{}.json", &key.to_hex()[..32]))
    }

    /// Cached index for `root` if its fingerprint still matches.
    ///
    /// Missing, corrupt and stale entries all read as a miss.
    pub fn load(&self, root: &Path, fingerprint: &str) -> Option<(ProjectIndex, Vec<ParseFailure>)> {
        let path = self.entry_path(root);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(cache = %path.display(), "No cached index");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(cache = %path.display(), error = %e, "Ignoring corrupt index cache");
                return None;
            }
        };

        if entry.format != CACHE_FORMAT || entry.root != root || entry.fingerprint != fingerprint {
            warn!(cache = %path.display(), "Ignoring stale index cache");
            return None;
        }

        let mut index = entry.index;
        index.rebuild_lookup();
        Some((index, entry.skipped))
    }

    /// Write `index` for `root`. The file is replaced atomically.
    pub fn store(
        &self,
        root: &Path,
        fingerprint: &str,
        index: &ProjectIndex,
        skipped: &[ParseFailure],
    ) -> IndexResult<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| IndexError::cache(&self.dir, e.to_string()))?;

        let entry = CacheEntry {
            format: CACHE_FORMAT,
            root: root.to_path_buf(),
            fingerprint: fingerprint.to_string(),
            skipped: skipped.to_vec(),
            index: index.clone(),
        };
        let bytes = serde_json::to_vec(&entry).map_err(|e| IndexError::cache(&self.dir, e.to_string()))?;

        let path = self.entry_path(root);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| IndexError::cache(&tmp, e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| IndexError::cache(&path, e.to_string()))?;

        debug!(cache = %path.display(), "Stored index cache");
        Ok(path)
    }
}
