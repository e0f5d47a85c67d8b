//! Shared, swappable index state.
//!
//! Readers take an `Arc<ProjectIndex>` snapshot and keep using it for as long
//! as they like; rebuilds happen off to the side and replace the current
//! snapshot only when they succeed. Writers (`init`, `reindex`, `update`) are
//! serialized so each one derives its result from the latest snapshot.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::error::{IndexError, IndexResult};
use crate::index::cache::IndexCache;
use crate::index::project::{BuildReport, ProjectIndex};

/// Shared reference to an IndexHandle
pub type SharedIndex = Arc<IndexHandle>;

/// How the handle (re)builds its index.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub cache: Option<IndexCache>,
}

impl IndexOptions {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: IndexCache) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[derive(Default)]
struct HandleState {
    options: Option<IndexOptions>,
    current: Option<Arc<ProjectIndex>>,
}

/// Explicit owner of the current index snapshot.
#[derive(Default)]
pub struct IndexHandle {
    state: RwLock<HandleState>,
    /// Held from reading the snapshot until the new one is installed
    writer: Mutex<()>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this handle
    pub fn shared(self) -> SharedIndex {
        Arc::new(self)
    }

    /// Load from cache or build, then install as the current snapshot.
    ///
    /// `force` skips the cache lookup; the fresh index is still written back.
    pub fn init(&self, options: IndexOptions, force: bool) -> IndexResult<BuildReport> {
        let _writer = self.lock_writer();
        let (index, report) = load_or_build(&options, force)?;
        let mut state = self.write();
        state.current = Some(Arc::new(index));
        state.options = Some(options);
        Ok(report)
    }

    /// Current snapshot. Cheap; never blocks on a rebuild in progress.
    pub fn snapshot(&self) -> IndexResult<Arc<ProjectIndex>> {
        self.read().current.clone().ok_or(IndexError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.read().current.is_some()
    }

    /// Full rebuild with the options given to `init`, bypassing the cache.
    ///
    /// On failure the previous snapshot stays in place.
    pub fn reindex(&self) -> IndexResult<BuildReport> {
        let _writer = self.lock_writer();
        let options = self.read().options.clone().ok_or(IndexError::NotInitialized)?;
        let (index, report) = load_or_build(&options, true)?;
        self.write().current = Some(Arc::new(index));
        Ok(report)
    }

    /// Incremental update of the current snapshot from `changed` files.
    pub fn update(&self, changed: &[PathBuf]) -> IndexResult<BuildReport> {
        let _writer = self.lock_writer();
        let current = self.snapshot()?;
        let (next, report) = current.update(changed)?;

        let options = self.read().options.clone();
        if let Some(cache) = options.as_ref().and_then(|o| o.cache.as_ref()) {
            match IndexCache::fingerprint(next.root(), next.extensions()) {
                Ok(fingerprint) => write_back(cache, &fingerprint, &next, &report),
                Err(e) => warn!(error = %e, "Could not fingerprint sources; cache not updated"),
            }
        }

        self.write().current = Some(Arc::new(next));
        Ok(report)
    }

    /// Drop the snapshot and options. Outstanding `Arc`s stay valid.
    pub fn teardown(&self) {
        let mut state = self.write();
        state.current = None;
        state.options = None;
        info!("Index handle torn down");
    }

    fn read(&self) -> RwLockReadGuard<'_, HandleState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HandleState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn load_or_build(options: &IndexOptions, force: bool) -> IndexResult<(ProjectIndex, BuildReport)> {
    let root = options.root.as_path();
    if !root.is_dir() {
        return Err(IndexError::RootNotFound {
            path: root.to_path_buf(),
        });
    }

    let Some(cache) = options.cache.as_ref() else {
        return ProjectIndex::build(root, &options.extensions);
    };

    let fingerprint = IndexCache::fingerprint(root, &options.extensions)?;
    if !force {
        if let Some((index, skipped)) = cache.load(root, &fingerprint) {
            info!(root = %root.display(), types = index.type_count(), "Loaded project index from cache");
            let report = BuildReport {
                parsed: 0,
                skipped,
                duplicates: index.duplicates().to_vec(),
                from_cache: true,
                elapsed_ms: 0,
            };
            return Ok((index, report));
        }
    }

    let (index, report) = ProjectIndex::build(root, &options.extensions)?;
    write_back(cache, &fingerprint, &index, &report);
    Ok((index, report))
}

/// Store a freshly built index. The cache is optional, so a failed write
/// only costs the next startup a rebuild.
fn write_back(cache: &IndexCache, fingerprint: &str, index: &ProjectIndex, report: &BuildReport) {
    if let Err(e) = cache.store(index.root(), fingerprint, index, &report.skipped) {
        warn!(dir = %cache.dir().display(), error = %e, "Failed to write index cache; continuing without it");
    }
}

/// Convenience for callers holding only a path.
pub fn open(root: &Path, extensions: &[String]) -> IndexResult<SharedIndex> {
    let handle = IndexHandle::new();
    handle.init(IndexOptions::new(root, extensions.to_vec()), false)?;
    Ok(handle.shared())
}
