//! The blog handle: scan-before-read access to the index.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::index::query::fts_query;
use crate::index::{
    IndexDb, IndexError, IndexedPost, Page, ProgressCallback, QueryEngine, QueryError,
    ReconcileError, ReconcileOutcome, Reconciler, ScanGate, SearchHit, StoreOps,
};
use crate::posts::PostDir;

/// Read connections kept open between requests.
const MAX_IDLE_READERS: usize = 8;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("Failed to open index: {0}")]
    Open(#[from] IndexError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// A posts directory and the index kept in sync with it.
///
/// Every read reconciles first. Reconciliation is serialised through a
/// [`ScanGate`] and is the only user of the write connection. Queries run on
/// pooled read-only connections, so they neither wait on each other nor hold
/// up a pass. Share it between threads with `Arc`.
pub struct Blog {
    posts: PostDir,
    writer: Mutex<IndexDb>,
    readers: ReaderPool,
    gate: ScanGate,
    open_marker: String,
    close_marker: String,
}

impl Blog {
    /// Open the index at `index_path` and bring it up to date.
    pub fn open(posts_dir: impl Into<PathBuf>, index_path: &Path) -> Result<Self, BlogError> {
        let blog = Self::open_deferred(posts_dir, index_path)?;
        blog.reconcile()?;
        Ok(blog)
    }

    /// Open the index without reconciling, for callers that start with a
    /// [`Blog::rescan`] anyway.
    pub fn open_deferred(
        posts_dir: impl Into<PathBuf>,
        index_path: &Path,
    ) -> Result<Self, BlogError> {
        let writer = IndexDb::open(index_path)?;
        Ok(Self {
            posts: PostDir::new(posts_dir),
            writer: Mutex::new(writer),
            readers: ReaderPool::new(index_path),
            gate: ScanGate::new(),
            open_marker: String::new(),
            close_marker: String::new(),
        })
    }

    /// Wrap matched terms in search highlights with `open` and `close`.
    pub fn with_markers(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.open_marker = open.into();
        self.close_marker = close.into();
        self
    }

    pub fn posts(&self) -> &PostDir {
        &self.posts
    }

    /// Reconcile unless the directory is unchanged since the last pass.
    pub fn reconcile(&self) -> Result<ReconcileOutcome, ReconcileError> {
        self.gate.run(|| {
            let db = lock(&self.writer);
            Reconciler::new(&db, &self.posts).reconcile()
        })
    }

    /// Full scan that also catches posts edited in place.
    ///
    /// A pass already in flight may have taken the fast path, so this waits
    /// for it and then runs its own.
    pub fn rescan(
        &self,
        mut progress: Option<ProgressCallback>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        loop {
            let result = self.gate.run(|| {
                let db = lock(&self.writer);
                Reconciler::new(&db, &self.posts)
                    .with_progress(progress.take())
                    .rescan()
                    .map(ReconcileOutcome::Scanned)
            });
            match result {
                Ok(ReconcileOutcome::Joined) | Err(ReconcileError::JoinedPassFailed(_)) => {
                    continue;
                }
                other => return other,
            }
        }
    }

    /// Ranked full-text search over up-to-date posts.
    pub fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SearchHit>, BlogError> {
        // Reject blank queries before touching the directory or the store
        if fts_query(query).is_none() {
            return Err(QueryError::InvalidQuery.into());
        }

        self.reconcile()?;
        let page = self.readers.with(|db| {
            QueryEngine::new(db)
                .with_markers(self.open_marker.as_str(), self.close_marker.as_str())
                .search(query, page, page_size)
        })??;
        Ok(page)
    }

    /// Up-to-date posts, most recently modified first.
    pub fn list(&self, page: u32, page_size: u32) -> Result<Page<IndexedPost>, BlogError> {
        self.reconcile()?;
        Ok(self.readers.with(|db| QueryEngine::new(db).list(page, page_size))??)
    }

    /// Store operation counters across the write and idle read connections.
    pub fn store_ops(&self) -> StoreOps {
        lock(&self.writer).ops() + self.readers.ops()
    }
}

/// Read-only connections to one index file, opened on demand and reused.
struct ReaderPool {
    path: PathBuf,
    idle: Mutex<Vec<IndexDb>>,
    /// Counters of connections closed because the pool was full.
    retired: Mutex<StoreOps>,
}

impl ReaderPool {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            idle: Mutex::new(Vec::new()),
            retired: Mutex::new(StoreOps::default()),
        }
    }

    /// Run `read` on a connection no other caller is using.
    fn with<T>(&self, read: impl FnOnce(&IndexDb) -> T) -> Result<T, IndexError> {
        let pooled = lock(&self.idle).pop();
        let db = match pooled {
            Some(db) => db,
            None => IndexDb::open_read_only(&self.path)?,
        };

        let result = read(&db);

        let mut idle = lock(&self.idle);
        if idle.len() < MAX_IDLE_READERS {
            idle.push(db);
        } else {
            drop(idle);
            let mut retired = lock(&self.retired);
            *retired = *retired + db.ops();
        }
        Ok(result)
    }

    fn ops(&self) -> StoreOps {
        let retired = *lock(&self.retired);
        lock(&self.idle).iter().fold(retired, |total, db| total + db.ops())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
