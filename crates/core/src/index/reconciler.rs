//! Incremental reconciliation of the index against the posts directory.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use super::db::{IndexDb, IndexError};
use super::types::IndexedPost;
use crate::posts::{PostDir, PostDirError, PostReadError, WalkedPost};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Posts directory unavailable: {0}")]
    SourceUnavailable(#[from] PostDirError),

    #[error("Index store error: {0}")]
    Store(#[from] IndexError),

    #[error("Concurrent scan pass failed: {0}")]
    JoinedPassFailed(String),
}

/// What a call to [`Reconciler::reconcile`] did.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The directory has not changed since the last completed pass.
    Fresh,
    /// A scan pass ran.
    Scanned(ReconcileStats),
    /// Another caller's pass was already in flight and this call waited for it.
    Joined,
}

impl ReconcileOutcome {
    pub fn stats(&self) -> Option<&ReconcileStats> {
        match self {
            Self::Scanned(stats) => Some(stats),
            Self::Fresh | Self::Joined => None,
        }
    }
}

/// Statistics from one scan pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileStats {
    /// Directory mtime the pass stamped confirmed posts with.
    pub scan_time: i64,
    /// Number of post files discovered.
    pub files_found: usize,
    /// Posts that were new or changed and got (re)indexed.
    pub indexed: usize,
    /// Posts whose mtime matched the index and were left alone.
    pub unchanged: usize,
    /// Posts that could not be read this pass.
    pub skipped: usize,
    /// Posts removed because their file is gone or unreadable.
    pub purged: usize,
    /// Pass duration in milliseconds.
    pub duration_ms: u64,
}

/// Progress callback for scan passes.
/// Parameters: (current, total, current_title)
pub type ProgressCallback = Box<dyn Fn(usize, usize, &str)>;

/// Brings the index in line with the posts directory.
pub struct Reconciler<'a> {
    db: &'a IndexDb,
    posts: &'a PostDir,
    progress: Option<ProgressCallback>,
}

impl<'a> Reconciler<'a> {
    pub fn new(db: &'a IndexDb, posts: &'a PostDir) -> Self {
        Self { db, posts, progress: None }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Scan the directory if its mtime differs from the scan marker.
    ///
    /// Cheap when nothing changed: one `stat` and one marker read.
    pub fn reconcile(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let dir_mtime = self.posts.dir_mtime()?;
        let last_mtime = self.db.scan_marker()?;

        if dir_mtime == last_mtime {
            tracing::trace!("posts directory unchanged, skipping scan");
            return Ok(ReconcileOutcome::Fresh);
        }

        self.scan(dir_mtime).map(ReconcileOutcome::Scanned)
    }

    /// Scan regardless of the scan marker.
    ///
    /// Picks up posts edited in place, which update the file mtime but not
    /// the directory mtime.
    pub fn rescan(&self) -> Result<ReconcileStats, ReconcileError> {
        let dir_mtime = self.posts.dir_mtime()?;
        self.scan(dir_mtime)
    }

    fn scan(&self, scan_time: i64) -> Result<ReconcileStats, ReconcileError> {
        let start = Instant::now();
        let walked = self.posts.walk()?;

        let mut stats =
            ReconcileStats { scan_time, files_found: walked.len(), ..Default::default() };
        let total = walked.len();

        for (i, entry) in walked.into_iter().enumerate() {
            let post = match entry {
                Ok(post) => post,
                Err(e) => {
                    tracing::warn!("Skipping post: {}", e);
                    stats.skipped += 1;
                    continue;
                }
            };

            if let Some(ref cb) = self.progress {
                cb(i + 1, total, &post.title);
            }

            match self.sync_post(&post, scan_time) {
                Ok(true) => stats.indexed += 1,
                Ok(false) => stats.unchanged += 1,
                Err(SyncError::Read(e)) => {
                    tracing::warn!("Skipping post {}: {}", post.title, e);
                    stats.skipped += 1;
                }
                Err(SyncError::Store(e)) => return Err(e.into()),
            }
        }

        // Unreadable posts were not stamped and get purged here. They come
        // back on the first pass after the directory changes again.
        let purged = self.db.finish_scan(scan_time)?;
        for title in &purged {
            tracing::debug!("Purged post {}", title);
        }

        stats.purged = purged.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            found = stats.files_found,
            indexed = stats.indexed,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            purged = stats.purged,
            duration_ms = stats.duration_ms,
            "Scanned posts directory {}",
            self.posts.root().display()
        );

        Ok(stats)
    }

    /// Bring one post up to date. Returns whether it was (re)indexed.
    fn sync_post(&self, post: &WalkedPost, scan_time: i64) -> Result<bool, SyncError> {
        let existing = self.db.get_post(&post.title)?;

        if existing.is_some_and(|e| e.changed_at == post.modified) {
            self.db.touch_post(&post.title, scan_time)?;
            return Ok(false);
        }

        let text = self.posts.read(post)?;
        let indexed = IndexedPost {
            title: post.title.clone(),
            changed_at: post.modified,
            scanned_at: scan_time,
        };
        self.db.index_post(&indexed, &text)?;
        tracing::debug!("Indexed post {}", post.title);

        Ok(true)
    }
}

enum SyncError {
    Read(PostReadError),
    Store(IndexError),
}

impl From<PostReadError> for SyncError {
    fn from(e: PostReadError) -> Self {
        Self::Read(e)
    }
}

impl From<IndexError> for SyncError {
    fn from(e: IndexError) -> Self {
        Self::Store(e)
    }
}
