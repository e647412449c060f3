//! Database connection and operations.

use std::cell::Cell;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use thiserror::Error;

use super::schema::{SchemaError, init_schema};
use super::types::{IndexedPost, SearchHit, StoreOps};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Failed to create index directory {0}: {1}")]
    CreateDir(String, #[source] std::io::Error),
}

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Blog index database handle.
///
/// Owns one connection to the store. The reconciler is the only writer; the
/// query engine only reads, and may do so through a read-only handle.
pub struct IndexDb {
    conn: Connection,
    ops: Cell<StoreOps>,
}

impl IndexDb {
    /// Open or create an index database at the given path, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| IndexError::CreateDir(parent.display().to_string(), e))?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        init_schema(&conn)?;
        Ok(Self { conn, ops: Cell::new(StoreOps::default()) })
    }

    /// Open a read-only handle on an index another handle already created.
    ///
    /// In WAL mode readers see the last committed state and never wait on
    /// the writer.
    pub fn open_read_only(path: &Path) -> Result<Self, IndexError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn, ops: Cell::new(StoreOps::default()) })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn, ops: Cell::new(StoreOps::default()) })
    }

    /// Operation counters since this handle was opened.
    pub fn ops(&self) -> StoreOps {
        self.ops.get()
    }

    fn record(&self, reads: u64, writes: u64, search_rebuilds: u64) {
        let mut ops = self.ops.get();
        ops.reads += reads;
        ops.writes += writes;
        ops.search_rebuilds += search_rebuilds;
        self.ops.set(ops);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scan marker
    // ─────────────────────────────────────────────────────────────────────────

    /// Directory mtime recorded by the last completed scan pass.
    pub fn scan_marker(&self) -> Result<i64, IndexError> {
        self.record(1, 0, 0);
        let mtime =
            self.conn.query_row("SELECT mtime FROM scan_marker WHERE id = 1", [], |row| {
                row.get(0)
            })?;
        Ok(mtime)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Posts
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a post by title.
    pub fn get_post(&self, title: &str) -> Result<Option<IndexedPost>, IndexError> {
        self.record(1, 0, 0);
        self.conn
            .query_row(
                "SELECT title, changed_at, scanned_at FROM posts WHERE title = ?1",
                [title],
                Self::row_to_post,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Upsert a post and replace its search entry, in one transaction.
    pub fn index_post(&self, post: &IndexedPost, text: &str) -> Result<(), IndexError> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO posts (title, changed_at, scanned_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(title) DO UPDATE SET
                changed_at = excluded.changed_at,
                scanned_at = excluded.scanned_at",
            params![post.title, post.changed_at, post.scanned_at],
        )?;
        tx.execute("DELETE FROM posts_fts WHERE title = ?1", [&post.title])?;
        tx.execute(
            "INSERT INTO posts_fts (title, text) VALUES (?1, ?2)",
            params![post.title, text],
        )?;

        tx.commit()?;
        self.record(0, 3, 1);
        Ok(())
    }

    /// Confirm an unchanged post is still present as of `scanned_at`.
    pub fn touch_post(&self, title: &str, scanned_at: i64) -> Result<bool, IndexError> {
        let rows = self.conn.execute(
            "UPDATE posts SET scanned_at = ?2 WHERE title = ?1 AND scanned_at != ?2",
            params![title, scanned_at],
        )?;
        self.record(0, 1, 0);
        Ok(rows > 0)
    }

    /// Close a scan pass: delete every post (and its search entry) not
    /// confirmed by `scan_time`, then advance the scan marker to it.
    ///
    /// Runs as one transaction, so the marker never moves past a purge that
    /// failed. Returns the purged titles.
    pub fn finish_scan(&self, scan_time: i64) -> Result<Vec<String>, IndexError> {
        let tx = self.conn.unchecked_transaction()?;

        let stale: Vec<String> = {
            let mut stmt = tx.prepare("SELECT title FROM posts WHERE scanned_at != ?1")?;
            let titles = stmt
                .query_map([scan_time], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            titles
        };

        for title in &stale {
            tx.execute("DELETE FROM posts_fts WHERE title = ?1", [title])?;
            tx.execute("DELETE FROM posts WHERE title = ?1", [title])?;
        }

        tx.execute("UPDATE scan_marker SET mtime = ?1 WHERE id = 1", [scan_time])?;

        tx.commit()?;
        self.record(1, 2 * stale.len() as u64 + 1, 0);
        Ok(stale)
    }

    /// Get total post count.
    pub fn count_posts(&self) -> Result<u64, IndexError> {
        self.record(1, 0, 0);
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Get total search entry count.
    pub fn count_search_entries(&self) -> Result<u64, IndexError> {
        self.record(1, 0, 0);
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM posts_fts", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Posts ordered newest first, ties broken by title.
    pub fn list_posts(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<IndexedPost>, IndexError> {
        self.record(1, 0, 0);
        let mut stmt = self.conn.prepare(
            "SELECT title, changed_at, scanned_at FROM posts
             ORDER BY changed_at DESC, title ASC
             LIMIT ?1 OFFSET ?2",
        )?;

        let posts = stmt
            .query_map(params![limit, offset as i64], Self::row_to_post)?
            .collect::<Result<_, _>>()?;

        Ok(posts)
    }

    /// Run a full-text match, best BM25 score first, ties broken by title.
    ///
    /// `fts_query` must already be a valid FTS5 query expression. Matched
    /// terms in the highlight are wrapped in `open` and `close`.
    pub fn search_posts(
        &self,
        fts_query: &str,
        open: &str,
        close: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<SearchHit>, IndexError> {
        self.record(1, 0, 0);
        let mut stmt = self.conn.prepare(
            "SELECT m.title, m.highlight, m.rank, p.changed_at
             FROM (
                SELECT title,
                       highlight(posts_fts, 1, ?2, ?3) AS highlight,
                       bm25(posts_fts) AS rank
                FROM posts_fts
                WHERE posts_fts MATCH ?1
             ) AS m
             JOIN posts p ON p.title = m.title
             ORDER BY m.rank ASC, m.title ASC
             LIMIT ?4 OFFSET ?5",
        )?;

        let hits = stmt
            .query_map(params![fts_query, open, close, limit, offset as i64], |row| {
                Ok(SearchHit {
                    title: row.get(0)?,
                    highlight: row.get(1)?,
                    rank: row.get(2)?,
                    changed_at: row.get(3)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        Ok(hits)
    }

    /// Whether a search entry exists for `title`.
    pub fn has_search_entry(&self, title: &str) -> Result<bool, IndexError> {
        self.record(1, 0, 0);
        let exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM posts_fts WHERE title = ?1",
            [title],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn row_to_post(row: &rusqlite::Row) -> Result<IndexedPost, rusqlite::Error> {
        Ok(IndexedPost {
            title: row.get(0)?,
            changed_at: row.get(1)?,
            scanned_at: row.get(2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::schema::SCAN_MARKER_SENTINEL;

    fn post(title: &str, changed_at: i64, scanned_at: i64) -> IndexedPost {
        IndexedPost { title: title.to_string(), changed_at, scanned_at }
    }

    #[test]
    fn test_index_and_get_post() {
        let db = IndexDb::open_in_memory().unwrap();
        db.index_post(&post("hello", 10, 100), "hello world").unwrap();

        let retrieved = db.get_post("hello").unwrap().expect("post should exist");
        assert_eq!(retrieved, post("hello", 10, 100));
        assert!(db.has_search_entry("hello").unwrap());
        assert!(db.get_post("missing").unwrap().is_none());
    }

    #[test]
    fn test_reindex_replaces_search_entry() {
        let db = IndexDb::open_in_memory().unwrap();
        db.index_post(&post("a", 1, 100), "first version").unwrap();
        db.index_post(&post("a", 2, 200), "second version").unwrap();

        assert_eq!(db.count_posts().unwrap(), 1);
        assert_eq!(db.count_search_entries().unwrap(), 1);
        assert_eq!(db.get_post("a").unwrap().unwrap().changed_at, 2);

        assert!(db.search_posts("first", "", "", 10, 0).unwrap().is_empty());
        assert_eq!(db.search_posts("second", "", "", 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_touch_post() {
        let db = IndexDb::open_in_memory().unwrap();
        db.index_post(&post("a", 1, 100), "text").unwrap();

        assert!(db.touch_post("a", 200).unwrap());
        assert!(!db.touch_post("a", 200).unwrap());
        assert_eq!(db.get_post("a").unwrap().unwrap(), post("a", 1, 200));
    }

    #[test]
    fn test_finish_scan_purges_stale_and_advances_marker() {
        let db = IndexDb::open_in_memory().unwrap();
        db.index_post(&post("kept", 1, 200), "kept").unwrap();
        db.index_post(&post("gone", 1, 100), "gone").unwrap();
        assert_eq!(db.scan_marker().unwrap(), SCAN_MARKER_SENTINEL);

        let purged = db.finish_scan(200).unwrap();

        assert_eq!(purged, vec!["gone".to_string()]);
        assert!(db.get_post("gone").unwrap().is_none());
        assert!(!db.has_search_entry("gone").unwrap());
        assert!(db.has_search_entry("kept").unwrap());
        assert_eq!(db.scan_marker().unwrap(), 200);
    }

    #[test]
    fn test_finish_scan_with_nothing_stale_still_advances_marker() {
        let db = IndexDb::open_in_memory().unwrap();
        db.index_post(&post("a", 1, 100), "a").unwrap();

        assert!(db.finish_scan(100).unwrap().is_empty());
        assert_eq!(db.scan_marker().unwrap(), 100);
    }

    #[test]
    fn test_list_posts_newest_first() {
        let db = IndexDb::open_in_memory().unwrap();
        db.index_post(&post("old", 1, 0), "").unwrap();
        db.index_post(&post("new", 3, 0), "").unwrap();
        db.index_post(&post("b-mid", 2, 0), "").unwrap();
        db.index_post(&post("a-mid", 2, 0), "").unwrap();

        let titles: Vec<String> =
            db.list_posts(10, 0).unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["new", "a-mid", "b-mid", "old"]);

        let page: Vec<String> =
            db.list_posts(2, 1).unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(page, vec!["a-mid", "b-mid"]);
    }

    #[test]
    fn test_search_highlights_with_markers() {
        let db = IndexDb::open_in_memory().unwrap();
        db.index_post(&post("a", 5, 0), "hello world").unwrap();

        let hits = db.search_posts("world", "[", "]", 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "a");
        assert_eq!(hits[0].changed_at, 5);
        assert_eq!(hits[0].highlight, "hello [world]");
    }

    #[test]
    fn test_ops_counters() {
        let db = IndexDb::open_in_memory().unwrap();
        assert_eq!(db.ops(), StoreOps::default());

        db.index_post(&post("a", 1, 1), "x").unwrap();
        db.get_post("a").unwrap();

        let ops = db.ops();
        assert_eq!(ops.writes, 3);
        assert_eq!(ops.search_rebuilds, 1);
        assert_eq!(ops.reads, 1);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache/blog.sqlite");

        {
            let db = IndexDb::open(&path).unwrap();
            db.index_post(&post("a", 1, 1), "persisted").unwrap();
            db.finish_scan(1).unwrap();
        }

        let db = IndexDb::open(&path).unwrap();
        assert_eq!(db.scan_marker().unwrap(), 1);
        assert_eq!(db.search_posts("persisted", "", "", 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_read_only_handle_sees_commits_and_rejects_writes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("blog.sqlite");
        let writer = IndexDb::open(&path).unwrap();
        let reader = IndexDb::open_read_only(&path).unwrap();

        writer.index_post(&post("a", 1, 1), "visible").unwrap();
        assert_eq!(reader.search_posts("visible", "", "", 10, 0).unwrap().len(), 1);
        assert!(reader.index_post(&post("b", 1, 1), "nope").is_err());
        assert_eq!(writer.count_posts().unwrap(), 1);
    }

    #[test]
    fn test_open_read_only_requires_existing_index() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(IndexDb::open_read_only(&dir.path().join("absent.sqlite")).is_err());
    }
}
