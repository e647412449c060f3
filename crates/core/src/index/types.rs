//! Index data types for posts, search hits and result pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as recorded in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedPost {
    /// File name without the `.md` suffix. Primary key.
    pub title: String,
    /// File modification time when last indexed (ns since epoch).
    pub changed_at: i64,
    /// Scan pass that last confirmed the file exists (ns since epoch).
    pub scanned_at: i64,
}

impl IndexedPost {
    /// Modification time as a UTC date.
    pub fn changed(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.changed_at)
    }
}

/// One ranked full-text match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    /// Modification time of the matching post (ns since epoch).
    pub changed_at: i64,
    /// Post text with matched terms wrapped in the engine's markers.
    pub highlight: String,
    /// BM25 score; lower is a better match.
    pub rank: f64,
}

impl SearchHit {
    pub fn changed(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.changed_at)
    }
}

/// One page of an offset-paginated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub has_next: bool,
    pub has_prev: bool,
    /// Total number of rows across all pages, when the query computes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    /// Build a page from `page_size + 1` fetched rows, dropping the probe row.
    pub(crate) fn from_probe(mut rows: Vec<T>, page: u32, page_size: u32) -> Self {
        let has_next = rows.len() > page_size as usize;
        rows.truncate(page_size as usize);
        Self {
            items: rows,
            page,
            page_size,
            has_next,
            has_prev: page > 1,
            total_count: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Counters of store operations, used to observe how much work a pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOps {
    /// Statements that only read.
    pub reads: u64,
    /// Statements that modified rows.
    pub writes: u64,
    /// Search entries deleted and re-inserted.
    pub search_rebuilds: u64,
}

impl std::ops::Add for StoreOps {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            reads: self.reads + other.reads,
            writes: self.writes + other.writes,
            search_rebuilds: self.search_rebuilds + other.search_rebuilds,
        }
    }
}
