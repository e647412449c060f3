//! Ranked search and paginated listing over the index.

use thiserror::Error;

use super::db::{IndexDb, IndexError};
use super::types::{IndexedPost, Page, SearchHit};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Search query is empty")]
    InvalidQuery,

    #[error("Invalid page {page} with page size {page_size}: both must be at least 1")]
    InvalidPage { page: u32, page_size: u32 },

    #[error("Index store unavailable: {0}")]
    StoreUnavailable(#[from] IndexError),
}

/// Read-only query engine over an [`IndexDb`].
pub struct QueryEngine<'a> {
    db: &'a IndexDb,
    open: String,
    close: String,
}

impl<'a> QueryEngine<'a> {
    /// Create a query engine whose highlights carry no markers.
    pub fn new(db: &'a IndexDb) -> Self {
        Self { db, open: String::new(), close: String::new() }
    }

    /// Wrap matched terms in search highlights with `open` and `close`.
    pub fn with_markers(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.open = open.into();
        self.close = close.into();
        self
    }

    /// Full-text search, best match first.
    ///
    /// Every whitespace-separated word of `query` must appear in the post.
    pub fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SearchHit>, QueryError> {
        let fts_query = fts_query(query).ok_or(QueryError::InvalidQuery)?;
        let offset = offset_for(page, page_size)?;

        let rows = self.db.search_posts(
            &fts_query,
            &self.open,
            &self.close,
            page_size.saturating_add(1),
            offset,
        )?;

        Ok(Page::from_probe(rows, page, page_size))
    }

    /// All posts, most recently modified first.
    pub fn list(&self, page: u32, page_size: u32) -> Result<Page<IndexedPost>, QueryError> {
        let offset = offset_for(page, page_size)?;

        let total = self.db.count_posts()?;
        let rows = self.db.list_posts(page_size.saturating_add(1), offset)?;

        let mut result = Page::from_probe(rows, page, page_size);
        result.total_count = Some(total);
        Ok(result)
    }
}

/// Validate paging arguments and compute the row offset of `page`.
fn offset_for(page: u32, page_size: u32) -> Result<u64, QueryError> {
    if page == 0 || page_size == 0 {
        return Err(QueryError::InvalidPage { page, page_size });
    }
    Ok(u64::from(page - 1) * u64::from(page_size))
}

/// Turn free text into an FTS5 query: each word becomes a quoted string
/// token, so operators and punctuation in user input are matched literally
/// rather than parsed as query syntax. Returns `None` for blank input.
pub(crate) fn fts_query(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() { None } else { Some(terms.join(" ")) }
}
