//! Blog index: persistent store, reconciliation and queries.
//!
//! This module provides SQLite-based indexing for:
//! - Post metadata (title, last change, last scan confirmation)
//! - A full-text FTS5 index over post bodies, ranked with BM25
//! - The scan marker used to skip passes when the directory is unchanged
//!
//! # Example
//!
//! ```no_run
//! use blognifier_core::index::{IndexDb, QueryEngine, Reconciler};
//! use blognifier_core::posts::PostDir;
//! use std::path::Path;
//!
//! let db = IndexDb::open(Path::new("blog.sqlite")).unwrap();
//! let posts = PostDir::new("posts");
//!
//! Reconciler::new(&db, &posts).reconcile().unwrap();
//! let page = QueryEngine::new(&db).search("rust", 1, 25).unwrap();
//! ```

pub mod db;
pub mod gate;
pub mod query;
pub mod reconciler;
pub mod schema;
pub mod types;

pub use db::{IndexDb, IndexError};
pub use gate::ScanGate;
pub use query::{QueryEngine, QueryError};
pub use reconciler::{
    ProgressCallback, ReconcileError, ReconcileOutcome, ReconcileStats, Reconciler,
};
pub use schema::{SCAN_MARKER_SENTINEL, SCHEMA_VERSION, SchemaError};
pub use types::{IndexedPost, Page, SearchHit, StoreOps};
