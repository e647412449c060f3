#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! Incremental full-text index over a directory of markdown posts.
//!
//! The [`Blog`] handle ties the pieces together: it owns the
//! [`index::IndexDb`] store, reconciles it against the posts directory
//! before every read, and answers ranked searches and paginated listings.

pub mod blog;
pub mod config;
pub mod index;
pub mod posts;
pub mod templates;

pub use blog::{Blog, BlogError};
