//! HTTP front end: listing, search, post pages and static files.

pub mod pages;
mod routes;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use blognifier_core::templates::PageTemplates;
use blognifier_core::Blog;
use tokio::net::TcpListener;

/// Shared state behind every handler.
pub struct AppState {
    pub(crate) blog: Arc<Blog>,
    pub(crate) css_dir: Option<PathBuf>,
    pub(crate) templates: PageTemplates,
    pub(crate) page_size: u32,
}

impl AppState {
    /// `blog` gets highlight markers that the pages turn into `<mark>`.
    pub fn new(
        blog: Blog,
        css_dir: Option<PathBuf>,
        templates: PageTemplates,
        page_size: u32,
    ) -> Self {
        let blog = blog.with_markers(pages::MARK_OPEN, pages::MARK_CLOSE);
        Self {
            blog: Arc::new(blog),
            css_dir,
            templates,
            page_size: page_size.clamp(1, routes::MAX_PAGE_SIZE),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/search", get(routes::search))
        .route("/posts/*path", get(routes::post))
        .route("/css/*path", get(routes::css))
        .fallback(routes::fallback)
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
}
