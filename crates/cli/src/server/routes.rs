//! Request handlers.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use blognifier_core::index::{Page, QueryError};
use blognifier_core::posts::render_markdown;
use blognifier_core::BlogError;
use serde::Deserialize;

use super::{pages, AppState};

/// Largest page size a request may ask for.
pub const MAX_PAGE_SIZE: u32 = 500;

const DEFAULT_STYLESHEET: &str = include_str!("../../assets/style.css");

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListParams {
    page: Option<String>,
    page_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchParams {
    q: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
}

/// GET /
pub(crate) async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let page = page_number(params.page.as_deref());
    let page_size = page_size(params.page_size.as_deref(), state.page_size);

    let blog = Arc::clone(&state.blog);
    match run_blocking(move || blog.list(page, page_size)).await {
        Ok(listing) => Html(pages::listing(&state.templates, &listing, None)).into_response(),
        Err((status, message)) => {
            tracing::error!("listing failed: {}", message);
            let empty = empty_page(page, page_size);
            let html = pages::listing(&state.templates, &empty, Some(&message));
            (status, Html(html)).into_response()
        }
    }
}

/// GET /search
///
/// A missing or blank query redirects to the front page with 302 Found.
pub(crate) async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(query) = params.q.filter(|q| !q.trim().is_empty()) else {
        return (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response();
    };
    let page = page_number(params.page.as_deref());
    let page_size = page_size(params.page_size.as_deref(), state.page_size);

    let blog = Arc::clone(&state.blog);
    let text = query.clone();
    match run_blocking(move || blog.search(&text, page, page_size)).await {
        Ok(hits) => Html(pages::search(&state.templates, &query, &hits, None)).into_response(),
        Err((status, message)) => {
            tracing::warn!(query = %query, "search failed: {}", message);
            let empty = empty_page(page, page_size);
            let html = pages::search(&state.templates, &query, &empty, Some(&message));
            (status, Html(html)).into_response()
        }
    }
}

/// GET /posts/*path
///
/// Markdown posts are rendered; anything else is served as a file from the
/// posts directory.
pub(crate) async fn post(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Response {
    let Some(file) = state.blog.posts().resolve(&path) else {
        return not_found();
    };

    if path.ends_with(".md") {
        let text = match tokio::fs::read_to_string(&file).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("cannot read post {}: {}", file.display(), e);
                return not_found();
            }
        };
        let title =
            file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        Html(pages::post(&state.templates, &title, &render_markdown(&text))).into_response()
    } else {
        serve_file(&file).await
    }
}

/// GET /css/*path
pub(crate) async fn css(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Response {
    let Some(name) = FsPath::new(&path).file_name() else {
        return not_found();
    };

    match state.css_dir {
        Some(ref dir) => serve_file(&dir.join(name)).await,
        None if name == "style.css" => {
            let headers = [(header::CONTENT_TYPE, "text/css; charset=utf-8")];
            (headers, DEFAULT_STYLESHEET).into_response()
        }
        None => not_found(),
    }
}

/// Anything else.
pub(crate) async fn fallback() -> Response {
    (StatusCode::NOT_FOUND, "Page not found").into_response()
}

async fn serve_file(path: &FsPath) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(path))], bytes).into_response(),
        Err(_) => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// Run a blocking blog call off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, (StatusCode, String)>
where
    F: FnOnce() -> Result<T, BlogError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("task failed: {e}")))?
        .map_err(|e| (status_for(&e), e.to_string()))
}

fn status_for(err: &BlogError) -> StatusCode {
    match err {
        BlogError::Query(QueryError::InvalidQuery | QueryError::InvalidPage { .. }) => {
            StatusCode::BAD_REQUEST
        }
        BlogError::Query(QueryError::StoreUnavailable(_))
        | BlogError::Reconcile(_)
        | BlogError::Open(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn empty_page<T>(page: u32, page_size: u32) -> Page<T> {
    Page { items: Vec::new(), page, page_size, has_next: false, has_prev: false, total_count: None }
}

/// 1-based page number; missing, invalid or zero means the first page.
fn page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok()).filter(|&n| n > 0).unwrap_or(1)
}

/// Requested page size clamped to `1..=MAX_PAGE_SIZE`; missing, invalid or
/// zero means `default`.
fn page_size(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|&n| n != 0)
        .unwrap_or(i64::from(default))
        .clamp(1, i64::from(MAX_PAGE_SIZE)) as u32
}

fn content_type(path: &FsPath) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "css" => "text/css; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "js" => "text/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blognifier_core::templates::PageTemplates;
    use blognifier_core::Blog;
    use rstest::rstest;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn write_post(dir: &FsPath, title: &str, text: &str, secs: u64) {
        let path = dir.join(format!("{title}.md"));
        fs::write(&path, text).unwrap();
        let when = UNIX_EPOCH + Duration::from_secs(secs);
        fs::File::options().write(true).open(&path).unwrap().set_modified(when).unwrap();
        fs::File::open(dir).unwrap().set_modified(when).unwrap();
    }

    /// State over `dir` with the index in its own temp directory, which
    /// lives as long as the returned guard.
    fn state_with(
        dir: &FsPath,
        css_dir: Option<&FsPath>,
        templates: PageTemplates,
    ) -> (TempDir, Arc<AppState>) {
        let cache = TempDir::new().unwrap();
        let blog = Blog::open(dir, &cache.path().join("blog.sqlite")).unwrap();
        let state = AppState::new(blog, css_dir.map(FsPath::to_path_buf), templates, 25);
        (cache, Arc::new(state))
    }

    fn state_for(dir: &FsPath, css_dir: Option<&FsPath>) -> (TempDir, Arc<AppState>) {
        state_with(dir, css_dir, PageTemplates::default())
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn search_params(q: Option<&str>) -> SearchParams {
        SearchParams { q: q.map(String::from), ..Default::default() }
    }

    #[rstest]
    #[case(None, 1)]
    #[case(Some("3"), 3)]
    #[case(Some("0"), 1)]
    #[case(Some("-2"), 1)]
    #[case(Some("abc"), 1)]
    fn test_page_number(#[case] raw: Option<&str>, #[case] expected: u32) {
        assert_eq!(page_number(raw), expected);
    }

    #[rstest]
    #[case(None, 25)]
    #[case(Some("10"), 10)]
    #[case(Some("0"), 25)]
    #[case(Some("-5"), 1)]
    #[case(Some("100000"), 500)]
    #[case(Some("lots"), 25)]
    fn test_page_size(#[case] raw: Option<&str>, #[case] expected: u32) {
        assert_eq!(page_size(raw, 25), expected);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(FsPath::new("a.PNG")), "image/png");
        assert_eq!(content_type(FsPath::new("style.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(FsPath::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_index_lists_posts_newest_first() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "older", "x", 100);
        write_post(dir.path(), "newer", "y", 200);
        let (_cache, state) = state_for(dir.path(), None);

        let response = index(State(state), Query(ListParams::default())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        let newer = html.find("/posts/newer.md").unwrap();
        let older = html.find("/posts/older.md").unwrap();
        assert!(newer < older);
    }

    #[tokio::test]
    async fn test_search_redirects_on_empty_query_with_found() {
        let dir = TempDir::new().unwrap();
        let (_cache, state) = state_for(dir.path(), None);

        for q in [None, Some(""), Some("   ")] {
            let response = search(State(Arc::clone(&state)), Query(search_params(q))).await;
            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(response.headers()[header::LOCATION], "/");
        }
    }

    #[tokio::test]
    async fn test_search_marks_matches() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "a", "hello <world>", 100);
        write_post(dir.path(), "b", "goodbye", 101);
        let (_cache, state) = state_for(dir.path(), None);

        let response = search(State(state), Query(search_params(Some("hello")))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<mark>hello</mark> &lt;world&gt;"));
        assert!(html.contains("/posts/a.md"));
        assert!(!html.contains("/posts/b.md"));
    }

    #[tokio::test]
    async fn test_search_failure_renders_empty_results() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("posts");
        fs::create_dir(&root).unwrap();
        write_post(&root, "a", "hello", 100);
        let (_cache, state) = state_for(&root, None);
        fs::remove_dir_all(&root).unwrap();

        let response = search(State(state), Query(search_params(Some("hello")))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let html = body_text(response).await;
        assert!(html.contains("class=\"error\""));
        assert!(!html.contains("/posts/a.md"));
    }

    #[tokio::test]
    async fn test_post_renders_markdown() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "my post", "# Heading\n\nbody", 100);
        let (_cache, state) = state_for(dir.path(), None);

        let response = post(State(state), Path("my post.md".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<title>my post</title>"));
        assert!(html.contains("<h1>Heading</h1>"));
    }

    #[tokio::test]
    async fn test_post_serves_assets_by_base_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pic.png"), [1u8, 2, 3]).unwrap();
        let (_cache, state) = state_for(dir.path(), None);

        let response = post(State(Arc::clone(&state)), Path("../../pic.png".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(body_text(response).await.as_bytes(), &[1u8, 2, 3]);

        let response = post(State(state), Path("missing.md".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Not found");
    }

    #[tokio::test]
    async fn test_css_defaults_to_builtin() {
        let dir = TempDir::new().unwrap();
        let (_cache, state) = state_for(dir.path(), None);

        let response = css(State(Arc::clone(&state)), Path("style.css".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, DEFAULT_STYLESHEET);

        let response = css(State(state), Path("other.css".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_css_from_directory() {
        let dir = TempDir::new().unwrap();
        let css_dir = TempDir::new().unwrap();
        fs::write(css_dir.path().join("style.css"), "body{}").unwrap();
        let (_cache, state) = state_for(dir.path(), Some(css_dir.path()));

        let response = css(State(state), Path("nested/style.css".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "body{}");
    }

    #[tokio::test]
    async fn test_custom_main_template_wraps_listing() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "hello", "x", 100);
        let templates_dir = TempDir::new().unwrap();
        fs::write(
            templates_dir.path().join("main.html"),
            "<body class=\"custom\"><h1>{{site}}</h1>{{body}}</body>",
        )
        .unwrap();
        let templates = PageTemplates::load(templates_dir.path()).unwrap();
        let (_cache, state) = state_with(dir.path(), None, templates);

        let response = index(State(state), Query(ListParams::default())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.starts_with("<body class=\"custom\"><h1>blog</h1>"));
        assert!(html.contains("/posts/hello.md"));
        assert!(!html.contains("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn test_fallback_is_not_found() {
        let response = fallback().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Page not found");
    }
}
