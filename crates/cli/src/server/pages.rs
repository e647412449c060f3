//! HTML pages for the blog server.

use blognifier_core::index::{IndexedPost, Page, SearchHit};
use blognifier_core::templates::{render_string, PageKind, PageTemplates, RenderContext};

use crate::cmd::output::format_date;

/// Opens a highlighted term. Private-use code points never appear in escaped HTML.
pub const MARK_OPEN: char = '\u{E000}';
/// Closes a highlighted term.
pub const MARK_CLOSE: char = '\u{E001}';

const SITE_TITLE: &str = "blog";
const STYLESHEET_URL: &str = "/css/style.css";

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// URL of the page rendering a post.
pub fn post_url(title: &str) -> String {
    format!("/posts/{}.md", urlencoding::encode(title))
}

/// Escape a highlight and turn its markers into `<mark>` elements.
///
/// Unbalanced markers are dropped and an open mark is closed at the end.
pub fn render_highlight(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut open = false;
    let mut buf = [0u8; 4];
    for c in text.chars() {
        match c {
            MARK_OPEN if !open => {
                out.push_str("<mark>");
                open = true;
            }
            MARK_CLOSE if open => {
                out.push_str("</mark>");
                open = false;
            }
            MARK_OPEN | MARK_CLOSE => {}
            _ => out.push_str(&escape(c.encode_utf8(&mut buf))),
        }
    }
    if open {
        out.push_str("</mark>");
    }
    out
}

/// Front page: posts newest first.
pub fn listing(
    templates: &PageTemplates,
    page: &Page<IndexedPost>,
    error: Option<&str>,
) -> String {
    let mut body = String::new();
    push_error(&mut body, error);

    if page.is_empty() && error.is_none() {
        body.push_str("<p class=\"empty\">No posts yet.</p>\n");
    }

    body.push_str("<ul class=\"posts\">\n");
    for post in &page.items {
        body.push_str(&format!(
            "<li><a href=\"{}\">{}</a> <time>{}</time></li>\n",
            escape(&post_url(&post.title)),
            escape(&post.title),
            format_date(post.changed()),
        ));
    }
    body.push_str("</ul>\n");

    let link = |n: u32| format!("/?page={}&pageSize={}", n, page.page_size);
    push_pager(&mut body, page, link);

    layout(templates, PageKind::Main, SITE_TITLE, "", &body, None)
}

/// Search results with highlighted matches.
pub fn search(
    templates: &PageTemplates,
    query: &str,
    page: &Page<SearchHit>,
    error: Option<&str>,
) -> String {
    let mut body = String::new();
    body.push_str(&format!("<h1>Results for &ldquo;{}&rdquo;</h1>\n", escape(query)));
    push_error(&mut body, error);

    if page.is_empty() && error.is_none() {
        body.push_str("<p class=\"empty\">No results found.</p>\n");
    }

    body.push_str("<ul class=\"results\">\n");
    for hit in &page.items {
        body.push_str(&format!(
            "<li><a href=\"{}\">{}</a> <time>{}</time>\n<div class=\"highlight\">{}</div></li>\n",
            escape(&post_url(&hit.title)),
            escape(&hit.title),
            format_date(hit.changed()),
            render_highlight(&hit.highlight),
        ));
    }
    body.push_str("</ul>\n");

    let encoded = urlencoding::encode(query);
    let link = |n: u32| format!("/search?q={}&page={}&pageSize={}", encoded, n, page.page_size);
    push_pager(&mut body, page, link);

    let title = format!("{} - search", SITE_TITLE);
    layout(templates, PageKind::Search, &title, query, &body, None)
}

/// A single rendered post. `article` is trusted HTML.
pub fn post(templates: &PageTemplates, title: &str, article: &str) -> String {
    let body = format!(
        "<article>\n<h1>{}</h1>\n{}</article>\n",
        escape(title),
        article
    );
    layout(templates, PageKind::Post, title, "", &body, Some(article))
}

fn push_error(body: &mut String, error: Option<&str>) {
    if let Some(message) = error {
        body.push_str(&format!("<p class=\"error\">{}</p>\n", escape(message)));
    }
}

fn push_pager<T>(body: &mut String, page: &Page<T>, link: impl Fn(u32) -> String) {
    if !page.has_prev && !page.has_next {
        return;
    }
    body.push_str("<nav class=\"pager\">\n");
    if page.has_prev {
        body.push_str(&format!(
            "<a rel=\"prev\" href=\"{}\">&larr; Newer</a>\n",
            escape(&link(page.page - 1))
        ));
    }
    if page.has_next {
        body.push_str(&format!(
            "<a rel=\"next\" href=\"{}\">Older &rarr;</a>\n",
            escape(&link(page.page + 1))
        ));
    }
    body.push_str("</nav>\n");
}

/// Fill the custom template for `kind`, or the built-in shell without one.
///
/// Templates see `title`, `site`, `query`, `stylesheet` and `body`; post
/// templates also get the bare `article`. Text values arrive escaped.
fn layout(
    templates: &PageTemplates,
    kind: PageKind,
    title: &str,
    query: &str,
    body: &str,
    article: Option<&str>,
) -> String {
    let Some(template) = templates.get(kind) else {
        return builtin_layout(title, query, body);
    };

    let mut ctx = RenderContext::new();
    ctx.insert("title".into(), escape(title));
    ctx.insert("site".into(), SITE_TITLE.into());
    ctx.insert("query".into(), escape(query));
    ctx.insert("stylesheet".into(), STYLESHEET_URL.into());
    ctx.insert("body".into(), body.into());
    if let Some(article) = article {
        ctx.insert("article".into(), article.into());
    }

    match render_string(template, &ctx) {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("{} unusable, using built-in layout: {}", kind.file_name(), e);
            builtin_layout(title, query, body)
        }
    }
}

fn builtin_layout(title: &str, query: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="{stylesheet}">
</head>
<body>
<header>
<a class="home" href="/">{site}</a>
<form action="/search" method="get">
<input type="search" name="q" value="{query}" placeholder="Search posts">
</form>
</header>
<main>
{body}</main>
</body>
</html>
"#,
        title = escape(title),
        stylesheet = STYLESHEET_URL,
        site = SITE_TITLE,
        query = escape(query),
        body = body,
    )
}
