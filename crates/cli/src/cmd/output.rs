//! Shared output formatting for query commands.

use blognifier_core::index::{IndexedPost, Page, SearchHit};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::server::pages::{MARK_CLOSE, MARK_OPEN};
use crate::{OutputFormat, PageArgs};

/// Width of the excerpt column in search tables.
const EXCERPT_WIDTH: usize = 60;

/// Date format used everywhere a post date is shown.
pub const DATE_FORMAT: &str = "%d/%m/%Y, %H:%M";

pub fn format_date(date: DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Post summary for JSON output.
#[derive(Debug, Serialize)]
pub struct PostOutput {
    pub title: String,
    pub changed: String,
}

impl From<&IndexedPost> for PostOutput {
    fn from(post: &IndexedPost) -> Self {
        Self { title: post.title.clone(), changed: post.changed().to_rfc3339() }
    }
}

/// Search hit for JSON output. Matches in `highlight` are bracketed.
#[derive(Debug, Serialize)]
pub struct HitOutput {
    pub title: String,
    pub changed: String,
    pub rank: f64,
    pub highlight: String,
}

impl From<&SearchHit> for HitOutput {
    fn from(hit: &SearchHit) -> Self {
        Self {
            title: hit.title.clone(),
            changed: hit.changed().to_rfc3339(),
            rank: hit.rank,
            highlight: bracketed(&hit.highlight),
        }
    }
}

/// A page of results for JSON output.
#[derive(Debug, Serialize)]
pub struct PageOutput<T> {
    pub page: u32,
    pub page_size: u32,
    pub has_next: bool,
    pub has_prev: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    pub items: Vec<T>,
}

impl<T> PageOutput<T> {
    pub fn from_page<S>(page: &Page<S>, convert: impl Fn(&S) -> T) -> Self {
        Self {
            page: page.page,
            page_size: page.page_size,
            has_next: page.has_next,
            has_prev: page.has_prev,
            total_count: page.total_count,
            items: page.items.iter().map(convert).collect(),
        }
    }
}

#[derive(Tabled)]
struct PostRow {
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Changed")]
    changed: String,
}

#[derive(Tabled)]
struct HitRow {
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Changed")]
    changed: String,
    #[tabled(rename = "Rank")]
    rank: String,
    #[tabled(rename = "Excerpt")]
    excerpt: String,
}

pub fn resolve_format(args: &PageArgs) -> OutputFormat {
    if args.json {
        OutputFormat::Json
    } else if args.quiet {
        OutputFormat::Quiet
    } else {
        args.output
    }
}

/// Print a listing page as a table.
pub fn print_posts_table(page: &Page<IndexedPost>) {
    if page.is_empty() {
        println!("(no posts found)");
        return;
    }

    let rows: Vec<PostRow> = page
        .items
        .iter()
        .map(|p| PostRow { title: p.title.clone(), changed: format_date(p.changed()) })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{}", table);
    print_page_footer(page);
}

/// Print a search page as a table.
pub fn print_hits_table(page: &Page<SearchHit>) {
    if page.is_empty() {
        println!("(no results found)");
        return;
    }

    let rows: Vec<HitRow> = page
        .items
        .iter()
        .map(|h| HitRow {
            title: h.title.clone(),
            changed: format_date(h.changed()),
            rank: format!("{:.3}", h.rank),
            excerpt: excerpt(&h.highlight, EXCERPT_WIDTH),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{}", table);
    print_page_footer(page);
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn print_titles<'a>(titles: impl Iterator<Item = &'a str>) {
    for title in titles {
        println!("{}", title);
    }
}

fn print_page_footer<T>(page: &Page<T>) {
    let mut footer = format!("Page {}", page.page);
    if let Some(total) = page.total_count {
        footer.push_str(&format!(" ({} posts)", total));
    }
    if page.has_prev {
        footer.push_str(&format!("  prev: --page {}", page.page - 1));
    }
    if page.has_next {
        footer.push_str(&format!("  next: --page {}", page.page + 1));
    }
    println!("{}", footer);
}

/// One line of a highlight, at most `width` characters, starting shortly
/// before the first match. Cut ends are shown as `...`.
fn excerpt(highlight: &str, width: usize) -> String {
    let flat: Vec<char> =
        highlight.split_whitespace().collect::<Vec<_>>().join(" ").chars().collect();
    if flat.len() <= width {
        return bracketed(&flat.iter().collect::<String>());
    }

    let first_match = flat.iter().position(|&c| c == MARK_OPEN).unwrap_or(0);
    let start = first_match.saturating_sub(width / 3).min(flat.len() - width);
    let end = start + width;
    let lead = if start > 0 { ELLIPSIS.len() } else { 0 };
    let trail = if end < flat.len() { ELLIPSIS.len() } else { 0 };

    let mut out = String::with_capacity(width + 8);
    if lead > 0 {
        out.push_str(ELLIPSIS);
    }
    out.extend(&flat[start + lead..end - trail]);
    if trail > 0 {
        out.push_str(ELLIPSIS);
    }
    bracketed(&out)
}

const ELLIPSIS: &str = "...";

/// Turn highlight markers into `[` and `]`. Stray closes are dropped and an
/// open match is closed at the end.
fn bracketed(highlight: &str) -> String {
    let mut out = String::with_capacity(highlight.len());
    let mut open = false;
    for c in highlight.chars() {
        match c {
            MARK_OPEN if !open => {
                out.push('[');
                open = true;
            }
            MARK_CLOSE if open => {
                out.push(']');
                open = false;
            }
            MARK_OPEN | MARK_CLOSE => {}
            _ => out.push(c),
        }
    }
    if open {
        out.push(']');
    }
    out
}
