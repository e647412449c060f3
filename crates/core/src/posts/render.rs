//! Markdown to HTML rendering for post pages.

use comrak::{Options, markdown_to_html};

/// Render a post body to HTML.
///
/// Raw HTML embedded in the markdown is dropped, and tables, strikethrough
/// and autolinks are enabled.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    markdown_to_html(text, &options)
}
