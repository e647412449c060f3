//! Page templates: HTML shells with `{{name}}` placeholders.
//!
//! A templates directory may hold `main.html`, `search.html` and `post.html`.
//! Any of them can be missing, in which case the caller falls back to its
//! built-in layout for that page.

pub mod engine;
pub mod repository;

pub use engine::{RenderContext, TemplateRenderError, render_string};
pub use repository::{PageKind, PageTemplates, TemplateLoadError};
