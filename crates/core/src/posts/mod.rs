//! Posts directory access and markdown rendering.
//!
//! Posts are the `.md` files directly inside one directory. The file name
//! minus its extension is the post title.

pub mod render;
pub mod walker;

pub use render::render_markdown;
pub use walker::{PostDir, PostDirError, PostReadError, WalkedPost, to_nanos};
