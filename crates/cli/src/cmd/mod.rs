pub mod doctor;
pub mod list;
pub mod output;
pub mod reindex;
pub mod search;
pub mod serve;

use std::path::Path;

use blognifier_core::config::loader::ConfigLoader;
use blognifier_core::config::types::ResolvedConfig;
use blognifier_core::Blog;

use crate::{logging, SourceArgs};

/// Resolve configuration for a command and install logging. Exits on error.
pub fn load_config(
    config: Option<&Path>,
    profile: Option<&str>,
    source: &SourceArgs,
) -> ResolvedConfig {
    let mut rc = match ConfigLoader::resolve(config, profile, source.posts_dir.as_deref()) {
        Ok(rc) => rc,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(ref cache_dir) = source.cache_dir {
        rc.cache_dir = cache_dir.clone();
    }

    logging::init(&rc);
    rc
}

/// Open the blog, bringing its index up to date. Exits on error.
pub fn open_blog(rc: &ResolvedConfig) -> Blog {
    if !rc.posts_dir.is_dir() {
        eprintln!("Error: Posts directory \"{}\" does not exist", rc.posts_dir.display());
        std::process::exit(1);
    }

    match Blog::open(rc.posts_dir.clone(), &rc.index_path()) {
        Ok(blog) => blog,
        Err(e) => {
            eprintln!("Error opening blog: {}", e);
            std::process::exit(1);
        }
    }
}
