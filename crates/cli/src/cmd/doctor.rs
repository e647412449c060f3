use std::path::Path;

use blognifier_core::config::loader::{default_config_path, ConfigLoader};

pub fn run(config: Option<&Path>, profile: Option<&str>) {
    let rc = match ConfigLoader::resolve(config, profile, None) {
        Ok(rc) => rc,
        Err(e) => {
            println!("FAIL blognifier doctor");
            println!("{e}");
            if config.is_none() {
                println!("looked for: {}", default_config_path().display());
            }
            std::process::exit(1);
        }
    };
    crate::logging::init(&rc);

    let source = match config {
        Some(p) => p.display().to_string(),
        None if default_config_path().exists() => default_config_path().display().to_string(),
        None => "(none, using defaults)".to_string(),
    };

    println!("OK   blognifier doctor");
    println!("path: {}", source);
    println!("profile: {}", rc.active_profile);
    println!("posts_dir: {}", rc.posts_dir.display());
    println!("cache_dir: {}", rc.cache_dir.display());
    println!("index: {}", rc.index_path().display());
    match rc.css_dir {
        Some(ref dir) => println!("css_dir: {}", dir.display()),
        None => println!("css_dir: (built-in)"),
    }
    match rc.templates_dir {
        Some(ref dir) => println!("templates_dir: {}", dir.display()),
        None => println!("templates_dir: (built-in)"),
    }
    println!("server: {}:{} (page_size {})", rc.server.bind, rc.server.port, rc.server.page_size);
    println!("logging.level: {}", rc.logging.level);
    if let Some(ref file) = rc.logging.file {
        println!("logging.file: {}", file.display());
    }

    if !rc.posts_dir.is_dir() {
        println!("warning: posts_dir does not exist");
    }
}
