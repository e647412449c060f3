//! Serve command implementation.

use std::path::Path;
use std::sync::Arc;

use blognifier_core::templates::PageTemplates;
use tokio::net::TcpListener;

use crate::server::{self, AppState};
use crate::ServeArgs;

pub fn run(config: Option<&Path>, profile: Option<&str>, args: ServeArgs) {
    let mut rc = super::load_config(config, profile, &args.source);
    if let Some(port) = args.port {
        rc.server.port = port;
    }
    if let Some(bind) = args.bind {
        rc.server.bind = bind;
    }
    if let Some(css) = args.css {
        rc.css_dir = Some(css);
    }
    if let Some(templates) = args.templates {
        rc.templates_dir = Some(templates);
    }

    println!("Starting blognifier server...");
    println!("Posts directory: {}", rc.posts_dir.display());
    println!("Cache directory: {}", rc.cache_dir.display());
    match rc.css_dir {
        Some(ref dir) => println!("CSS: {}", dir.display()),
        None => println!("CSS: (built-in)"),
    }
    match rc.templates_dir {
        Some(ref dir) => println!("Templates: {}", dir.display()),
        None => println!("Templates: (built-in)"),
    }
    println!("Port: {}", rc.server.port);
    println!();

    let templates = match rc.templates_dir {
        Some(ref dir) => match PageTemplates::load(dir) {
            Ok(templates) => templates,
            Err(e) => {
                eprintln!("Error loading templates: {}", e);
                std::process::exit(1);
            }
        },
        None => PageTemplates::default(),
    };

    let blog = super::open_blog(&rc);
    let state =
        Arc::new(AppState::new(blog, rc.css_dir.clone(), templates, rc.server.page_size));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            std::process::exit(1);
        }
    };

    let addr = format!("{}:{}", rc.server.bind, rc.server.port);
    let result = runtime.block_on(async {
        let listener = TcpListener::bind(&addr).await?;
        println!("Blognifier server running at http://{}", listener.local_addr()?);
        println!("Index: {}", rc.index_path().display());
        println!();
        println!("Press Ctrl+C to stop the server");
        server::serve(listener, state).await
    });

    if let Err(e) = result {
        eprintln!("Error serving on {}: {}", addr, e);
        std::process::exit(1);
    }
}
