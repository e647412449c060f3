//! Reindex command implementation.

use std::io::Write;
use std::path::Path;

use blognifier_core::index::{ProgressCallback, ReconcileOutcome};
use blognifier_core::Blog;

use super::output::print_json;
use crate::ReindexArgs;

/// Run the reindex command.
pub fn run(config: Option<&Path>, profile: Option<&str>, args: ReindexArgs) {
    let rc = super::load_config(config, profile, &args.source);

    // No startup reconcile: the rescan below does the work and reports it
    let index_path = rc.index_path();
    let blog = match Blog::open_deferred(rc.posts_dir.clone(), &index_path) {
        Ok(blog) => blog,
        Err(e) => {
            eprintln!("Error opening index database: {}", e);
            std::process::exit(1);
        }
    };

    if !args.json {
        println!("Indexing posts: {}", rc.posts_dir.display());
    }

    let progress: Option<ProgressCallback> = if args.json {
        None
    } else if args.verbose {
        Some(Box::new(|current, total, title| {
            println!("[{}/{}] {}", current, total, title);
        }))
    } else {
        Some(Box::new(|current, total, _title| {
            if current % 50 == 0 || current == total {
                print!("\rIndexing... {}/{}", current, total);
                std::io::stdout().flush().ok();
            }
        }))
    };

    let stats = match blog.rescan(progress) {
        Ok(ReconcileOutcome::Scanned(stats)) => stats,
        Ok(_) => {
            eprintln!("\nError during indexing: scan pass did not run");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("\nError during indexing: {}", e);
            std::process::exit(1);
        }
    };

    if args.json {
        print_json(&stats);
        return;
    }

    if !args.verbose && stats.files_found > 0 {
        println!(); // Newline after progress
    }
    println!();
    println!("Indexing complete:");
    println!("  Files found:    {}", stats.files_found);
    println!("  Posts indexed:  {}", stats.indexed);
    println!("  Unchanged:      {}", stats.unchanged);
    if stats.skipped > 0 {
        println!("  Skipped:        {}", stats.skipped);
    }
    println!("  Purged:         {}", stats.purged);
    println!("  Duration:       {}ms", stats.duration_ms);
    println!();
    println!("Index stored at: {}", index_path.display());
}
