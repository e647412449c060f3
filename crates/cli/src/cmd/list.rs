//! List command implementation.

use std::path::Path;

use super::output::{
    print_json, print_posts_table, print_titles, resolve_format, PageOutput, PostOutput,
};
use crate::{ListArgs, OutputFormat};

pub fn run(config: Option<&Path>, profile: Option<&str>, args: ListArgs) {
    let rc = super::load_config(config, profile, &args.source);
    let blog = super::open_blog(&rc);

    let page_size = args.paging.page_size.unwrap_or(rc.server.page_size);
    let page = match blog.list(args.paging.page, page_size) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("Error listing posts: {}", e);
            std::process::exit(1);
        }
    };

    match resolve_format(&args.paging) {
        OutputFormat::Table => print_posts_table(&page),
        OutputFormat::Json => {
            print_json(&PageOutput::from_page(&page, |p| PostOutput::from(p)))
        }
        OutputFormat::Quiet => print_titles(page.items.iter().map(|p| p.title.as_str())),
    }
}
