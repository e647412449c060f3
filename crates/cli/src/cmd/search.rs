//! Search command implementation.

use std::path::Path;

use super::output::{
    print_hits_table, print_json, print_titles, resolve_format, HitOutput, PageOutput,
};
use crate::server::pages::{MARK_CLOSE, MARK_OPEN};
use crate::{OutputFormat, SearchArgs};

pub fn run(config: Option<&Path>, profile: Option<&str>, args: SearchArgs) {
    let rc = super::load_config(config, profile, &args.source);
    let blog = super::open_blog(&rc).with_markers(MARK_OPEN, MARK_CLOSE);

    let page_size = args.paging.page_size.unwrap_or(rc.server.page_size);
    let page = match blog.search(&args.query, args.paging.page, page_size) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("Error searching: {}", e);
            std::process::exit(1);
        }
    };

    match resolve_format(&args.paging) {
        OutputFormat::Table => print_hits_table(&page),
        OutputFormat::Json => {
            print_json(&PageOutput::from_page(&page, |h| HitOutput::from(h)))
        }
        OutputFormat::Quiet => print_titles(page.items.iter().map(|h| h.title.as_str())),
    }
}
