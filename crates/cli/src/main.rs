mod cmd;
mod logging;
mod server;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "blognifier",
    version,
    about = "Serve a directory of markdown posts as a blog with full-text search"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the blog over HTTP
    Serve(ServeArgs),

    /// Rescan every post and rebuild stale index entries
    Reindex(ReindexArgs),

    /// Full-text search over posts
    Search(SearchArgs),

    /// List posts, most recently modified first
    List(ListArgs),

    /// Validate configuration and print resolved paths
    Doctor,
}

/// Where the posts live and where their index is cached.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Directory containing markdown posts [default: profile posts_dir, or "."]
    pub posts_dir: Option<PathBuf>,

    /// Custom cache directory (overrides the derived one)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Port to serve on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub bind: Option<String>,

    /// Directory of stylesheets served under /css/
    #[arg(short, long)]
    pub css: Option<PathBuf>,

    /// Directory of page templates (main.html, search.html, post.html)
    #[arg(short, long)]
    pub templates: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReindexArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print each post as it is scanned
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the scan statistics as JSON
    #[arg(long)]
    pub json: bool,
}

/// Output format for query commands.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Quiet,
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Results per page [default: server page_size]
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Shorthand for --output json
    #[arg(long)]
    pub json: bool,

    /// Print titles only
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search terms; every term must match
    pub query: String,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub paging: PageArgs,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub paging: PageArgs,
}

fn main() {
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Serve(args) => cmd::serve::run(config, profile, args),
        Commands::Reindex(args) => cmd::reindex::run(config, profile, args),
        Commands::Search(args) => cmd::search::run(config, profile, args),
        Commands::List(args) => cmd::list::run(config, profile, args),
        Commands::Doctor => cmd::doctor::run(config, profile),
    }

    logging::shutdown();
}
