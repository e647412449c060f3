use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// File name of the index database inside the cache directory.
pub const INDEX_FILE_NAME: &str = "blog.sqlite";

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    pub profile: Option<String>,
    pub profiles: HashMap<String, Profile>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub posts_dir: String,
    /// Where the index lives. Derived from `posts_dir` when absent.
    pub cache_dir: Option<String>,
    /// Stylesheets served under `/css/`. The built-in stylesheet is used when absent.
    pub css_dir: Option<String>,
    /// Page templates (`main.html`, `search.html`, `post.html`) replacing the
    /// built-in page layout.
    pub templates_dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind(), port: default_port(), page_size: default_page_size() }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_page_size() -> u32 {
    25
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub active_profile: String,
    pub posts_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub css_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl ResolvedConfig {
    /// Path of the index database.
    pub fn index_path(&self) -> PathBuf {
        self.cache_dir.join(INDEX_FILE_NAME)
    }
}
