//! Configuration file loading and resolution.

pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, default_cache_dir, default_config_path};
pub use types::{ConfigFile, LoggingConfig, Profile, ResolvedConfig, ServerConfig};
