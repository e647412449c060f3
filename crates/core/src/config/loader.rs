use crate::config::types::{
    ConfigFile, LoggingConfig, Profile, ResolvedConfig, ServerConfig,
};
use sha2::{Digest, Sha256};
use shellexpand::full;
use std::path::{Path, PathBuf};
use std::{env, fs};

use dirs::{cache_dir, home_dir};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    NotFound(String),

    #[error("failed to read config file {0}: {1}")]
    ReadError(String, #[source] std::io::Error),

    #[error("failed to parse TOML in {0}: {1}")]
    ParseError(String, #[source] toml::de::Error),

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("no profiles defined in config")]
    NoProfiles,

    #[error("version {0} is unsupported (expected 1)")]
    BadVersion(u32),

    #[error("home directory not available to expand '~'")]
    NoHome,

    #[error("failed to resolve path {0}: {1}")]
    BadPath(String, #[source] std::io::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and resolve a config file. The file must exist.
    pub fn load(
        config_path: Option<&Path>,
        profile_override: Option<&str>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        let cf = Self::read_file(&path)?;

        let active = profile_override
            .map(ToOwned::to_owned)
            .or(cf.profile.clone())
            .unwrap_or_else(|| "default".to_string());

        let prof = cf
            .profiles
            .get(&active)
            .ok_or_else(|| ConfigError::ProfileNotFound(active.clone()))?;

        Self::resolve_profile(&active, prof, &cf.server, &cf.logging)
    }

    /// Resolve the configuration for a command line run.
    ///
    /// An explicit `config_path` must exist. Without one, the default config
    /// file is used when present and built-in defaults otherwise. A
    /// `posts_override` replaces the profile's posts directory, and the cache
    /// directory is then derived from it.
    pub fn resolve(
        config_path: Option<&Path>,
        profile_override: Option<&str>,
        posts_override: Option<&Path>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let use_file = config_path.is_some() || default_config_path().exists();

        if !use_file {
            return Self::for_posts_dir(posts_override.unwrap_or(Path::new(".")));
        }

        let mut rc = Self::load(config_path, profile_override)?;
        if let Some(posts_dir) = posts_override {
            rc.posts_dir = absolute(posts_dir)?;
            rc.cache_dir = default_cache_dir(&rc.posts_dir);
        }
        Ok(rc)
    }

    /// Defaults for serving `posts_dir` without any config file.
    pub fn for_posts_dir(posts_dir: &Path) -> Result<ResolvedConfig, ConfigError> {
        let posts_dir = absolute(posts_dir)?;
        Ok(ResolvedConfig {
            active_profile: "default".to_string(),
            cache_dir: default_cache_dir(&posts_dir),
            posts_dir,
            css_dir: None,
            templates_dir: None,
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let s = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e))?;

        let cf: ConfigFile = toml::from_str(&s)
            .map_err(|e| ConfigError::ParseError(path.display().to_string(), e))?;

        if cf.version != 1 {
            return Err(ConfigError::BadVersion(cf.version));
        }
        if cf.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }
        Ok(cf)
    }

    fn resolve_profile(
        active: &str,
        prof: &Profile,
        server: &ServerConfig,
        log_cfg: &LoggingConfig,
    ) -> Result<ResolvedConfig, ConfigError> {
        let posts_dir = absolute(&expand_path(&prof.posts_dir)?)?;
        let sub = |s: &str| s.replace("{{posts_dir}}", &posts_dir.to_string_lossy());

        let cache_dir = match &prof.cache_dir {
            Some(dir) => expand_path(&sub(dir))?,
            None => default_cache_dir(&posts_dir),
        };
        let css_dir = prof.css_dir.as_deref().map(|d| expand_path(&sub(d))).transpose()?;
        let templates_dir =
            prof.templates_dir.as_deref().map(|d| expand_path(&sub(d))).transpose()?;

        let logging = if let Some(ref file) = log_cfg.file {
            let expanded_file = expand_path(&sub(&file.to_string_lossy()))?;
            LoggingConfig {
                level: log_cfg.level.clone(),
                file_level: log_cfg.file_level.clone(),
                file: Some(expanded_file),
            }
        } else {
            log_cfg.clone()
        };

        Ok(ResolvedConfig {
            active_profile: active.to_string(),
            posts_dir,
            cache_dir,
            css_dir,
            templates_dir,
            server: server.clone(),
            logging,
        })
    }
}

pub fn default_config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("blognifier").join("config.toml");
    }
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("blognifier").join("config.toml")
}

/// Per-directory cache location:
/// `~/.cache/blognifier/<sanitised path>_<hash prefix>`.
///
/// The sanitised part keeps the directory recognisable; the hash keeps two
/// paths that sanitise alike apart.
pub fn default_cache_dir(posts_dir: &Path) -> PathBuf {
    cache_root().join("blognifier").join(cache_key(posts_dir))
}

fn cache_key(posts_dir: &Path) -> String {
    let path = posts_dir.to_string_lossy();
    let digest = format!("{:x}", Sha256::digest(path.as_bytes()));
    let safe: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(50)
        .collect();
    format!("{}_{}", safe, &digest[..8])
}

fn cache_root() -> PathBuf {
    cache_dir().unwrap_or_else(|| {
        home_dir().unwrap_or_else(|| PathBuf::from("~")).join(".cache")
    })
}

fn expand_path(input: &str) -> Result<PathBuf, ConfigError> {
    let expanded = full(input).map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path)
        .map_err(|e| ConfigError::BadPath(path.display().to_string(), e))
}
