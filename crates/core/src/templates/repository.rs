use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("templates directory does not exist: {0}")]
    MissingDir(String),

    #[error("templates path is not a directory: {0}")]
    NotADirectory(String),

    #[error("failed to read template {0}: {1}")]
    Read(String, #[source] io::Error),
}

/// The pages a template can replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// The front page listing.
    Main,
    /// Search results.
    Search,
    /// One rendered post.
    Post,
}

impl PageKind {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Main => "main.html",
            Self::Search => "search.html",
            Self::Post => "post.html",
        }
    }
}

/// Templates found in a directory, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct PageTemplates {
    main: Option<String>,
    search: Option<String>,
    post: Option<String>,
}

impl PageTemplates {
    /// Read whichever page templates exist in `dir`.
    pub fn load(dir: &Path) -> Result<Self, TemplateLoadError> {
        let metadata = fs::metadata(dir).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TemplateLoadError::MissingDir(dir.display().to_string()),
            _ => TemplateLoadError::Read(dir.display().to_string(), e),
        })?;
        if !metadata.is_dir() {
            return Err(TemplateLoadError::NotADirectory(dir.display().to_string()));
        }

        let read = |kind: PageKind| -> Result<Option<String>, TemplateLoadError> {
            let path = dir.join(kind.file_name());
            match fs::read_to_string(&path) {
                Ok(text) => {
                    tracing::debug!("Loaded template {}", path.display());
                    Ok(Some(text))
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(TemplateLoadError::Read(path.display().to_string(), e)),
            }
        };

        Ok(Self {
            main: read(PageKind::Main)?,
            search: read(PageKind::Search)?,
            post: read(PageKind::Post)?,
        })
    }

    /// The custom template for `kind`, if the directory had one.
    pub fn get(&self, kind: PageKind) -> Option<&str> {
        match kind {
            PageKind::Main => self.main.as_deref(),
            PageKind::Search => self.search.as_deref(),
            PageKind::Post => self.post.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.search.is_none() && self.post.is_none()
    }
}
