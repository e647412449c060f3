//! Flat posts directory listing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use walkdir::WalkDir;

const POST_SUFFIX: &str = ".md";

/// Failure to access the posts directory as a whole.
#[derive(Debug, Error)]
pub enum PostDirError {
    #[error("posts directory does not exist: {0}")]
    Missing(String),

    #[error("posts path is not a directory: {0}")]
    NotADirectory(String),

    #[error("failed to read posts directory {0}: {1}")]
    Unreadable(String, #[source] io::Error),

    #[error("failed to list posts directory {0}: {1}")]
    WalkError(String, #[source] walkdir::Error),
}

/// Failure to access one post. Never fatal to a scan.
#[derive(Debug, Error)]
pub enum PostReadError {
    #[error("failed to read post metadata {0}: {1}")]
    Metadata(String, #[source] io::Error),

    #[error("failed to read post {0}: {1}")]
    Read(String, #[source] io::Error),

    #[error("post file name is not valid UTF-8: {0}")]
    InvalidName(String),

    #[error("failed to list post entry {0}: {1}")]
    Entry(String, #[source] walkdir::Error),
}

/// A discovered post file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedPost {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// File name without the `.md` suffix.
    pub title: String,
    /// Modification time in nanoseconds since the Unix epoch.
    pub modified: i64,
}

/// The directory a blog is served from.
#[derive(Debug, Clone)]
pub struct PostDir {
    root: PathBuf,
}

impl PostDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Modification time of the directory itself, in nanoseconds since the
    /// Unix epoch. Changes whenever an entry is added, removed or renamed.
    pub fn dir_mtime(&self) -> Result<i64, PostDirError> {
        let metadata = self.dir_metadata()?;
        let modified = metadata
            .modified()
            .map_err(|e| PostDirError::Unreadable(self.display(), e))?;
        Ok(to_nanos(modified))
    }

    /// List every post file directly inside the directory, sorted by title.
    ///
    /// The outer error means the directory could not be listed at all. Inner
    /// errors belong to single entries that vanished or could not be
    /// inspected mid-listing.
    pub fn walk(&self) -> Result<Vec<Result<WalkedPost, PostReadError>>, PostDirError> {
        self.dir_metadata()?;

        let mut posts = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1).follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(PostDirError::WalkError(self.display(), e));
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    if has_post_suffix(&path) {
                        posts.push(Err(PostReadError::Entry(
                            path.display().to_string(),
                            e,
                        )));
                    } else {
                        tracing::debug!("ignoring unreadable entry {}: {}", path.display(), e);
                    }
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !has_post_suffix(path) {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                posts.push(Err(PostReadError::InvalidName(path.display().to_string())));
                continue;
            };
            let Some(title) = title_for(name) else {
                continue;
            };

            let walked = entry
                .metadata()
                .map_err(|e| {
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("metadata unavailable"));
                    PostReadError::Metadata(path.display().to_string(), source)
                })
                .and_then(|metadata| {
                    metadata.modified().map_err(|e| {
                        PostReadError::Metadata(path.display().to_string(), e)
                    })
                })
                .map(|modified| WalkedPost {
                    path: path.to_path_buf(),
                    title: title.to_string(),
                    modified: to_nanos(modified),
                });
            posts.push(walked);
        }

        posts.sort_by(|a, b| sort_key(a).cmp(sort_key(b)));
        Ok(posts)
    }

    /// Read the full text of a post.
    pub fn read(&self, post: &WalkedPost) -> Result<String, PostReadError> {
        fs::read_to_string(&post.path)
            .map_err(|e| PostReadError::Read(post.path.display().to_string(), e))
    }

    /// Map a request path onto a regular file in the posts directory.
    ///
    /// Only the final path component is used, so `../x.md` and `a/b/x.md`
    /// both resolve to `x.md` directly inside the root.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let base = Path::new(name).file_name()?;
        let path = self.root.join(base);
        path.is_file().then_some(path)
    }

    fn dir_metadata(&self) -> Result<fs::Metadata, PostDirError> {
        let metadata = fs::metadata(&self.root).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PostDirError::Missing(self.display())
            } else {
                PostDirError::Unreadable(self.display(), e)
            }
        })?;
        if !metadata.is_dir() {
            return Err(PostDirError::NotADirectory(self.display()));
        }
        Ok(metadata)
    }

    fn display(&self) -> String {
        self.root.display().to_string()
    }
}

/// Post title for a file name, or `None` if it is not a post.
pub(crate) fn title_for(file_name: &str) -> Option<&str> {
    file_name.strip_suffix(POST_SUFFIX).filter(|title| !title.is_empty())
}

/// Convert a filesystem timestamp to signed nanoseconds since the epoch.
pub fn to_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
        Err(before) => {
            i64::try_from(before.duration().as_nanos()).map_or(i64::MIN, |n| -n)
        }
    }
}

fn has_post_suffix(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(POST_SUFFIX))
}

fn sort_key(entry: &Result<WalkedPost, PostReadError>) -> &str {
    match entry {
        Ok(post) => &post.title,
        Err(_) => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_posts_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::write(root.join("hello world.md"), "hello").unwrap();
        fs::write(root.join("another.md"), "another").unwrap();
        fs::write(root.join("picture.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join("notes.txt"), "not a post").unwrap();

        // Nested posts are not part of the blog
        fs::create_dir(root.join("drafts")).unwrap();
        fs::write(root.join("drafts/draft.md"), "draft").unwrap();

        dir
    }

    fn ok_titles(posts: &[Result<WalkedPost, PostReadError>]) -> Vec<String> {
        posts.iter().filter_map(|p| p.as_ref().ok()).map(|p| p.title.clone()).collect()
    }

    #[rstest]
    #[case("post.md", Some("post"))]
    #[case("two words.md", Some("two words"))]
    #[case("archive.tar.md", Some("archive.tar"))]
    #[case(".md", None)]
    #[case("post.MD", None)]
    #[case("post.markdown", None)]
    #[case("post.md.bak", None)]
    fn test_title_for(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(title_for(name), expected);
    }

    #[test]
    fn test_walk_finds_top_level_posts_only() {
        let dir = create_posts_dir();
        let posts = PostDir::new(dir.path()).walk().unwrap();

        assert_eq!(ok_titles(&posts), vec!["another", "hello world"]);
    }

    #[test]
    fn test_walk_records_file_mtime() {
        let dir = create_posts_dir();
        let path = dir.path().join("another.md");
        let when = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        fs::File::options().write(true).open(&path).unwrap().set_modified(when).unwrap();

        let posts = PostDir::new(dir.path()).walk().unwrap();
        let another = posts
            .iter()
            .filter_map(|p| p.as_ref().ok())
            .find(|p| p.title == "another")
            .unwrap();
        assert_eq!(another.modified, 1_700_000_000 * 1_000_000_000);
    }

    #[test]
    fn test_missing_root() {
        let posts = PostDir::new("/nonexistent/blognifier/posts");
        assert!(matches!(posts.walk().unwrap_err(), PostDirError::Missing(_)));
        assert!(matches!(posts.dir_mtime().unwrap_err(), PostDirError::Missing(_)));
    }

    #[test]
    fn test_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("posts");
        fs::write(&file, "x").unwrap();

        let posts = PostDir::new(&file);
        assert!(matches!(posts.walk().unwrap_err(), PostDirError::NotADirectory(_)));
    }

    #[test]
    fn test_read_rejects_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("binary.md"), [0xff, 0xfe, 0x00]).unwrap();

        let posts = PostDir::new(dir.path());
        let walked = posts.walk().unwrap().remove(0).unwrap();
        assert!(matches!(posts.read(&walked), Err(PostReadError::Read(_, _))));
    }

    #[test]
    fn test_resolve_uses_base_name_only() {
        let dir = create_posts_dir();
        let posts = PostDir::new(dir.path());

        assert_eq!(posts.resolve("another.md"), Some(dir.path().join("another.md")));
        assert_eq!(posts.resolve("../another.md"), Some(dir.path().join("another.md")));
        assert_eq!(posts.resolve("drafts/another.md"), Some(dir.path().join("another.md")));
        assert_eq!(posts.resolve("draft.md"), None);
        assert_eq!(posts.resolve(".."), None);
    }

    #[test]
    fn test_to_nanos_before_epoch() {
        let before = UNIX_EPOCH - Duration::from_secs(2);
        assert_eq!(to_nanos(before), -2_000_000_000);
        assert_eq!(to_nanos(UNIX_EPOCH), 0);
    }
}
