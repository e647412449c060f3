use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::{tempdir, TempDir};

fn write_post(dir: &Path, title: &str, text: &str, secs: u64) {
    let path = dir.join(format!("{title}.md"));
    fs::write(&path, text).unwrap();
    let when = UNIX_EPOCH + Duration::from_secs(secs);
    fs::File::options().write(true).open(&path).unwrap().set_modified(when).unwrap();
    fs::File::open(dir).unwrap().set_modified(when).unwrap();
}

fn blog_dir() -> TempDir {
    let tmp = tempdir().unwrap();
    let posts = tmp.path().join("posts");
    fs::create_dir(&posts).unwrap();
    write_post(&posts, "a", "hello world", 1_700_000_000);
    write_post(&posts, "b", "goodbye world", 1_700_000_100);
    tmp
}

fn blognifier(tmp: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("blognifier"));
    cmd.env("XDG_CONFIG_HOME", tmp.join("config"));
    cmd.env("XDG_CACHE_HOME", tmp.join("cache"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn list_shows_newest_first() {
    let tmp = blog_dir();
    let posts = tmp.path().join("posts");

    let output = blognifier(tmp.path())
        .args(["list", "--quiet"])
        .arg(&posts)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "b\na\n");
}

#[test]
fn list_table_includes_dates() {
    let tmp = blog_dir();

    blognifier(tmp.path())
        .arg("list")
        .arg(tmp.path().join("posts"))
        .assert()
        .success()
        .stdout(predicate::str::contains("14/11/2023, 22:13"))
        .stdout(predicate::str::contains("Page 1 (2 posts)"));
}

#[test]
fn list_json_pages() {
    let tmp = blog_dir();

    blognifier(tmp.path())
        .args(["list", "--json", "--page-size", "1", "--page", "2"])
        .arg(tmp.path().join("posts"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"a\""))
        .stdout(predicate::str::contains("\"has_prev\": true"))
        .stdout(predicate::str::contains("\"has_next\": false"))
        .stdout(predicate::str::contains("\"total_count\": 2"));
}

#[test]
fn search_matches_all_terms() {
    let tmp = blog_dir();
    let posts = tmp.path().join("posts");

    let output = blognifier(tmp.path())
        .args(["search", "world", "--quiet"])
        .arg(&posts)
        .output()
        .unwrap();
    assert!(output.status.success());
    let mut titles: Vec<String> =
        String::from_utf8(output.stdout).unwrap().lines().map(String::from).collect();
    titles.sort();
    assert_eq!(titles, vec!["a", "b"]);

    blognifier(tmp.path())
        .args(["search", "hello world", "--quiet"])
        .arg(&posts)
        .assert()
        .success()
        .stdout("a\n");
}

#[test]
fn search_json_marks_highlights() {
    let tmp = blog_dir();

    blognifier(tmp.path())
        .args(["search", "hello", "--json"])
        .arg(tmp.path().join("posts"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"highlight\": \"[hello] world\""));
}

#[test]
fn search_rejects_blank_query() {
    let tmp = blog_dir();

    blognifier(tmp.path())
        .args(["search", "   "])
        .arg(tmp.path().join("posts"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error searching"));
}

#[test]
fn deleted_post_disappears() {
    let tmp = blog_dir();
    let posts = tmp.path().join("posts");

    blognifier(tmp.path()).args(["list", "--quiet"]).arg(&posts).assert().success();

    fs::remove_file(posts.join("b.md")).unwrap();
    fs::File::open(&posts)
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_secs(1_700_000_200))
        .unwrap();

    blognifier(tmp.path())
        .args(["search", "world", "--quiet"])
        .arg(&posts)
        .assert()
        .success()
        .stdout("a\n");
}

#[test]
fn cache_dir_override_holds_index() {
    let tmp = blog_dir();
    let cache = tmp.path().join("custom-cache");

    blognifier(tmp.path())
        .args(["list", "--quiet", "--cache-dir"])
        .arg(&cache)
        .arg(tmp.path().join("posts"))
        .assert()
        .success();

    assert!(cache.join("blog.sqlite").exists());
}

#[test]
fn missing_posts_dir_fails() {
    let tmp = tempdir().unwrap();

    blognifier(tmp.path())
        .arg("list")
        .arg(tmp.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
