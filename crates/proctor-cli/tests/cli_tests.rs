//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FULL_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><title>Mock</title></head>
<body>
  <!-- header -->
  <header><nav><a href="/">Home</a></nav></header>
  <main>
    <h1>Welcome</h1>
    <ul><li>One</li><li>Two</li><li>Three</li></ul>
    <a href="https://developer.mozilla.org/">MDN Web Docs</a>
    <img src="logo.png" alt="Logo">
    <table>
      <tr><th>Name</th><th>Age</th></tr>
      <tr><td>Ann</td><td>30</td></tr>
      <tr><td>Bob</td><td>41</td></tr>
    </table>
    <form>
      <label>Name <input type="text" required></label>
      <label>Email <input type="email"></label>
      <label>Password <input type="password"></label>
      <button type="submit">Sign up</button>
    </form>
  </main>
  <!-- footer -->
  <footer>Bye</footer>
</body>
</html>"#;

fn proctor() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("proctor").unwrap()
}

/// A command running in `dir`, with the autosave slot kept inside it.
fn proctor_in(dir: &Path) -> Command {
    let mut cmd = proctor();
    cmd.current_dir(dir)
        .env("PROCTOR_STORE_PATH", dir.join("store.json"));
    cmd
}

fn json_files(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn validate_lists_rubric() {
    proctor()
        .arg("validate")
        .arg("--rubric")
        .arg("../../rubrics/lists.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("HTML Lists [lists] (4 rules, 35 points)"))
        .stdout(predicate::str::contains("All rubrics valid"));
}

#[test]
fn validate_directory() {
    proctor()
        .arg("validate")
        .arg("--rubric")
        .arg("../../rubrics")
        .assert()
        .success()
        .stdout(predicate::str::contains("HTML Forms"))
        .stdout(predicate::str::contains("HTML Lists"));
}

#[test]
fn validate_builtin_copy() {
    proctor()
        .arg("validate")
        .arg("--rubric")
        .arg("../proctor-core/rubrics/html.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("14 rules, 105 points"));
}

#[test]
fn validate_nonexistent_file() {
    proctor()
        .arg("validate")
        .arg("--rubric")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weak.toml");
    std::fs::write(
        &path,
        r#"
[category]
id = "weak"
title = "Weak"

[[rules]]
key = "any-p"
points = 1
[rules.check]
type = "element"
tag = "p"
min_count = 0
"#,
    )
    .unwrap();

    proctor()
        .arg("validate")
        .arg("--rubric")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[any-p] WARNING"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_rejects_duplicate_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dupes.toml");
    std::fs::write(
        &path,
        r#"
[category]
id = "dupes"
title = "Dupes"

[[rules]]
key = "same"
points = 1
[rules.check]
type = "doctype"

[[rules]]
key = "same"
points = 1
[rules.check]
type = "comments"
"#,
    )
    .unwrap();

    proctor()
        .arg("validate")
        .arg("--rubric")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate rule key 'same'"));
}

#[test]
fn categories_lists_builtin_and_overlay() {
    let dir = TempDir::new().unwrap();
    proctor_in(dir.path())
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("HTML Mock Test"))
        .stdout(predicate::str::contains("60 min"));

    proctor()
        .arg("categories")
        .arg("--rubrics")
        .arg("../../rubrics")
        .assert()
        .success()
        .stdout(predicate::str::contains("html"))
        .stdout(predicate::str::contains("forms"))
        .stdout(predicate::str::contains("15 min"));
}

#[test]
fn grade_full_page_passes() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(&page, FULL_PAGE).unwrap();

    proctor_in(dir.path())
        .arg("grade")
        .arg("--document")
        .arg(&page)
        .arg("--require-pass")
        .assert()
        .success()
        .stdout(predicate::str::contains("unordered-list"))
        .stdout(predicate::str::contains("100.0%"))
        .stdout(predicate::str::contains("passed"));
}

#[test]
fn grade_empty_page_fails_threshold() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("empty.html");
    std::fs::write(&page, "").unwrap();

    proctor_in(dir.path())
        .arg("grade")
        .arg("--document")
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("0.0%"))
        .stdout(predicate::str::contains("FAIL"));

    proctor_in(dir.path())
        .arg("grade")
        .arg("--document")
        .arg(&page)
        .arg("--require-pass")
        .assert()
        .failure();
}

#[test]
fn grade_writes_report_files() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(&page, "<ul><li>a</li><li>b</li><li>c</li></ul>").unwrap();
    let out = dir.path().join("out");

    proctor_in(dir.path())
        .arg("grade")
        .arg("--document")
        .arg(&page)
        .arg("--format")
        .arg("all")
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("HTML report"))
        .stderr(predicate::str::contains("SARIF report"));

    let names: Vec<String> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| n.starts_with("attempt-html-")));
}

#[test]
fn grade_unknown_category_fails() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(&page, "<p></p>").unwrap();

    proctor_in(dir.path())
        .arg("grade")
        .arg("--document")
        .arg(&page)
        .arg("--category")
        .arg("css")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no rubric available for category 'css'"));
}

#[test]
fn grade_with_overlay_category() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("lists.html");
    std::fs::write(
        &page,
        "<ol><li>one</li><li>two</li><li>three<ul><li>sub</li></ul></li></ol>",
    )
    .unwrap();

    proctor_in(dir.path())
        .arg("grade")
        .arg("--document")
        .arg(&page)
        .arg("--category")
        .arg("lists")
        .arg("--rubrics")
        .arg(Path::new(env!("CARGO_MANIFEST_DIR")).join("../../rubrics"))
        .assert()
        .success()
        .stdout(predicate::str::contains("numbered-steps"))
        .stdout(predicate::str::contains("lists: 57.1%"));
}

#[test]
fn grade_missing_document_fails() {
    let dir = TempDir::new().unwrap();
    proctor_in(dir.path())
        .arg("grade")
        .arg("--document")
        .arg("missing.html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read document"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    proctor()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created proctor.toml"))
        .stdout(predicate::str::contains("Created rubrics/html.toml"));

    assert!(dir.path().join("proctor.toml").exists());
    assert!(dir.path().join("rubrics/html.toml").exists());

    proctor()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping"));

    proctor()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--rubric")
        .arg("rubrics")
        .assert()
        .success()
        .stdout(predicate::str::contains("All rubrics valid"));
}

#[test]
fn session_submit_grades_the_file() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(&page, FULL_PAGE).unwrap();
    let out = dir.path().join("out");

    proctor_in(dir.path())
        .arg("session")
        .arg("--document")
        .arg(&page)
        .arg("--minutes")
        .arg("5")
        .arg("--output")
        .arg(&out)
        .write_stdin("status\nsubmit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("html: 100.0%"))
        .stdout(predicate::str::contains("submitted"))
        .stderr(predicate::str::contains("05:00"));

    let records = json_files(&out);
    assert_eq!(records.len(), 1);
    let json = std::fs::read_to_string(&records[0]).unwrap();
    assert!(json.contains("\"reason\": \"user_submitted\""));
    assert!(json.contains("\"budget_seconds\": 300"));
}

#[test]
fn session_ends_on_third_violation() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(&page, "<h1>draft</h1>").unwrap();
    let out = dir.path().join("out");

    proctor_in(dir.path())
        .arg("session")
        .arg("--document")
        .arg(&page)
        .arg("--minutes")
        .arg("5")
        .arg("--output")
        .arg(&out)
        .write_stdin("away\naway\naway\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("integrity violation"))
        .stderr(predicate::str::contains("WARNING: left the test (1/3)"))
        .stderr(predicate::str::contains("WARNING: left the test (2/3)"));

    let records = json_files(&out);
    assert_eq!(records.len(), 1);
    let json = std::fs::read_to_string(&records[0]).unwrap();
    assert!(json.contains("\"violation_count\": 3"));
}

#[test]
fn session_rejects_zero_budget() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(&page, "").unwrap();

    proctor_in(dir.path())
        .arg("session")
        .arg("--document")
        .arg(&page)
        .arg("--minutes")
        .arg("0")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn session_quit_keeps_autosave_for_restore() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(&page, "<p>work in progress</p>").unwrap();

    proctor_in(dir.path())
        .arg("session")
        .arg("--document")
        .arg(&page)
        .arg("--minutes")
        .arg("5")
        .write_stdin("quit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Session stopped"));

    proctor_in(dir.path())
        .arg("restore")
        .assert()
        .success()
        .stdout(predicate::str::contains("work in progress"));

    proctor_in(dir.path())
        .arg("restore")
        .arg("--category")
        .arg("css")
        .assert()
        .success()
        .stderr(predicate::str::contains("No autosave for category 'css'"));

    proctor_in(dir.path())
        .arg("restore")
        .arg("--discard")
        .assert()
        .success()
        .stderr(predicate::str::contains("Discarded"));

    proctor_in(dir.path())
        .arg("restore")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn compare_detects_regressions() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.html");
    let bad = dir.path().join("bad.html");
    std::fs::write(&good, FULL_PAGE).unwrap();
    std::fs::write(&bad, FULL_PAGE.replace("<!DOCTYPE html>", "")).unwrap();

    for (page, out) in [(&good, "baseline"), (&bad, "current")] {
        proctor_in(dir.path())
            .arg("grade")
            .arg("--document")
            .arg(page)
            .arg("--format")
            .arg("json")
            .arg("--output")
            .arg(dir.path().join(out))
            .assert()
            .success();
    }
    let baseline = json_files(&dir.path().join("baseline")).remove(0);
    let current = json_files(&dir.path().join("current")).remove(0);

    proctor()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 newly failed"))
        .stdout(predicate::str::contains("doctype"));

    proctor()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .arg("--format")
        .arg("markdown")
        .assert()
        .success()
        .stdout(predicate::str::contains("### Newly failed"));

    proctor()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .arg("--fail-on-regression")
        .assert()
        .failure();

    proctor()
        .arg("compare")
        .arg("--baseline")
        .arg(&current)
        .arg("--current")
        .arg(&baseline)
        .arg("--fail-on-regression")
        .assert()
        .success()
        .stdout(predicate::str::contains("+4.8%"));
}

#[test]
fn compare_missing_file_fails() {
    proctor()
        .arg("compare")
        .arg("--baseline")
        .arg("nonexistent.json")
        .arg("--current")
        .arg("nonexistent.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}
