mod common;

use common::{CommandOutput, TestContext, REPO};
use std::fs;

#[test]
fn test_help_and_version() {
    let ctx = TestContext::new();

    let output: CommandOutput = ctx
        .cmd()
        .arg("--help")
        .output()
        .expect("Failed to run mcsite")
        .into();

    output
        .assert_success()
        .assert_stdout_contains("Release, changelog and download resolver")
        .assert_stdout_contains("Usage: mcsite");

    ctx.run(&["version"])
        .assert_success()
        .assert_stdout_contains("mcsite v");
}

#[test]
fn test_compare_versions() {
    let ctx = TestContext::new();
    let compare = |args: &[&str]| {
        let mut full = vec!["compare"];
        full.extend_from_slice(args);
        let output = ctx.run(&full);
        output.assert_success();
        output.stdout.trim().to_string()
    };

    assert_eq!(compare(&["1.10.0", "1.2.0"]), "1");
    assert_eq!(compare(&["1.2.0", "1.10.0"]), "-1");
    assert_eq!(compare(&["1.2", "1.2.0"]), "-1");
    assert_eq!(compare(&["1.2", "1.2.0", "--zero-extend"]), "0");
    assert_eq!(compare(&["1.a.0", "1.0.0"]), "NaN");
    assert_eq!(compare(&["1.2b", "1.2a", "--lexicographical"]), "1");
}

#[test]
fn test_config_show_formats() {
    let ctx = TestContext::new();

    ctx.run(&["config", "set", "rate-limit-threshold", "5"])
        .assert_success();

    let output = ctx.run(&["config", "show", "--format", "json"]);
    output.assert_success();
    let value: serde_json::Value =
        serde_json::from_str(&output.stdout).expect("Output was not valid JSON");
    assert_eq!(value["rate_limit_threshold"], 5);

    let output = ctx.run(&["config", "show", "--format", "yaml"]);
    output.assert_success();
    let _: serde_yaml::Value =
        serde_yaml::from_str(&output.stdout).expect("Output was not valid YAML");
    output.assert_stdout_contains("eviction: clear-on-reset");
}

#[test]
fn test_config_get_set_unset() {
    let ctx = TestContext::new();

    ctx.run(&["config", "set", "eviction=clear-prefixed"])
        .assert_success();
    ctx.run(&["config", "get", "eviction"])
        .assert_success()
        .assert_stdout_contains("clear-prefixed");

    ctx.run(&["config", "unset", "eviction"]).assert_success();
    ctx.run(&["config", "get", "eviction"])
        .assert_success()
        .assert_stdout_contains("clear-on-reset");

    ctx.run(&["config", "set", "eviction=sometimes"])
        .assert_failure();
    ctx.run(&["config", "get", "no-such-key"]).assert_failure();

    let saved = fs::read_to_string(&ctx.config_path).expect("Config was not saved");
    assert!(saved.contains("\"eviction\": \"clear-on-reset\""));
}

#[test]
fn test_nav_marks_current_page() {
    let ctx = TestContext::with_site();

    let output = ctx.run(&["nav", "--page", "/downloads.html"]);
    output
        .assert_success()
        .assert_stdout_contains("MCEdit Fork - Downloads")
        .assert_stdout_contains(" * Downloads  /downloads.html");
    assert!(!output.stdout.contains("Drafts"));
}

#[test]
fn test_latest_release_heads() {
    let ctx = TestContext::with_site();

    ctx.run(&["latest"])
        .assert_success()
        .assert_stdout_contains("Latest release: 1.5.0.0")
        .assert_stdout_contains("Latest pre-release: 1.10.0.0");
}

#[test]
fn test_download_resolution() {
    let ctx = TestContext::with_site();

    ctx.run(&["download", "--platform", "win", "--bits", "32"])
        .assert_success()
        .assert_stdout_contains("https://dl.invalid/1.5/win32.zip");

    ctx.run(&["download", "--platform", "lin", "--bits", "universal"])
        .assert_success()
        .assert_stdout_contains("https://dl.invalid/1.5/lin.run");

    // Older assets are still found when the version is named explicitly
    ctx.run(&[
        "download",
        "--platform",
        "osx",
        "--bits",
        "64",
        "--version",
        "1.4.0.1",
    ])
    .assert_success()
    .assert_stdout_contains("https://dl.invalid/1.4/osx.zip");

    ctx.run(&["download", "--platform", "osx", "--bits", "64"])
        .assert_failure()
        .assert_stderr_contains("No Download Found");

    ctx.run(&["download", "--platform", "amiga"]).assert_failure();
}

#[test]
fn test_downloads_and_changelog() {
    let ctx = TestContext::with_site();
    ctx.write_site("comments.json", r#"{"1.5.0.0": "https://forum.invalid/t/15"}"#);

    ctx.run(&["downloads"])
        .assert_success()
        .assert_stdout_contains("Version 1.5.0.0 32bit: https://dl.invalid/1.5/win32.zip")
        .assert_stdout_contains("Version 1.5.0.0 64bit: https://dl.invalid/1.5/win64.zip")
        .assert_stdout_contains("Version 1.5.0.0 32/64bit: https://dl.invalid/1.5/lin.run")
        .assert_stdout_contains("No Download Found");

    let output = ctx.run(&["changelog"]);
    output
        .assert_success()
        .assert_stdout_contains("Discuss: https://forum.invalid/t/15")
        .assert_stdout_contains("@podshot <https://github.com/podshot>");
    let newest = output.stdout.find("1.10.0.0").expect("missing 1.10.0.0");
    let stable = output.stdout.find("1.5.0.0").expect("missing 1.5.0.0");
    let oldest = output.stdout.find("1.4.0.1").expect("missing 1.4.0.1");
    assert!(newest < stable && stable < oldest);
}

#[test]
fn test_page_renders_every_section() {
    let ctx = TestContext::with_site();

    ctx.run(&["page", "--page", "/index.html"])
        .assert_success()
        .assert_stdout_contains("MCEdit Fork - Home")
        .assert_stdout_contains("Latest release: 1.5.0.0")
        .assert_stdout_contains("Windows")
        .assert_stdout_contains("MCEdit 1.10 beta");
}

#[test]
fn test_responses_are_cached_until_refresh() {
    let ctx = TestContext::with_site();
    let releases = format!("repos/{}/releases", REPO);

    ctx.run(&["latest"])
        .assert_success()
        .assert_stdout_contains("Latest release: 1.5.0.0");

    ctx.write_api(&releases, r#"[{"tag_name": "2.0.0.0"}]"#);
    ctx.run(&["latest"])
        .assert_success()
        .assert_stdout_contains("Latest release: 1.5.0.0");

    ctx.run(&["--refresh", "latest"])
        .assert_success()
        .assert_stdout_contains("Latest release: 2.0.0.0");
}

#[test]
fn test_cache_list_evict_and_clear() {
    let ctx = TestContext::with_site();

    ctx.run(&["cache", "list"])
        .assert_success()
        .assert_stdout_contains("No cached responses.");

    ctx.run(&["nav"]).assert_success();
    ctx.run(&["latest"]).assert_success();
    assert!(ctx.cache_file().exists());

    let output = ctx.run(&["cache", "list"]);
    output
        .assert_success()
        .assert_stdout_contains("navbar.json")
        .assert_stdout_contains("/releases");
    assert!(!output.stdout.contains("rate_limit"));

    ctx.run(&["cache", "evict", "navbar.json"])
        .assert_success()
        .assert_stdout_contains("Evicted navbar.json");
    ctx.run(&["cache", "evict", "navbar.json"])
        .assert_success()
        .assert_stdout_contains("navbar.json was not cached");

    ctx.run(&["cache", "clear"])
        .assert_success()
        .assert_stdout_contains("Cleared 1 cached response(s)");
}

#[test]
fn test_rate_limit_status() {
    let ctx = TestContext::with_site();

    ctx.run(&["rate-limit"])
        .assert_success()
        .assert_stdout_contains("Limit: 60")
        .assert_stdout_contains("Remaining: 42");
}

#[test]
fn test_fresh_window_clears_cache_at_authenticated_limit() {
    let ctx = TestContext::with_site();
    let releases = format!("repos/{}/releases", REPO);

    ctx.run(&["latest"])
        .assert_success()
        .assert_stdout_contains("Latest release: 1.5.0.0");
    ctx.write_api(&releases, r#"[{"tag_name": "2.0.0.0"}]"#);

    ctx.write_api(
        "rate_limit",
        r#"{"rate": {"limit": 5000, "remaining": 4999, "reset": 4102444800, "used": 1}}"#,
    );
    ctx.run(&["page"])
        .assert_success()
        .assert_stdout_contains("Latest release: 1.5.0.0");

    ctx.write_api(
        "rate_limit",
        r#"{"rate": {"limit": 5000, "remaining": 5000, "reset": 4102444800, "used": 0}}"#,
    );
    ctx.run(&["page"])
        .assert_success()
        .assert_stdout_contains("Latest release: 2.0.0.0");
}

#[test]
fn test_exhausted_rate_limit_reports_reset() {
    let ctx = TestContext::with_site();
    ctx.write_api(
        &format!("repos/{}/releases", REPO),
        r#"{"message": "API rate limit exceeded for 203.0.113.7."}"#,
    );
    ctx.write_api(
        "rate_limit",
        r#"{"rate": {"limit": 60, "remaining": 0, "reset": 4102444800, "used": 60}}"#,
    );

    ctx.run(&["page"])
        .assert_failure()
        .assert_stderr_contains("Rate limit exceeded");

    // The failed response never reaches the cache
    let output = ctx.run(&["cache", "list"]);
    output.assert_success();
    assert!(!output.stdout.contains("/releases"));
}

#[test]
fn test_repeated_failures_suggest_reporting() {
    let ctx = TestContext::with_site();
    ctx.write_site("navbar.json", "{ not json");
    ctx.run(&["config", "set", "report-issue-threshold=1"])
        .assert_success();

    let first = ctx.run(&["page"]);
    first
        .assert_failure()
        .assert_stderr_contains("Error loading page");
    assert!(!first.stderr.contains("/issues/new"));

    ctx.run(&["page"])
        .assert_failure()
        .assert_stderr_contains("/issues/new");

    // Fixing the file is enough since the broken copy was dropped. A
    // successful load resets the count, so the next failure starts over.
    ctx.write_site("navbar.json", common::NAVBAR);
    ctx.run(&["page"]).assert_success();

    ctx.write_site("navbar.json", "{ not json");
    let again = ctx.run(&["--refresh", "page"]);
    again.assert_failure();
    assert!(!again.stderr.contains("/issues/new"));
}
