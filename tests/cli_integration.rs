//! CLI integration tests for Pluqqy
//!
//! These tests drive the binary end to end: initializing a library,
//! managing fragments and pipelines, and querying the result.

use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Get a command instance for the pluqqy binary
fn pluqqy_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("pluqqy"));
    cmd.env_remove("PLUQQY_ROOT").env_remove("RUST_LOG");
    cmd
}

/// Create a temporary directory and initialize a library
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    pluqqy_cmd().arg("init").arg(dir.path()).assert().success();
    dir
}

fn run_json(dir: &TempDir, args: &[&str]) -> Value {
    let output = pluqqy_cmd()
        .current_dir(dir.path())
        .args(args)
        .args(["--format", "json"])
        .assert()
        .success();
    serde_json::from_str(&String::from_utf8_lossy(&output.get_output().stdout)).unwrap()
}

fn new_fragment(dir: &TempDir, kind: &str, name: &str, extra: &[&str]) {
    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["new", kind, name])
        .args(extra)
        .assert()
        .success();
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    pluqqy_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized pluqqy library"));

    let lib = dir.path().join(".pluqqy");
    assert!(lib.join("components/contexts").is_dir());
    assert!(lib.join("components/prompts").is_dir());
    assert!(lib.join("components/rules").is_dir());
    assert!(lib.join("pipelines").is_dir());
    assert!(lib.join("archive").is_dir());
    assert!(lib.join("settings.yaml").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    pluqqy_cmd().arg("init").arg(dir.path()).assert().success();
    pluqqy_cmd().arg("init").arg(dir.path()).assert().success();
}

#[test]
fn test_root_flag_skips_discovery() {
    let dir = setup_project();
    let elsewhere = TempDir::new().unwrap();

    pluqqy_cmd()
        .current_dir(elsewhere.path())
        .arg("--root")
        .arg(dir.path())
        .args(["new", "prompt", "Hello"])
        .assert()
        .success();

    assert!(dir.path().join(".pluqqy/components/prompts/hello.md").is_file());
}

#[test]
fn test_commands_work_from_subdirectory() {
    let dir = setup_project();
    let sub = dir.path().join("src/deep");
    fs::create_dir_all(&sub).unwrap();

    pluqqy_cmd()
        .current_dir(&sub)
        .args(["new", "rules", "Style"])
        .assert()
        .success();

    assert!(dir.path().join(".pluqqy/components/rules/style.md").is_file());
}

// =============================================================================
// Fragment Tests
// =============================================================================

#[test]
fn test_new_fragment_writes_frontmatter() {
    let dir = setup_project();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["new", "prompt", "Code Review", "--tag", "Dev", "--body", "Review this."])
        .assert()
        .success()
        .stdout(predicate::str::contains("components/prompts/code-review.md"));

    let content =
        fs::read_to_string(dir.path().join(".pluqqy/components/prompts/code-review.md")).unwrap();
    assert!(content.starts_with("---\n"));
    assert!(content.contains("name: Code Review"));
    assert!(content.contains("- dev"));
    assert!(content.ends_with("Review this."));
}

#[test]
fn test_new_fragment_rejects_md_suffix() {
    let dir = setup_project();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["new", "prompt", "notes.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not include the .md extension"));
}

#[test]
fn test_new_fragment_case_insensitive_clash() {
    let dir = setup_project();
    new_fragment(&dir, "context", "Team", &[]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["new", "context", "TEAM"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Already exists"));
}

#[test]
fn test_show_fragment_json() {
    let dir = setup_project();
    new_fragment(&dir, "context", "Team", &["--body", "We ship weekly", "--tag", "ops"]);

    let json = run_json(&dir, &["show", "team"]);
    assert_eq!(json["fragment"]["display_name"], "Team");
    assert_eq!(json["fragment"]["kind"], "context");
    assert_eq!(json["fragment"]["tags"][0], "ops");
    assert_eq!(json["fragment"]["token_count"], 4);
    assert_eq!(json["token_bucket"], "good");
}

#[test]
fn test_update_fragment() {
    let dir = setup_project();
    new_fragment(&dir, "rules", "Style", &["--tag", "old"]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["update", "style", "--body", "Use tabs", "--tag", "new"])
        .assert()
        .success();

    let json = run_json(&dir, &["show", "components/rules/style.md"]);
    assert_eq!(json["fragment"]["body"], "Use tabs");
    assert_eq!(json["fragment"]["tags"], serde_json::json!(["new"]));

    let tags = run_json(&dir, &["tags"]);
    assert_eq!(tags, serde_json::json!([{ "tag": "new", "count": 1 }]));
}

#[test]
fn test_update_requires_a_change() {
    let dir = setup_project();
    new_fragment(&dir, "rules", "Style", &[]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["update", "style"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to update"));
}

#[test]
fn test_ambiguous_bare_name() {
    let dir = setup_project();
    new_fragment(&dir, "prompt", "shared", &[]);
    new_fragment(&dir, "rules", "shared", &[]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["show", "shared"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ambiguous"));

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["show", "components/rules/shared.md"])
        .assert()
        .success();
}

// =============================================================================
// Archive / Delete Tests
// =============================================================================

#[test]
fn test_archive_and_unarchive_preserve_bytes() {
    let dir = setup_project();
    new_fragment(&dir, "prompt", "Keep", &["--body", "Body\n", "--tag", "x"]);
    let active = dir.path().join(".pluqqy/components/prompts/keep.md");
    let original = fs::read(&active).unwrap();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["archive", "keep"])
        .assert()
        .success()
        .stdout(predicate::str::contains("archive/components/prompts/keep.md"));
    assert!(!active.exists());

    let listed = run_json(&dir, &["list"]);
    assert_eq!(listed["fragments"].as_array().unwrap().len(), 0);
    let archived = run_json(&dir, &["list", "status:archived"]);
    assert_eq!(archived["fragments"].as_array().unwrap().len(), 1);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["unarchive", "archive/components/prompts/keep.md"])
        .assert()
        .success();
    assert_eq!(fs::read(&active).unwrap(), original);
}

#[test]
fn test_delete_reports_dangling_pipelines() {
    let dir = setup_project();
    new_fragment(&dir, "context", "Team", &[]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["pipeline", "new", "Daily", "team"])
        .assert()
        .success();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["delete", "team"])
        .assert()
        .success()
        .stderr(predicate::str::contains("pipelines/daily.yaml still references"));

    let listed = run_json(&dir, &["list"]);
    assert_eq!(listed["fragments"].as_array().unwrap().len(), 0);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["compose", "daily"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("references missing fragment"));
}

#[test]
fn test_delete_missing_item_fails() {
    let dir = setup_project();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["delete", "components/prompts/nothing.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}

// =============================================================================
// Rename / Clone Tests
// =============================================================================

#[test]
fn test_rename_fragment_updates_pipelines() {
    let dir = setup_project();
    new_fragment(&dir, "prompt", "Ask", &["--body", "Question?"]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["pipeline", "new", "Flow", "ask"])
        .assert()
        .success();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["rename", "ask", "Better Ask"])
        .assert()
        .success()
        .stdout(predicate::str::contains("components/prompts/better-ask.md"));

    let pipeline = fs::read_to_string(dir.path().join(".pluqqy/pipelines/flow.yaml")).unwrap();
    assert!(pipeline.contains("../components/prompts/better-ask.md"));

    let usage = run_json(&dir, &["usage", "better-ask"]);
    assert_eq!(usage["count"], 1);
}

#[test]
fn test_clone_to_archive() {
    let dir = setup_project();
    new_fragment(&dir, "rules", "Base", &["--body", "Rule"]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["clone", "base", "Copy", "--archive"])
        .assert()
        .success();

    let copy = dir.path().join(".pluqqy/archive/components/rules/copy.md");
    assert!(fs::read_to_string(copy).unwrap().ends_with("Rule"));
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[test]
fn test_pipeline_groups_by_kind() {
    let dir = setup_project();
    new_fragment(&dir, "prompt", "p1", &[]);
    new_fragment(&dir, "context", "c1", &[]);
    new_fragment(&dir, "prompt", "p2", &[]);
    new_fragment(&dir, "context", "c2", &[]);

    let json = run_json(&dir, &["pipeline", "new", "Mixed", "p1", "c1", "p2", "c2"]);
    let paths: Vec<&str> = json["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["path"].as_str().unwrap())
        .collect();
    assert_eq!(
        paths,
        vec![
            "../components/contexts/c1.md",
            "../components/contexts/c2.md",
            "../components/prompts/p1.md",
            "../components/prompts/p2.md",
        ]
    );
    let orders: Vec<u64> = json["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["order"].as_u64().unwrap())
        .collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
}

#[test]
fn test_pipeline_toggle_and_move() {
    let dir = setup_project();
    new_fragment(&dir, "context", "c1", &[]);
    new_fragment(&dir, "context", "c2", &[]);
    new_fragment(&dir, "prompt", "p1", &[]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["pipeline", "new", "Flow", "c1", "c2"])
        .assert()
        .success();

    let json = run_json(&dir, &["pipeline", "toggle", "flow", "p1"]);
    assert_eq!(json["action"], "added");
    assert_eq!(json["components"].as_array().unwrap().len(), 3);

    // Crossing from contexts into prompts is refused
    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["pipeline", "move", "flow", "2", "down"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"));

    let json = run_json(&dir, &["pipeline", "move", "flow", "2", "up"]);
    assert_eq!(json["components"][0]["path"], "../components/contexts/c2.md");

    let json = run_json(&dir, &["pipeline", "toggle", "flow", "p1"]);
    assert_eq!(json["action"], "removed");
}

#[test]
fn test_pipeline_remove_out_of_range() {
    let dir = setup_project();
    new_fragment(&dir, "context", "c1", &[]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["pipeline", "new", "Flow", "c1"])
        .assert()
        .success();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["pipeline", "remove", "flow", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    let json = run_json(&dir, &["pipeline", "remove", "flow", "1"]);
    assert_eq!(json["removed"], "../components/contexts/c1.md");
    assert!(json["cursor"].is_null());
}

#[test]
fn test_pipeline_remove_uses_shown_position_for_ungrouped_file() {
    let dir = setup_project();
    new_fragment(&dir, "context", "c1", &[]);
    new_fragment(&dir, "rules", "r1", &[]);
    let file = dir.path().join(".pluqqy/pipelines/legacy.yaml");
    fs::write(
        &file,
        "name: Legacy\ncomponents:\n  - type: rules\n    path: ../components/rules/r1.md\n    order: 1\n  - type: context\n    path: ../components/contexts/c1.md\n    order: 2\n",
    )
    .unwrap();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["show", "pipelines/legacy.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1    rules    ../components/rules/r1.md"));

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["pipeline", "remove", "pipelines/legacy.yaml", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed ../components/rules/r1.md"));

    let saved = fs::read_to_string(&file).unwrap();
    assert!(saved.contains("../components/contexts/c1.md"));
    assert!(!saved.contains("r1.md"));
}

#[test]
fn test_compose_out_writes_file() {
    let dir = setup_project();
    new_fragment(&dir, "prompt", "Hello", &["--body", "Hi"]);

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["pipeline", "new", "Greet", "hello"])
        .assert()
        .success();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["compose", "greet", "--out", "build/greet.md"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(dir.path().join("build/greet.md")).unwrap(),
        "## PROMPTS\n\nHi\n"
    );

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["compose", "greet", "--out"])
        .assert()
        .success();
    assert!(dir.path().join("tmp/greet.md").is_file());
}

// =============================================================================
// Search Tests
// =============================================================================

#[test]
fn test_search_filters() {
    let dir = setup_project();
    new_fragment(&dir, "prompt", "Review", &["--tag", "api", "--body", "Check the diff"]);
    new_fragment(&dir, "context", "Service", &["--tag", "api"]);
    new_fragment(&dir, "rules", "Style", &[]);

    let json = run_json(&dir, &["search", "tag:api", "type:prompts"]);
    assert_eq!(json["fragments"].as_array().unwrap().len(), 1);
    assert_eq!(json["fragments"][0]["slug"], "review");

    let json = run_json(&dir, &["search", "DIFF"]);
    assert_eq!(json["fragments"][0]["slug"], "review");

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["search", "nothing-matches-this"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No results found"));
}

#[test]
fn test_query_helpers() {
    pluqqy_cmd()
        .args(["query", "cycle-type", "api", "status:archived", "type:prompts"])
        .assert()
        .success()
        .stdout("api status:archived type:contexts\n");

    pluqqy_cmd()
        .args(["query", "toggle-archived", "api", "status:archived", "test"])
        .assert()
        .success()
        .stdout("api test\n");

    pluqqy_cmd()
        .args(["query", "cycle-type", "--components"])
        .assert()
        .success()
        .stdout("type:prompts\n");
}

// =============================================================================
// Misc
// =============================================================================

#[test]
fn test_settings_shows_defaults() {
    let dir = setup_project();

    pluqqy_cmd()
        .current_dir(dir.path())
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("PLUQQY.md"))
        .stdout(predicate::str::contains("## CONTEXTS"));
}

#[test]
fn test_verbose_flag() {
    let dir = setup_project();

    let output = pluqqy_cmd()
        .current_dir(dir.path())
        .args(["--verbose", "list"])
        .assert()
        .success();

    let stderr = String::from_utf8_lossy(&output.get_output().stderr);
    assert!(stderr.contains("[verbose]"));
}

#[test]
fn test_malformed_file_is_skipped() {
    let dir = setup_project();
    new_fragment(&dir, "prompt", "Good", &[]);
    fs::write(
        dir.path().join(".pluqqy/components/prompts/bad.md"),
        "---\nname: [unclosed\n---\nbody",
    )
    .unwrap();

    let json = run_json(&dir, &["list"]);
    assert_eq!(json["fragments"].as_array().unwrap().len(), 1);
}

#[test]
fn test_edit_without_editor_fails() {
    let dir = setup_project();
    new_fragment(&dir, "prompt", "Draft", &[]);
    let config_home = TempDir::new().unwrap();

    pluqqy_cmd()
        .current_dir(dir.path())
        .env_remove("EDITOR")
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .args(["edit", "draft"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No editor configured"));
}

#[test]
fn test_not_in_project_error() {
    let dir = TempDir::new().unwrap();

    pluqqy_cmd()
        .current_dir(dir.path())
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in a pluqqy project"));
}
