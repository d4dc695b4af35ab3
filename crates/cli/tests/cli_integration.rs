//! CLI integration tests for every subcommand.
//!
//! Uses `assert_cmd` to spawn the `redmatch` binary and verify
//! exit codes, stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative
//! paths to conformance fixtures resolve correctly.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `redmatch` binary, rooted at workspace.
fn redmatch() -> Command {
    let mut cmd = cargo_bin_cmd!("redmatch");
    cmd.current_dir(workspace_root());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_temp(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write temp file");
    path
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    redmatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Redmatch rule language toolchain"));
}

#[test]
fn version_exits_0() {
    redmatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("redmatch"));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    redmatch().assert().failure().code(2);
}

// ──────────────────────────────────────────────
// 2. Parse subcommand
// ──────────────────────────────────────────────

#[test]
fn parse_valid_file_prints_canonical_text() {
    redmatch()
        .args(["parse", "conformance/positive/basic_patient.rdm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VALUE(pat_sex) = 1 {"))
        .stdout(predicate::str::contains(
            "Patient<p> -> gender = CODE_LITERAL(male);",
        ))
        .stdout(predicate::str::contains("} ELSE {"));
}

#[test]
fn parse_json_output_is_a_document() {
    let output = redmatch()
        .args(["--output", "json", "parse", "conformance/positive/operators.rdm"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let rules = json["rules"].as_array().expect("rules array");
    assert_eq!(rules.len(), 2);
}

#[test]
fn parse_negative_fixture_exits_1() {
    redmatch()
        .args(["parse", "conformance/negative/unknown_token.rdm"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "unknown_token.rdm:1:39: error: token recognition error at: '#'",
        ))
        .stderr(predicate::str::contains("error: 1 syntax error(s)"));
}

#[test]
fn parse_nonexistent_file_exits_1() {
    redmatch()
        .args(["parse", "does/not/exist.rdm"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading 'does/not/exist.rdm'"));
}

#[test]
fn parse_json_error_is_an_object() {
    let output = redmatch()
        .args(["--output", "json", "parse", "does/not/exist.rdm"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).expect("valid JSON");
    assert!(json["error"].as_str().expect("error string").contains("exist.rdm"));
}

// ──────────────────────────────────────────────
// 3. Check subcommand
// ──────────────────────────────────────────────

#[test]
fn check_valid_file_reports_ok() {
    redmatch()
        .args(["check", "conformance/positive/nested_rules.rdm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nested_rules.rdm: ok"));
}

#[test]
fn check_quiet_prints_nothing() {
    redmatch()
        .args(["--quiet", "check", "conformance/negative/missing_brace.rdm"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn check_lists_diagnostics_on_stdout() {
    redmatch()
        .args(["check", "conformance/negative/missing_value.rdm"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains(
            "missing_value.rdm:1:31: error: no viable alternative at input ';'",
        ));
}

#[test]
fn check_json_output_lists_diagnostics() {
    let output = redmatch()
        .args(["--output", "json", "check", "conformance/negative/reversed_repeat.rdm"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let diags = json["diagnostics"].as_array().expect("diagnostics array");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0]["start_line"], 1);
    assert_eq!(diags[0]["start_col"], 0);
    assert_eq!(diags[0]["severity"], "ERROR");
    assert_eq!(
        diags[0]["message"],
        "Invalid repeat range 5..1: start is greater than end"
    );
}

// ──────────────────────────────────────────────
// 4. Tokens subcommand
// ──────────────────────────────────────────────

#[test]
fn tokens_text_lists_scopes_per_line() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_temp(&dir, "t.rdm", "TRUE {}\n#\n");
    redmatch()
        .arg("tokens")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1: 0:true.rdm 4:ws.rdm 5:open_curly.rdm 6:close_curly.rdm",
        ))
        .stdout(predicate::str::contains("2: 0:error.rdm"));
}

#[test]
fn tokens_json_uses_camel_case() {
    let output = redmatch()
        .args(["--output", "json", "tokens", "conformance/positive/repeats.rdm"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let lines = json.as_array().expect("array");
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0]["line"], 1);
    assert_eq!(lines[0]["tokens"][0]["startIndex"], 0);
    assert_eq!(lines[0]["tokens"][0]["scopes"], "line_comment.rdm");
    assert_eq!(lines[1]["tokens"][0]["scopes"], "repeat.rdm");
}

// ──────────────────────────────────────────────
// 5. Markers subcommand
// ──────────────────────────────────────────────

#[test]
fn markers_from_document_shift_columns() {
    let output = redmatch()
        .args(["--output", "json", "markers", "conformance/negative/unknown_token.rdm"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let markers = json.as_array().expect("array");
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0]["startLineNumber"], 1);
    assert_eq!(markers[0]["startColumn"], 39);
    assert_eq!(markers[0]["endColumn"], 40);
    assert_eq!(markers[0]["severity"], "error");
}

#[test]
fn markers_from_issue_list() {
    let dir = TempDir::new().expect("tempdir");
    let issues = write_temp(
        &dir,
        "issues.json",
        r#"[
            {"rowStart": 2, "colStart": 4, "rowEnd": 2, "colEnd": 9, "text": "Unknown resource", "severity": "ERROR"},
            {"rowStart": 3, "colStart": 0, "rowEnd": 3, "colEnd": 1, "text": "Unused rule", "severity": "INFO"}
        ]"#,
    );
    redmatch()
        .arg("markers")
        .arg("--issues")
        .arg(&issues)
        .assert()
        .success()
        .stdout(predicate::str::contains("2:5-2:10 error Unknown resource"))
        .stdout(predicate::str::contains("3:1-3:2 warning Unused rule"));
}

#[test]
fn markers_bad_issue_json_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    let issues = write_temp(&dir, "issues.json", "{ not json");
    redmatch()
        .arg("markers")
        .arg("--issues")
        .arg(&issues)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn markers_requires_an_input() {
    redmatch().arg("markers").assert().failure().code(2);
}

// ──────────────────────────────────────────────
// 6. Expand subcommand
// ──────────────────────────────────────────────

#[test]
fn expand_unrolls_repeat_clauses() {
    redmatch()
        .args(["expand", "conformance/positive/repeats.rdm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NOTNULL(gene_1)"))
        .stdout(predicate::str::contains("NOTNULL(gene_3)"))
        .stdout(predicate::str::contains("Observation<obs2> ->"))
        .stdout(predicate::str::contains("CONCEPT_SELECTED(gene_2)"))
        .stdout(predicate::str::contains("REPEAT").not());
}

#[test]
fn expand_unknown_variable_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_temp(&dir, "bad.rdm", "REPEAT(1..2: i) NOTNULL(x_${j}) {}\n");
    redmatch()
        .arg("expand")
        .arg(&file)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("The variable 'j' was not found"));
}

// ──────────────────────────────────────────────
// 7. Configuration
// ──────────────────────────────────────────────

#[test]
fn config_sets_output_format() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_temp(&dir, "redmatch.toml", "[output]\nformat = \"json\"\n");
    let output = redmatch()
        .arg("--config")
        .arg(&config)
        .args(["check", "conformance/positive/basic_patient.rdm"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["diagnostics"], serde_json::json!([]));
}

#[test]
fn flag_overrides_config_output_format() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_temp(&dir, "redmatch.toml", "[output]\nformat = \"json\"\n");
    redmatch()
        .arg("--config")
        .arg(&config)
        .args(["--output", "text", "check", "conformance/positive/basic_patient.rdm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("basic_patient.rdm: ok"));
}

#[test]
fn config_max_errors_caps_diagnostics() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_temp(&dir, "redmatch.toml", "[parser]\nmax_errors = 1\n");
    let file = write_temp(&dir, "many.rdm", "# # #\n");
    let output = redmatch()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&file)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(stdout.lines().count(), 1);
}

#[test]
fn invalid_config_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_temp(&dir, "redmatch.toml", "[log]\nlevel = \"loud\"\n");
    redmatch()
        .arg("--config")
        .arg(&config)
        .args(["check", "conformance/positive/basic_patient.rdm"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid configuration"))
        .stderr(predicate::str::contains("unknown log level 'loud'"));
}

#[test]
fn missing_explicit_config_exits_1() {
    redmatch()
        .args(["--config", "no/such/redmatch.toml"])
        .args(["check", "conformance/positive/basic_patient.rdm"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading 'no/such/redmatch.toml'"));
}
