//! Runs the parser over the shared conformance fixtures.
//!
//! `conformance/positive/*.rdm` must parse and expand cleanly.
//! `conformance/negative/*.rdm` must produce exactly the diagnostics listed
//! in the sibling `.expected-errors.json`.

use std::path::{Path, PathBuf};

use redmatch_core::{expand_repeats, parse, parse_recovering, DEFAULT_MAX_ERRORS};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct ExpectedError {
    line: u32,
    column: u32,
    message: String,
}

fn conformance_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../conformance")
}

fn collect_rdm_files(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", dir.display(), e))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "rdm"))
        .collect();
    paths.sort();
    paths
}

#[test]
fn positive_fixtures_parse_and_expand() {
    let files = collect_rdm_files(&conformance_root().join("positive"));
    assert!(!files.is_empty(), "no positive fixtures found");

    let mut failures = Vec::new();
    for path in &files {
        let src = std::fs::read_to_string(path).unwrap();
        match parse(&src) {
            Ok(doc) => {
                if let Err(diags) = expand_repeats(&doc) {
                    failures.push(format!("{}: expansion failed: {:?}", path.display(), diags));
                }
                // Canonical rendering parses back to the same rendering.
                let rendered = doc.to_string();
                match parse(&rendered) {
                    Ok(again) => {
                        if again.to_string() != rendered {
                            failures.push(format!("{}: rendering is unstable", path.display()));
                        }
                    }
                    Err(diags) => failures.push(format!(
                        "{}: rendering does not parse: {:?}\n{}",
                        path.display(),
                        diags,
                        rendered
                    )),
                }
            }
            Err(diags) => failures.push(format!("{}: {:?}", path.display(), diags)),
        }
    }
    assert!(failures.is_empty(), "failures:\n{}", failures.join("\n"));
}

#[test]
fn negative_fixtures_report_expected_errors() {
    let files = collect_rdm_files(&conformance_root().join("negative"));
    assert!(!files.is_empty(), "no negative fixtures found");

    for path in &files {
        let src = std::fs::read_to_string(path).unwrap();
        let expected_path = path.with_extension("expected-errors.json");
        let expected: Vec<ExpectedError> =
            serde_json::from_str(&std::fs::read_to_string(&expected_path).unwrap()).unwrap();

        let outcome = parse_recovering(&src, DEFAULT_MAX_ERRORS);
        let actual: Vec<ExpectedError> = outcome
            .diagnostics
            .iter()
            .map(|d| ExpectedError {
                line: d.start_line,
                column: d.start_col,
                message: d.message.clone(),
            })
            .collect();
        assert_eq!(actual, expected, "diagnostics for {}", path.display());
    }
}

#[test]
fn repeats_fixture_expands_to_three_observations() {
    let src = std::fs::read_to_string(conformance_root().join("positive/repeats.rdm")).unwrap();
    let doc = expand_repeats(&parse(&src).unwrap()).unwrap();
    let aliases: Vec<String> = doc.resources().iter().map(|r| r.alias.to_string()).collect();
    assert_eq!(aliases, vec!["obs1", "obs2", "obs3"]);
    assert_eq!(doc.referenced_fields(), vec!["gene_1", "gene_2", "gene_3"]);
}
