use std::path::Path;

use redmatch_core::{
    issue_to_marker, parse_recovering, to_markers, Issue, Marker, MarkerSeverity, RedmatchError,
};

use super::{print_json, read_source};
use crate::{OutputFormat, Settings};

/// Markers for a document's parse diagnostics, or for an external issue
/// list when `issues` is given.
pub(crate) fn cmd_markers(
    file: Option<&Path>,
    issues: Option<&Path>,
    settings: Settings,
) -> Result<(), RedmatchError> {
    let markers: Vec<Marker> = match (file, issues) {
        (_, Some(path)) => {
            let issues: Vec<Issue> = serde_json::from_str(&read_source(path)?)?;
            issues.iter().map(issue_to_marker).collect()
        }
        (Some(file), None) => {
            let src = read_source(file)?;
            to_markers(&parse_recovering(&src, settings.max_errors).diagnostics)
        }
        (None, None) => Vec::new(),
    };

    match settings.output {
        OutputFormat::Json => print_json(&markers)?,
        OutputFormat::Text => {
            for m in &markers {
                let severity = match m.severity {
                    MarkerSeverity::Error => "error",
                    MarkerSeverity::Warning => "warning",
                };
                println!(
                    "{}:{}-{}:{} {} {}",
                    m.start_line_number,
                    m.start_column,
                    m.end_line_number,
                    m.end_column,
                    severity,
                    m.message
                );
            }
        }
    }
    Ok(())
}
