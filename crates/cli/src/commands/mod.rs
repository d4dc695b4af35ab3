pub(crate) mod check;
pub(crate) mod expand;
pub(crate) mod markers;
pub(crate) mod parse;
pub(crate) mod tokens;

use std::path::Path;

use redmatch_core::{Diagnostic, RedmatchError};
use serde::Serialize;

use crate::{OutputFormat, Settings};

pub(crate) fn read_source(path: &Path) -> Result<String, RedmatchError> {
    std::fs::read_to_string(path).map_err(|e| RedmatchError::io(path.display().to_string(), e))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), RedmatchError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `file:line:col: severity: message`, with a 1-based column for humans.
pub(crate) fn format_diagnostic(file: &Path, d: &Diagnostic) -> String {
    format!(
        "{}:{}:{}: {}: {}",
        file.display(),
        d.start_line,
        d.start_col.saturating_add(1),
        d.severity,
        d.message
    )
}

/// Report diagnostics that stop a command, on stderr.
pub(crate) fn report_diagnostics(
    file: &Path,
    diagnostics: &[Diagnostic],
    settings: Settings,
) -> RedmatchError {
    if !settings.quiet {
        match settings.output {
            OutputFormat::Text => {
                for d in diagnostics {
                    eprintln!("{}", format_diagnostic(file, d));
                }
            }
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "file": file.display().to_string(),
                    "diagnostics": diagnostics,
                });
                eprintln!("{}", value);
            }
        }
    }
    RedmatchError::Syntax {
        count: diagnostics.iter().filter(|d| d.is_error()).count(),
    }
}
