use std::path::Path;

use redmatch_core::{parse_recovering, RedmatchError};
use tracing::debug;

use super::{format_diagnostic, print_json, read_source};
use crate::{OutputFormat, Settings};

pub(crate) fn cmd_check(file: &Path, settings: Settings) -> Result<(), RedmatchError> {
    let src = read_source(file)?;
    let outcome = parse_recovering(&src, settings.max_errors);
    debug!(file = %file.display(), diagnostics = outcome.diagnostics.len(), "checked");

    if !settings.quiet {
        match settings.output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "file": file.display().to_string(),
                "diagnostics": outcome.diagnostics,
            }))?,
            OutputFormat::Text => {
                for d in &outcome.diagnostics {
                    println!("{}", format_diagnostic(file, d));
                }
                if outcome.diagnostics.is_empty() {
                    println!("{}: ok", file.display());
                }
            }
        }
    }

    let errors = outcome.diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        Err(RedmatchError::Syntax { count: errors })
    } else {
        Ok(())
    }
}
