use std::path::Path;

use redmatch_core::{expand_repeats, parse_recovering, RedmatchError};

use super::{print_json, read_source, report_diagnostics};
use crate::{OutputFormat, Settings};

pub(crate) fn cmd_expand(file: &Path, settings: Settings) -> Result<(), RedmatchError> {
    let src = read_source(file)?;
    let outcome = parse_recovering(&src, settings.max_errors);
    if outcome.has_errors() {
        return Err(report_diagnostics(file, &outcome.diagnostics, settings));
    }
    let expanded = expand_repeats(&outcome.document)
        .map_err(|diagnostics| report_diagnostics(file, &diagnostics, settings))?;
    match settings.output {
        OutputFormat::Json => print_json(&expanded)?,
        OutputFormat::Text => print!("{}", expanded),
    }
    Ok(())
}
