use std::path::Path;

use redmatch_core::{parse_recovering, RedmatchError};

use super::{print_json, read_source, report_diagnostics};
use crate::{OutputFormat, Settings};

pub(crate) fn cmd_parse(file: &Path, settings: Settings) -> Result<(), RedmatchError> {
    let src = read_source(file)?;
    let outcome = parse_recovering(&src, settings.max_errors);
    if outcome.has_errors() {
        return Err(report_diagnostics(file, &outcome.diagnostics, settings));
    }
    match settings.output {
        OutputFormat::Json => print_json(&outcome.document)?,
        OutputFormat::Text => print!("{}", outcome.document),
    }
    Ok(())
}
