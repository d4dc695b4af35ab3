use std::path::Path;

use redmatch_core::{tokens_for_line, LineTokens, RedmatchError};
use serde::Serialize;

use super::{print_json, read_source};
use crate::{OutputFormat, Settings};

#[derive(Serialize)]
struct NumberedLine {
    line: usize,
    #[serde(flatten)]
    tokens: LineTokens,
}

pub(crate) fn cmd_tokens(file: &Path, settings: Settings) -> Result<(), RedmatchError> {
    let src = read_source(file)?;
    let lines: Vec<NumberedLine> = src
        .lines()
        .enumerate()
        .map(|(i, line)| NumberedLine {
            line: i + 1,
            tokens: tokens_for_line(line),
        })
        .collect();

    match settings.output {
        OutputFormat::Json => print_json(&lines)?,
        OutputFormat::Text => {
            for l in &lines {
                let rendered: Vec<String> = l
                    .tokens
                    .tokens
                    .iter()
                    .map(|t| format!("{}:{}", t.start_index, t.scopes))
                    .collect();
                println!("{}: {}", l.line, rendered.join(" "));
            }
        }
    }
    Ok(())
}
