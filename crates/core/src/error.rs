use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lexer::Token;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Interpret a free-form severity label. Only `ERROR` (in any case) is an
    /// error; every other label is a warning.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("error") {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A located problem found in a rule document.
///
/// Lines are 1-based, columns are 0-based character offsets within the line.
/// The end position is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            start_line,
            start_col,
            end_line,
            end_col,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// An error covering exactly the text of `token`.
    pub fn at_token(token: &Token, message: impl Into<String>) -> Self {
        let (end_line, end_col) = token.end_position();
        Diagnostic::error(token.line, token.column, end_line, end_col, message)
    }

    /// An error covering `first` through `last` inclusive.
    pub fn between(first: &Token, last: &Token, message: impl Into<String>) -> Self {
        let (end_line, end_col) = last.end_position();
        Diagnostic::error(first.line, first.column, end_line, end_col, message)
    }

    /// A zero-width error just past the end of `token`, used when input ends
    /// early.
    pub fn after_token(token: &Token, message: impl Into<String>) -> Self {
        let (line, col) = token.end_position();
        Diagnostic::error(line, col, line, col, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.start_line, self.start_col, self.severity, self.message
        )
    }
}

/// Operational failures surfaced by the library and the tools built on it.
#[derive(Debug, Error)]
pub enum RedmatchError {
    #[error("error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration in '{path}': {message}")]
    Config { path: String, message: String },
    #[error("{count} syntax error(s)")]
    Syntax { count: usize },
    #[error("language server error: {0}")]
    Server(String),
}

impl RedmatchError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        RedmatchError::Io {
            path: path.into(),
            source,
        }
    }
}
