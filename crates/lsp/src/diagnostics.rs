//! Parse-to-diagnostic conversion.
//!
//! Runs the recovering parser over the editor's buffer and converts each
//! `redmatch_core::Diagnostic` into an `lsp_types::Diagnostic`. Core
//! diagnostics use 1-based lines; LSP positions are 0-based.

use lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};
use redmatch_core::Severity;

use crate::document::LineIndex;

/// Parse `content` and return every diagnostic, capped at `max_errors`.
pub fn compute_diagnostics(content: &str, max_errors: usize) -> Vec<Diagnostic> {
    let outcome = redmatch_core::parse_recovering(content, max_errors);
    let index = LineIndex::new(content);
    outcome
        .diagnostics
        .iter()
        .map(|d| to_lsp(d, &index))
        .collect()
}

fn to_lsp(d: &redmatch_core::Diagnostic, index: &LineIndex<'_>) -> Diagnostic {
    let start_line = d.start_line.saturating_sub(1);
    let end_line = d.end_line.saturating_sub(1);
    Diagnostic {
        range: Range::new(
            Position::new(start_line, index.utf16_col(start_line, d.start_col)),
            Position::new(end_line, index.utf16_col(end_line, d.end_col)),
        ),
        severity: Some(match d.severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
        }),
        source: Some("redmatch".to_string()),
        message: d.message.clone(),
        ..Default::default()
    }
}
