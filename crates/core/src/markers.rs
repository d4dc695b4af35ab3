//! Conversion of diagnostics into editor markers.
//!
//! Markers use 1-based lines and 1-based columns. Diagnostics already carry
//! 1-based lines, so only columns shift.

use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSeverity {
    Error,
    Warning,
}

impl MarkerSeverity {
    /// Numeric severity used by Monaco-style editors.
    pub fn code(self) -> u8 {
        match self {
            MarkerSeverity::Error => 8,
            MarkerSeverity::Warning => 4,
        }
    }
}

impl From<Severity> for MarkerSeverity {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Error => MarkerSeverity::Error,
            Severity::Warning => MarkerSeverity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub start_line_number: u32,
    pub start_column: u32,
    pub end_line_number: u32,
    pub end_column: u32,
    pub message: String,
    pub severity: MarkerSeverity,
}

/// An externally produced issue, as a backend reports it: positions like a
/// [`Diagnostic`], severity as a free-form label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub row_start: u32,
    pub col_start: u32,
    pub row_end: u32,
    pub col_end: u32,
    pub text: String,
    #[serde(default)]
    pub severity: String,
}

impl From<&Issue> for Diagnostic {
    fn from(issue: &Issue) -> Self {
        Diagnostic {
            start_line: issue.row_start,
            start_col: issue.col_start,
            end_line: issue.row_end,
            end_col: issue.col_end,
            message: issue.text.clone(),
            severity: Severity::from_label(&issue.severity),
        }
    }
}

pub fn to_marker(d: &Diagnostic) -> Marker {
    Marker {
        start_line_number: d.start_line,
        start_column: d.start_col.saturating_add(1),
        end_line_number: d.end_line,
        end_column: d.end_col.saturating_add(1),
        message: d.message.clone(),
        severity: d.severity.into(),
    }
}

pub fn to_markers(diagnostics: &[Diagnostic]) -> Vec<Marker> {
    diagnostics.iter().map(to_marker).collect()
}

pub fn issue_to_marker(issue: &Issue) -> Marker {
    to_marker(&Diagnostic::from(issue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_shift_by_one_lines_do_not() {
        let d = Diagnostic::error(3, 0, 3, 4, "bad");
        let m = to_marker(&d);
        assert_eq!(m.start_line_number, 3);
        assert_eq!(m.start_column, 1);
        assert_eq!(m.end_line_number, 3);
        assert_eq!(m.end_column, 5);
        assert_eq!(m.severity, MarkerSeverity::Error);
        assert_eq!(m.message, "bad");
    }

    #[test]
    fn issue_columns_map_to_one_based_markers() {
        let issue = Issue {
            row_start: 2,
            col_start: 5,
            row_end: 2,
            col_end: 9,
            text: "x".into(),
            severity: "ERROR".into(),
        };
        let m = issue_to_marker(&issue);
        assert_eq!((m.start_line_number, m.start_column), (2, 6));
        assert_eq!((m.end_line_number, m.end_column), (2, 10));
    }

    #[test]
    fn extreme_columns_saturate() {
        let issue: Issue = serde_json::from_str(
            r#"{"rowStart":1,"colStart":4294967295,"rowEnd":1,"colEnd":4294967295,"text":"far"}"#,
        )
        .expect("deserialize");
        let m = issue_to_marker(&issue);
        assert_eq!(m.start_column, u32::MAX);
        assert_eq!(m.end_column, u32::MAX);
    }

    #[test]
    fn issue_severity_labels() {
        let mut issue = Issue {
            row_start: 1,
            col_start: 2,
            row_end: 1,
            col_end: 6,
            text: "unknown field".into(),
            severity: "Error".into(),
        };
        assert_eq!(issue_to_marker(&issue).severity, MarkerSeverity::Error);
        issue.severity = "INFO".into();
        assert_eq!(issue_to_marker(&issue).severity, MarkerSeverity::Warning);
        assert_eq!(issue_to_marker(&issue).start_column, 3);
    }

    #[test]
    fn marker_json_shape() {
        let m = to_marker(&Diagnostic::error(1, 0, 1, 1, "x"));
        let json = serde_json::to_value(&m).expect("serialize");
        assert_eq!(json["startLineNumber"], 1);
        assert_eq!(json["endColumn"], 2);
        assert_eq!(json["severity"], "error");
        assert_eq!(MarkerSeverity::Error.code(), 8);
    }

    #[test]
    fn issues_deserialize_without_severity() {
        let issue: Issue = serde_json::from_str(
            r#"{"rowStart":2,"colStart":0,"rowEnd":2,"colEnd":3,"text":"hm"}"#,
        )
        .expect("deserialize");
        assert_eq!(Diagnostic::from(&issue).severity, Severity::Warning);
    }
}
