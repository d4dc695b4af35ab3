//! Per-line syntax highlighting for editors.
//!
//! Every line is tokenized on its own; the line state threaded between calls
//! carries nothing.

use serde::Serialize;

use crate::lexer::{self, TokenKind};

pub const SCOPE_SUFFIX: &str = ".rdm";
pub const ERROR_SCOPE: &str = "error.rdm";

/// State carried from one line to the next. Always the initial state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct LineState;

pub fn initial_state() -> LineState {
    LineState
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineToken {
    /// 0-based character offset of the token within the line.
    pub start_index: u32,
    pub scopes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTokens {
    pub tokens: Vec<LineToken>,
    pub end_state: LineState,
}

/// Scope name for a token kind: the lowercased symbolic name plus `.rdm`.
pub fn scope_for(kind: TokenKind) -> String {
    if kind == TokenKind::Unrecognized {
        return ERROR_SCOPE.to_owned();
    }
    format!("{}{}", kind.name().to_ascii_lowercase(), SCOPE_SUFFIX)
}

/// Highlight one line of text.
///
/// Each run of unrecognised characters adds an `error.rdm` entry at its
/// start, ahead of the token entry at the same offset.
pub fn tokens_for_line(line: &str) -> LineTokens {
    let tokens = lexer::tokenize_line(line);
    let mut out: Vec<LineToken> = Vec::with_capacity(tokens.len());

    for error in lexer::lex_errors(&tokens) {
        out.push(LineToken {
            start_index: error.start_col,
            scopes: ERROR_SCOPE.to_owned(),
        });
    }
    for token in tokens.iter().filter(|t| t.kind != TokenKind::Unrecognized) {
        out.push(LineToken {
            start_index: token.column,
            scopes: scope_for(token.kind),
        });
    }
    out.sort_by_key(|t| t.start_index);

    LineTokens {
        tokens: out,
        end_state: initial_state(),
    }
}

/// Editor-facing form: takes the previous line's state and ignores it.
pub fn tokenize(line: &str, _state: LineState) -> LineTokens {
    tokens_for_line(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(line: &str) -> Vec<(u32, String)> {
        tokens_for_line(line)
            .tokens
            .into_iter()
            .map(|t| (t.start_index, t.scopes))
            .collect()
    }

    #[test]
    fn scope_names() {
        assert_eq!(scope_for(TokenKind::ConceptSelected), "concept_selected.rdm");
        assert_eq!(scope_for(TokenKind::Whitespace), "ws.rdm");
        assert_eq!(scope_for(TokenKind::Unrecognized), "error.rdm");
    }

    #[test]
    fn highlights_every_token_including_whitespace() {
        assert_eq!(
            scopes("VALUE(x) = 1"),
            vec![
                (0, "value.rdm".to_owned()),
                (5, "open.rdm".to_owned()),
                (6, "identifier.rdm".to_owned()),
                (7, "close.rdm".to_owned()),
                (8, "ws.rdm".to_owned()),
                (9, "eq.rdm".to_owned()),
                (10, "ws.rdm".to_owned()),
                (11, "number.rdm".to_owned()),
            ]
        );
    }

    #[test]
    fn unrecognised_runs_become_single_error_entries() {
        assert_eq!(
            scopes("a ## b"),
            vec![
                (0, "identifier.rdm".to_owned()),
                (1, "ws.rdm".to_owned()),
                (2, "error.rdm".to_owned()),
                (4, "ws.rdm".to_owned()),
                (5, "identifier.rdm".to_owned()),
            ]
        );
    }

    #[test]
    fn empty_line_has_no_tokens() {
        let result = tokens_for_line("");
        assert!(result.tokens.is_empty());
        assert_eq!(result.end_state, initial_state());
    }

    #[test]
    fn lines_are_independent() {
        let first = tokenize("/* start of comment", initial_state());
        let second = tokenize("still comment */", first.end_state);
        assert_eq!(second, tokens_for_line("still comment */"));
        assert_eq!(first.tokens[0].scopes, "error.rdm");
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(tokens_for_line("TRUE")).expect("serialize");
        assert_eq!(json["tokens"][0]["startIndex"], 0);
        assert_eq!(json["tokens"][0]["scopes"], "true.rdm");
    }
}
