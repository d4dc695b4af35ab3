//! Semantic token provider.
//!
//! Classifies the lexer's token stream. Identifiers get a role from the
//! significant token that follows them: a resource type precedes `<`, an
//! attribute precedes `=`, `[` or `.`. Works on broken buffers since the
//! lexer never fails.

use lsp_types::{SemanticToken, SemanticTokenModifier, SemanticTokenType};
use redmatch_core::{lex, Token, TokenKind};

use crate::document::LineIndex;

/// Index into TOKEN_TYPES for each semantic category.
const TK_KEYWORD: u32 = 0;
const TK_COMMENT: u32 = 1;
const TK_STRING: u32 = 2;
const TK_NUMBER: u32 = 3;
const TK_OPERATOR: u32 = 4;
const TK_PROPERTY: u32 = 5;
const TK_CLASS: u32 = 6;
const TK_VARIABLE: u32 = 7;

/// Semantic token types registered with the client.
pub static TOKEN_TYPES: &[SemanticTokenType] = &[
    SemanticTokenType::KEYWORD,  // 0
    SemanticTokenType::COMMENT,  // 1
    SemanticTokenType::STRING,   // 2
    SemanticTokenType::NUMBER,   // 3
    SemanticTokenType::OPERATOR, // 4
    SemanticTokenType::PROPERTY, // 5
    SemanticTokenType::CLASS,    // 6
    SemanticTokenType::VARIABLE, // 7
];

/// Semantic token modifiers. None are emitted.
pub static TOKEN_MODIFIERS: &[SemanticTokenModifier] = &[];

/// A raw token with absolute position before delta-encoding.
#[derive(Debug, PartialEq)]
struct RawSemanticToken {
    line: u32,
    col: u32,
    length: u32,
    token_type: u32,
}

/// Compute delta-encoded semantic tokens for `content`.
pub fn compute_semantic_tokens(content: &str) -> Vec<SemanticToken> {
    let tokens = lex(content);
    let index = LineIndex::new(content);

    let significant: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.kind.is_trivia() && t.kind != TokenKind::Unrecognized)
        .map(|(i, _)| i)
        .collect();

    let mut raw = Vec::new();
    for (n, &i) in significant.iter().enumerate() {
        let next = significant.get(n + 1).map(|&j| tokens[j].kind);
        if let Some(tt) = classify(tokens[i].kind, next) {
            push_segments(&mut raw, &tokens[i], tt, &index);
        }
    }
    for token in tokens.iter().filter(|t| t.kind.is_trivia()) {
        if token.kind != TokenKind::Whitespace {
            push_segments(&mut raw, token, TK_COMMENT, &index);
        }
    }

    raw.sort_by(|a, b| a.line.cmp(&b.line).then(a.col.cmp(&b.col)));
    delta_encode(&raw)
}

fn classify(kind: TokenKind, next: Option<TokenKind>) -> Option<u32> {
    use TokenKind::*;
    match kind {
        k if k.is_keyword() => Some(TK_KEYWORD),
        Not | And | Or | Eq | Neq | Lt | Gt | Lte | Gte | Then => Some(TK_OPERATOR),
        String | ConceptValue | CodeValue => Some(TK_STRING),
        Number | Date | DateTime | Time => Some(TK_NUMBER),
        Identifier => Some(match next {
            Some(Lt) => TK_CLASS,
            Some(Eq) | Some(OpenSq) | Some(Dot) => TK_PROPERTY,
            _ => TK_VARIABLE,
        }),
        _ => None,
    }
}

/// LSP tokens may not span lines: split multi-line tokens per line.
fn push_segments(raw: &mut Vec<RawSemanticToken>, token: &Token, tt: u32, index: &LineIndex<'_>) {
    let first_line = token.line.saturating_sub(1);
    for (n, segment) in token.text.split('\n').enumerate() {
        let segment = segment.strip_suffix('\r').unwrap_or(segment);
        let length = segment.encode_utf16().count() as u32;
        if length == 0 {
            continue;
        }
        let line = first_line + n as u32;
        let col = if n == 0 {
            index.utf16_col(line, token.column)
        } else {
            0
        };
        raw.push(RawSemanticToken {
            line,
            col,
            length,
            token_type: tt,
        });
    }
}

fn delta_encode(raw: &[RawSemanticToken]) -> Vec<SemanticToken> {
    let mut result = Vec::with_capacity(raw.len());
    let mut prev_line: u32 = 0;
    let mut prev_col: u32 = 0;

    for tok in raw {
        let delta_line = tok.line - prev_line;
        let delta_start = if delta_line == 0 {
            tok.col - prev_col
        } else {
            tok.col
        };

        result.push(SemanticToken {
            delta_line,
            delta_start,
            length: tok.length,
            token_type: tok.token_type,
            token_modifiers_bitset: 0,
        });

        prev_line = tok.line;
        prev_col = tok.col;
    }

    result
}
