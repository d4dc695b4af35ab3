//! redmatch-core: lexer, parser and editor support for the Redmatch rule
//! language.
//!
//! Redmatch rules map source data fields to FHIR resources:
//!
//! ```text
//! VALUE(pat_sex) = 1 {
//!   Patient<p> -> gender = CODE_LITERAL(male);
//! }
//! ```
//!
//! # Public API
//!
//! - [`lex()`] / [`tokenize_line()`] -- lossless tokenization
//! - [`parse()`] / [`parse_recovering()`] -- rule documents with diagnostics
//! - [`tokens_for_line()`] -- per-line highlighting scopes
//! - [`to_marker()`] -- diagnostics as editor markers
//! - [`expand_repeats()`] -- unroll `REPEAT` clauses

pub mod ast;
pub mod error;
pub mod expand;
pub mod highlight;
pub mod lexer;
pub mod markers;
pub mod parser;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{
    Assignment, Attribute, Body, BodyMember, CompareOp, Condition, ConceptLiteral, Document,
    Literal, LookupKind, Number, Reference, RepeatClause, Resource, Rule, SourceRange, Value,
    VariableIdentifier,
};
pub use error::{Diagnostic, RedmatchError, Severity};
pub use highlight::{LineState, LineToken, LineTokens};
pub use lexer::{Span, Token, TokenKind};
pub use markers::{Issue, Marker, MarkerSeverity};
pub use parser::{ParseOutcome, DEFAULT_MAX_ERRORS};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use expand::expand_repeats;
pub use highlight::{initial_state, tokens_for_line};
pub use lexer::{lex, lex_errors, significant, tokenize_line};
pub use markers::{issue_to_marker, to_marker, to_markers};
pub use parser::{parse, parse_recovering, parse_tokens};
