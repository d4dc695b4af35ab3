/// Recursive-descent parser for Redmatch rule documents.
///
/// The parser works on significant tokens only and never gives up on the
/// first error: broken constructs are reported and skipped, and whatever
/// parsed cleanly is kept.
use tracing::{debug, trace};

use crate::ast::{Body, BodyMember, Document, RepeatClause, Rule, SourceRange};
use crate::error::Diagnostic;
use crate::lexer::{self, Token, TokenKind};

mod condition;
mod resource;

/// Default maximum number of diagnostics collected before parsing stops.
pub const DEFAULT_MAX_ERRORS: usize = 100;

/// Rules and conditions deeper than this are rejected rather than recursed
/// into.
const MAX_NESTING: usize = 200;

/// Result of a best-effort parse: the partial tree plus every diagnostic,
/// lexical ones first.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

type PResult<T> = Result<T, Diagnostic>;

// ──────────────────────────────────────────────
// Entry points
// ──────────────────────────────────────────────

/// Parse `text`, failing with every diagnostic if any error was found.
pub fn parse(text: &str) -> Result<Document, Vec<Diagnostic>> {
    let outcome = parse_recovering(text, DEFAULT_MAX_ERRORS);
    if outcome.has_errors() {
        Err(outcome.diagnostics)
    } else {
        Ok(outcome.document)
    }
}

/// Parse `text` with error recovery, keeping at most `max_errors`
/// diagnostics.
pub fn parse_recovering(text: &str, max_errors: usize) -> ParseOutcome {
    let tokens = lexer::lex(text);
    parse_tokens(&tokens, max_errors)
}

/// Parse an already lexed token stream. Trivia and unrecognised tokens are
/// dropped here; the latter are reported as lexical errors.
pub fn parse_tokens(tokens: &[Token], max_errors: usize) -> ParseOutcome {
    let mut diagnostics = lexer::lex_errors(tokens);
    diagnostics.truncate(max_errors);

    let significant = lexer::significant(tokens);
    let budget = max_errors.saturating_sub(diagnostics.len());
    let mut p = Parser::new(&significant, budget);
    let document = p.parse_document();
    diagnostics.extend(p.diagnostics);

    debug!(
        rules = document.rules.len(),
        diagnostics = diagnostics.len(),
        "parsed rule document"
    );
    ParseOutcome {
        document,
        diagnostics,
    }
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    max_errors: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], max_errors: usize) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            max_errors,
            diagnostics: Vec::new(),
        }
    }

    fn cur(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<TokenKind> {
        self.cur().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn prev(&self) -> Option<&'a Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<&'a Token> {
        match self.cur() {
            Some(t) if t.kind == kind => {
                self.pos += 1;
                Ok(t)
            }
            Some(t) => Err(Diagnostic::at_token(
                t,
                format!(
                    "mismatched input '{}' expecting {}",
                    t.text,
                    kind.display_name()
                ),
            )),
            None => Err(self.err_at_eof(format!(
                "missing {} at '<EOF>'",
                kind.display_name()
            ))),
        }
    }

    /// Error anchored at the current token, or just past the input at EOF.
    fn err(&self, msg: impl Into<String>) -> Diagnostic {
        match self.cur() {
            Some(t) => Diagnostic::at_token(t, msg),
            None => self.err_at_eof(msg),
        }
    }

    fn err_at_eof(&self, msg: impl Into<String>) -> Diagnostic {
        match self.tokens.last() {
            Some(t) => Diagnostic::after_token(t, msg),
            None => Diagnostic::error(1, 0, 1, 0, msg),
        }
    }

    /// `'text'` of the current token, or `'<EOF>'`.
    fn describe_cur(&self) -> String {
        match self.cur() {
            Some(t) => format!("'{}'", t.text),
            None => "'<EOF>'".to_owned(),
        }
    }

    fn no_viable_alternative(&self) -> Diagnostic {
        self.err(format!(
            "no viable alternative at input {}",
            self.describe_cur()
        ))
    }

    fn report(&mut self, d: Diagnostic) {
        if self.diagnostics.len() < self.max_errors {
            trace!(line = d.start_line, col = d.start_col, message = %d.message, "syntax error");
            self.diagnostics.push(d);
        }
    }

    fn gave_up(&self) -> bool {
        self.diagnostics.len() >= self.max_errors
    }

    /// Run `f` one nesting level deeper, refusing once the limit is hit.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.err("input nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn range_from(&self, first: &Token) -> SourceRange {
        let (end_line, end_col) = match self.prev() {
            Some(last) => last.end_position(),
            None => first.end_position(),
        };
        SourceRange {
            start_line: first.line,
            start_col: first.column,
            end_line,
            end_col,
        }
    }

    fn take_integer(&mut self, what: &str) -> PResult<i64> {
        let t = self.expect(TokenKind::Number)?;
        if t.text.contains('.') {
            return Err(Diagnostic::at_token(
                t,
                format!("{} must be an integer, got '{}'", what, t.text),
            ));
        }
        t.text
            .parse::<i64>()
            .map_err(|_| Diagnostic::at_token(t, format!("{} '{}' is out of range", what, t.text)))
    }
}

fn starts_rule(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Repeat
            | TokenKind::Open
            | TokenKind::Not
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::NotNull
            | TokenKind::Value
    )
}

const RULE_START_SET: &str = "{'REPEAT', '(', '^', 'TRUE', 'FALSE', 'NULL', 'NOTNULL', 'VALUE'}";

// ──────────────────────────────────────────────
// Document structure
// ──────────────────────────────────────────────

impl<'a> Parser<'a> {
    fn parse_document(&mut self) -> Document {
        let mut rules = Vec::new();
        while let Some(kind) = self.peek() {
            if self.gave_up() {
                break;
            }
            let start = self.pos;
            if starts_rule(kind) {
                match self.parse_rule() {
                    Ok(rule) => rules.push(rule),
                    Err(d) => {
                        self.report(d);
                        self.recover_to_next_rule(start);
                    }
                }
            } else {
                let msg = format!(
                    "extraneous input {} expecting {}",
                    self.describe_cur(),
                    RULE_START_SET
                );
                self.report(self.err(msg));
                self.recover_to_next_rule(start);
            }
        }
        Document { rules }
    }

    /// rule: repeatsClause? condition body (ELSE body)? ';'?
    fn parse_rule(&mut self) -> PResult<Rule> {
        let first = self.cur().ok_or_else(|| self.no_viable_alternative())?;
        let repeats = if self.at(TokenKind::Repeat) {
            Some(self.parse_repeats()?)
        } else {
            None
        };
        let condition = self.parse_condition()?;
        let body = self.parse_body()?;
        let else_body = if self.at(TokenKind::Else) {
            self.advance();
            Some(self.parse_body()?)
        } else {
            None
        };
        if self.at(TokenKind::End) {
            self.advance();
        }
        Ok(Rule {
            repeats,
            condition,
            body,
            else_body,
            range: self.range_from(first),
        })
    }

    /// REPEAT '(' NUMBER '..' NUMBER ':' IDENTIFIER ')'
    fn parse_repeats(&mut self) -> PResult<RepeatClause> {
        let keyword = self.expect(TokenKind::Repeat)?;
        self.expect(TokenKind::Open)?;
        let start = self.take_integer("repeat start")?;
        self.expect(TokenKind::DotDot)?;
        let end = self.take_integer("repeat end")?;
        self.expect(TokenKind::Colon)?;
        let variable = self.expect(TokenKind::Identifier)?.text.clone();
        let close = self.expect(TokenKind::Close)?;
        if start > end {
            self.report(Diagnostic::between(
                keyword,
                close,
                format!("Invalid repeat range {}..{}: start is greater than end", start, end),
            ));
        }
        Ok(RepeatClause {
            start,
            end,
            variable,
        })
    }

    /// body: '{' (resource | rule)* '}'
    ///
    /// Members that fail to parse are reported and skipped, so a body never
    /// fails once its opening brace is matched.
    fn parse_body(&mut self) -> PResult<Body> {
        self.expect(TokenKind::OpenCurly)?;
        self.nested(|p| Ok(p.parse_body_members()))
    }

    fn parse_body_members(&mut self) -> Body {
        let mut members = Vec::new();
        loop {
            if self.gave_up() {
                break;
            }
            let start = self.pos;
            match self.peek() {
                Some(TokenKind::CloseCurly) => {
                    self.advance();
                    break;
                }
                None => {
                    self.report(self.err_at_eof("missing '}' at '<EOF>'"));
                    break;
                }
                Some(TokenKind::Identifier) => match self.parse_resource() {
                    Ok(r) => members.push(BodyMember::Resource(r)),
                    Err(d) => {
                        self.report(d);
                        self.recover_in_body(start);
                    }
                },
                Some(kind) if starts_rule(kind) => match self.parse_rule() {
                    Ok(rule) => members.push(BodyMember::Rule(rule)),
                    Err(d) => {
                        self.report(d);
                        self.recover_in_body(start);
                    }
                },
                Some(_) => {
                    let msg = format!(
                        "extraneous input {} expecting {{IDENTIFIER, '}}', {}",
                        self.describe_cur(),
                        &RULE_START_SET[1..]
                    );
                    self.report(self.err(msg));
                    self.recover_in_body(start);
                }
            }
        }
        Body { members }
    }

    // -- Recovery ----------------------------------------------

    /// Skip to the end of a broken body member: past a `;`, up to the `}`
    /// closing the enclosing body, or up to the next token that can start a
    /// member. Nested braces and parentheses are skipped whole.
    fn recover_in_body(&mut self, start: usize) {
        let error_pos = self.pos;
        let mut braces = 0usize;
        let mut parens = 0usize;
        while let Some(kind) = self.peek() {
            if braces == 0 && parens == 0 && self.pos > start && self.resumes_member(error_pos) {
                break;
            }
            match kind {
                TokenKind::OpenCurly => braces += 1,
                TokenKind::CloseCurly if braces == 0 => break,
                TokenKind::CloseCurly => braces -= 1,
                TokenKind::Open => parens += 1,
                TokenKind::Close => parens = parens.saturating_sub(1),
                TokenKind::End if braces == 0 => {
                    self.advance();
                    break;
                }
                _ => {}
            }
            self.advance();
        }
        trace!(from = start, to = self.pos, "resynchronised in body");
    }

    /// Whether the current token begins a new body member. `Type<` always
    /// does; a rule keyword only at the token that failed or right after a
    /// closed body.
    fn resumes_member(&self, error_pos: usize) -> bool {
        match self.peek() {
            Some(TokenKind::Identifier) => {
                self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(TokenKind::Lt)
            }
            Some(kind) if starts_rule(kind) => {
                self.pos == error_pos
                    || self.prev().map(|t| t.kind) == Some(TokenKind::CloseCurly)
            }
            _ => false,
        }
    }

    /// Skip to the start of the next top-level rule. Always consumes at
    /// least one token.
    fn recover_to_next_rule(&mut self, start: usize) {
        let mut depth = 0usize;
        while let Some(kind) = self.peek() {
            match kind {
                TokenKind::OpenCurly => depth += 1,
                TokenKind::CloseCurly => depth = depth.saturating_sub(1),
                TokenKind::End if depth == 0 && self.pos > start => {
                    self.advance();
                    break;
                }
                k if depth == 0 && self.pos > start && starts_rule(k) => break,
                _ => {}
            }
            self.advance();
        }
        trace!(from = start, to = self.pos, "resynchronised at top level");
    }
}

/// Strip the surrounding quotes from a string token and resolve escapes.
/// Unknown escapes are kept as written.
pub(crate) fn unquote(text: &str) -> String {
    let inner = if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) if hex.len() == 4 => {
                        out.push(ch);
                        for _ in 0..4 {
                            chars.next();
                        }
                    }
                    _ => out.push_str("\\u"),
                }
            }
            Some(other @ ('\\' | '/' | '\'' | '"' | '`')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
