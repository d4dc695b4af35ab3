//! Lossless lexer for Redmatch rule documents.
//!
//! Every character of the input lands in exactly one token, including
//! whitespace, comments and characters no rule recognises. Concatenating the
//! token texts reproduces the input.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Else,
    Repeat,
    Open,
    Close,
    /// `^`
    Not,
    /// `&`
    And,
    /// `|`
    Or,
    True,
    False,
    Null,
    NotNull,
    Value,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    /// `->`
    Then,
    Comma,
    /// `;`
    End,
    OpenSq,
    CloseSq,
    Dot,
    Concept,
    ConceptSelected,
    CodeSelected,
    Ref,
    /// `${`
    OpenCurlyDollar,
    CloseCurly,
    OpenCurly,
    DotDot,
    Colon,
    ConceptLiteral,
    CodeLiteral,
    Identifier,
    String,
    Number,
    Comment,
    LineComment,
    Whitespace,
    Date,
    DateTime,
    Time,
    /// Parenthesised payload following `CONCEPT_LITERAL`.
    ConceptValue,
    /// Parenthesised payload following `CODE_LITERAL`.
    CodeValue,
    /// A character no lexical rule accepts.
    Unrecognized,
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("ELSE", TokenKind::Else),
    ("REPEAT", TokenKind::Repeat),
    ("TRUE", TokenKind::True),
    ("FALSE", TokenKind::False),
    ("NULL", TokenKind::Null),
    ("NOTNULL", TokenKind::NotNull),
    ("VALUE", TokenKind::Value),
    ("CONCEPT", TokenKind::Concept),
    ("CONCEPT_SELECTED", TokenKind::ConceptSelected),
    ("CODE_SELECTED", TokenKind::CodeSelected),
    ("REF", TokenKind::Ref),
    ("CONCEPT_LITERAL", TokenKind::ConceptLiteral),
    ("CODE_LITERAL", TokenKind::CodeLiteral),
];

// Longest first so that maximal munch falls out of a linear scan.
const PUNCTUATION: &[(&str, TokenKind)] = &[
    ("${", TokenKind::OpenCurlyDollar),
    ("..", TokenKind::DotDot),
    ("!=", TokenKind::Neq),
    ("<=", TokenKind::Lte),
    (">=", TokenKind::Gte),
    ("->", TokenKind::Then),
    ("(", TokenKind::Open),
    (")", TokenKind::Close),
    ("^", TokenKind::Not),
    ("&", TokenKind::And),
    ("|", TokenKind::Or),
    ("=", TokenKind::Eq),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    (",", TokenKind::Comma),
    (";", TokenKind::End),
    ("[", TokenKind::OpenSq),
    ("]", TokenKind::CloseSq),
    (".", TokenKind::Dot),
    ("}", TokenKind::CloseCurly),
    ("{", TokenKind::OpenCurly),
    (":", TokenKind::Colon),
];

impl TokenKind {
    /// Symbolic name of the kind, e.g. `CONCEPT_SELECTED` or `WS`.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Else => "ELSE",
            TokenKind::Repeat => "REPEAT",
            TokenKind::Open => "OPEN",
            TokenKind::Close => "CLOSE",
            TokenKind::Not => "NOT",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Null => "NULL",
            TokenKind::NotNull => "NOTNULL",
            TokenKind::Value => "VALUE",
            TokenKind::Eq => "EQ",
            TokenKind::Neq => "NEQ",
            TokenKind::Lt => "LT",
            TokenKind::Gt => "GT",
            TokenKind::Lte => "LTE",
            TokenKind::Gte => "GTE",
            TokenKind::Then => "THEN",
            TokenKind::Comma => "COMMA",
            TokenKind::End => "END",
            TokenKind::OpenSq => "OPEN_SQ",
            TokenKind::CloseSq => "CLOSE_SQ",
            TokenKind::Dot => "DOT",
            TokenKind::Concept => "CONCEPT",
            TokenKind::ConceptSelected => "CONCEPT_SELECTED",
            TokenKind::CodeSelected => "CODE_SELECTED",
            TokenKind::Ref => "REF",
            TokenKind::OpenCurlyDollar => "OPEN_CURLY_DOLLAR",
            TokenKind::CloseCurly => "CLOSE_CURLY",
            TokenKind::OpenCurly => "OPEN_CURLY",
            TokenKind::DotDot => "DOTDOT",
            TokenKind::Colon => "COLON",
            TokenKind::ConceptLiteral => "CONCEPT_LITERAL",
            TokenKind::CodeLiteral => "CODE_LITERAL",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::String => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::Comment => "COMMENT",
            TokenKind::LineComment => "LINE_COMMENT",
            TokenKind::Whitespace => "WS",
            TokenKind::Date => "DATE",
            TokenKind::DateTime => "DATETIME",
            TokenKind::Time => "TIME",
            TokenKind::ConceptValue => "CONCEPT_VALUE",
            TokenKind::CodeValue => "CODE_VALUE",
            TokenKind::Unrecognized => "ERROR",
        }
    }

    /// Whitespace and comments: kept by the lexer, ignored by the parser.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::LineComment
        )
    }

    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, k)| *k == self)
    }

    /// How the kind is quoted in parser messages: the literal lexeme for
    /// fixed tokens, the symbolic name otherwise.
    pub fn display_name(self) -> String {
        if let Some((text, _)) = KEYWORDS
            .iter()
            .chain(PUNCTUATION.iter())
            .find(|(_, k)| *k == self)
        {
            format!("'{}'", text)
        } else {
            self.name().to_owned()
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for TokenKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Byte range into the lexed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    /// 1-based line of the first character.
    pub line: u32,
    /// 0-based character column of the first character.
    pub column: u32,
}

impl Token {
    /// Line and column just past the last character of the token.
    pub fn end_position(&self) -> (u32, u32) {
        advance_position(self.line, self.column, &self.text)
    }
}

fn advance_position(mut line: u32, mut column: u32, text: &str) -> (u32, u32) {
    for c in text.chars() {
        if c == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Lex a whole document.
pub fn lex(text: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(text);
    lexer.run();
    lexer.tokens
}

/// Lex a single line of editor text. The line carries no state in from
/// previous lines.
pub fn tokenize_line(line: &str) -> Vec<Token> {
    lex(line)
}

/// The tokens the parser consumes: no trivia, no unrecognised characters.
pub fn significant(tokens: &[Token]) -> Vec<Token> {
    tokens
        .iter()
        .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Unrecognized)
        .cloned()
        .collect()
}

/// One diagnostic per run of adjacent unrecognised characters.
pub fn lex_errors(tokens: &[Token]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind != TokenKind::Unrecognized {
            i += 1;
            continue;
        }
        let first = i;
        let mut text = tokens[i].text.clone();
        while i + 1 < tokens.len()
            && tokens[i + 1].kind == TokenKind::Unrecognized
            && tokens[i + 1].span.start == tokens[i].span.end
        {
            i += 1;
            text.push_str(&tokens[i].text);
        }
        diagnostics.push(Diagnostic::between(
            &tokens[first],
            &tokens[i],
            format!("token recognition error at: '{}'", text),
        ));
        i += 1;
    }
    diagnostics
}

// ──────────────────────────────────────────────
// Scanner
// ──────────────────────────────────────────────

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    /// Set right after `CONCEPT_LITERAL` / `CODE_LITERAL`: the next `(` opens
    /// a value payload of this kind.
    pending_value: Option<TokenKind>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            column: 0,
            pending_value: None,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        let end = self.pos + len;
        let text = &self.src[self.pos..end];
        self.tokens.push(Token {
            kind,
            text: text.to_owned(),
            span: Span {
                start: self.pos,
                end,
            },
            line: self.line,
            column: self.column,
        });
        let (line, column) = advance_position(self.line, self.column, text);
        self.line = line;
        self.column = column;
        self.pos = end;

        if !kind.is_trivia() {
            self.pending_value = match kind {
                TokenKind::ConceptLiteral => Some(TokenKind::ConceptValue),
                TokenKind::CodeLiteral => Some(TokenKind::CodeValue),
                _ => None,
            };
        }
    }

    fn run(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            let (kind, len) = self.next_token(c);
            self.push(kind, len);
        }
    }

    fn next_token(&self, c: char) -> (TokenKind, usize) {
        let rest = self.rest();

        if let Some(kind) = self.pending_value {
            if c == '(' {
                if let Some(len) = value_payload_len(rest) {
                    return (kind, len);
                }
            }
        }

        if matches!(c, ' ' | '\t' | '\r' | '\n') {
            let len = rest
                .find(|ch: char| !matches!(ch, ' ' | '\t' | '\r' | '\n'))
                .unwrap_or(rest.len());
            return (TokenKind::Whitespace, len);
        }

        if rest.starts_with("/*") {
            return match rest[2..].find("*/") {
                Some(i) => (TokenKind::Comment, i + 4),
                None => (TokenKind::Unrecognized, 1),
            };
        }

        if rest.starts_with("//") {
            let len = rest.find(['\r', '\n']).unwrap_or(rest.len());
            return (TokenKind::LineComment, len);
        }

        if c == '\'' || c == '"' {
            return match string_len(rest, c) {
                Some(len) => (TokenKind::String, len),
                None => (TokenKind::Unrecognized, c.len_utf8()),
            };
        }

        if c.is_ascii_digit() {
            return (TokenKind::Number, number_len(rest));
        }

        if c == '@' {
            return match temporal(rest) {
                Some(found) => found,
                None => (TokenKind::Unrecognized, 1),
            };
        }

        let ident = identifier_len(rest);
        let punct = PUNCTUATION.iter().find(|(p, _)| rest.starts_with(p));

        match punct {
            Some((p, kind)) if p.len() >= ident => (*kind, p.len()),
            _ if ident > 0 => {
                let word = &rest[..ident];
                let kind = KEYWORDS
                    .iter()
                    .find(|(k, _)| *k == word)
                    .map(|(_, kind)| *kind)
                    .unwrap_or(TokenKind::Identifier);
                (kind, ident)
            }
            _ => (TokenKind::Unrecognized, c.len_utf8()),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-'
}

fn is_identifier_char(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

fn identifier_len(s: &str) -> usize {
    match s.chars().next() {
        Some(c) if is_identifier_start(c) => s
            .find(|ch: char| !is_identifier_char(ch))
            .unwrap_or(s.len()),
        _ => 0,
    }
}

fn digits_len(s: &str) -> usize {
    s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len())
}

fn number_len(s: &str) -> usize {
    let whole = digits_len(s);
    let after = &s[whole..];
    if let Some(frac) = after.strip_prefix('.') {
        let n = digits_len(frac);
        if n > 0 {
            return whole + 1 + n;
        }
    }
    whole
}

/// Length of a quoted string starting at `s`, or `None` if the line ends
/// before the closing quote or an escape is malformed.
fn string_len(s: &str, quote: char) -> Option<usize> {
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '`' | '\'' | '"' | '\\' | '/' | 'f' | 'n' | 'r' | 't')) => {}
                Some((_, 'u')) => {
                    for _ in 0..4 {
                        match chars.next() {
                            Some((_, h)) if h.is_ascii_hexdigit() => {}
                            _ => return None,
                        }
                    }
                }
                _ => return None,
            },
            '\n' => return None,
            _ if c == quote => return Some(i + c.len_utf8()),
            _ => {}
        }
    }
    None
}

/// Length of `( ... )` up to the first `)` outside double quotes on the same
/// line.
fn value_payload_len(s: &str) -> Option<usize> {
    let mut in_quote = false;
    for (i, c) in s.char_indices().skip(1) {
        match c {
            '\n' => return None,
            '"' => in_quote = !in_quote,
            ')' if !in_quote => return Some(i + 1),
            _ => {}
        }
    }
    None
}

// ──────────────────────────────────────────────
// Date and time literals
// ──────────────────────────────────────────────

/// Exactly `n` ASCII digits at the start of `s`.
fn fixed_digits(s: &str, n: usize) -> bool {
    s.len() >= n && s.as_bytes()[..n].iter().all(u8::is_ascii_digit)
}

/// `-` followed by two digits.
fn dashed_pair(s: &str, sep: char) -> bool {
    s.starts_with(sep) && fixed_digits(&s[1..], 2)
}

/// `YYYY(-MM(-DD)?)?`
fn date_format_len(s: &str) -> usize {
    if !fixed_digits(s, 4) {
        return 0;
    }
    let mut len = 4;
    if dashed_pair(&s[len..], '-') {
        len += 3;
        if dashed_pair(&s[len..], '-') {
            len += 3;
        }
    }
    len
}

/// `hh(:mm(:ss(.f+)?)?)?`
fn time_format_len(s: &str) -> usize {
    if !fixed_digits(s, 2) {
        return 0;
    }
    let mut len = 2;
    if dashed_pair(&s[len..], ':') {
        len += 3;
        if dashed_pair(&s[len..], ':') {
            len += 3;
            if let Some(frac) = s[len..].strip_prefix('.') {
                let n = digits_len(frac);
                if n > 0 {
                    len += 1 + n;
                }
            }
        }
    }
    len
}

/// `Z` or `(+|-)hh:mm`
fn timezone_len(s: &str) -> usize {
    if s.starts_with('Z') {
        return 1;
    }
    if (s.starts_with('+') || s.starts_with('-'))
        && fixed_digits(&s[1..], 2)
        && dashed_pair(&s[3..], ':')
    {
        return 6;
    }
    0
}

/// `@YYYY-MM-DD`, `@YYYY-MM-DDThh:mm:ss+zz:zz`, `@Thh:mm` and their
/// shorter forms.
fn temporal(s: &str) -> Option<(TokenKind, usize)> {
    let body = &s[1..];
    if let Some(time) = body.strip_prefix('T') {
        let n = time_format_len(time);
        return (n > 0).then_some((TokenKind::Time, 2 + n));
    }
    let date = date_format_len(body);
    if date == 0 {
        return None;
    }
    let mut len = 1 + date;
    if s[len..].starts_with('T') {
        len += 1;
        let time = time_format_len(&s[len..]);
        if time > 0 {
            len += time;
            len += timezone_len(&s[len..]);
        }
        return Some((TokenKind::DateTime, len));
    }
    Some((TokenKind::Date, len))
}
