//! AST types for Redmatch rule documents.
//!
//! Produced by the parser, consumed by repeat expansion and the tools. The
//! `Display` impls print canonical source text that parses back to the same
//! tree.

use std::fmt;

use serde::Serialize;

// ──────────────────────────────────────────────
// Locations
// ──────────────────────────────────────────────

/// Source extent of a rule or resource. Lines are 1-based, columns 0-based,
/// end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourceRange {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

// ──────────────────────────────────────────────
// Document and rules
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Document {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub repeats: Option<RepeatClause>,
    pub condition: Condition,
    pub body: Body,
    pub else_body: Option<Body>,
    pub range: SourceRange,
}

/// `REPEAT(start..end: var)`; both bounds inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatClause {
    pub start: i64,
    pub end: i64,
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Body {
    pub members: Vec<BodyMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BodyMember {
    Resource(Resource),
    Rule(Rule),
}

// ──────────────────────────────────────────────
// Conditions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Condition {
    True,
    False,
    Null(VariableIdentifier),
    NotNull(VariableIdentifier),
    Compare {
        field: VariableIdentifier,
        op: CompareOp,
        literal: Literal,
    },
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Group(Box<Condition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Lte => "<=",
            CompareOp::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    String(String),
    Number(Number),
}

/// Numeric literal kept as its source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Number(pub String);

impl Number {
    pub fn is_integer(&self) -> bool {
        !self.0.contains('.')
    }

    pub fn as_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.0.parse().ok()
        } else {
            None
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.parse().ok()
    }
}

/// A field name, optionally suffixed with a repeat variable: `field${i}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VariableIdentifier {
    pub name: String,
    pub variable: Option<String>,
}

impl VariableIdentifier {
    pub fn plain(name: impl Into<String>) -> Self {
        VariableIdentifier {
            name: name.into(),
            variable: None,
        }
    }
}

// ──────────────────────────────────────────────
// Resources
// ──────────────────────────────────────────────

/// `Type<alias> -> attr = value, ...;`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub resource_type: String,
    pub alias: VariableIdentifier,
    pub assignments: Vec<Assignment>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub attribute: Attribute,
    pub value: Value,
}

/// Attribute path such as `identifier[0].value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub index: Option<u32>,
    pub next: Option<Box<Attribute>>,
}

impl Attribute {
    /// Segments from the outermost name inwards.
    pub fn segments(&self) -> Vec<&Attribute> {
        let mut out = vec![self];
        let mut cur = self;
        while let Some(next) = &cur.next {
            out.push(next);
            cur = next;
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Bool(bool),
    String(String),
    Number(Number),
    Reference(Reference),
    ConceptLiteral(ConceptLiteral),
    CodeLiteral(String),
    Lookup {
        kind: LookupKind,
        field: VariableIdentifier,
    },
}

/// Ways a resource value can be pulled from a source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LookupKind {
    Value,
    Concept,
    ConceptSelected,
    CodeSelected,
}

impl LookupKind {
    pub fn keyword(self) -> &'static str {
        match self {
            LookupKind::Value => "VALUE",
            LookupKind::Concept => "CONCEPT",
            LookupKind::ConceptSelected => "CONCEPT_SELECTED",
            LookupKind::CodeSelected => "CODE_SELECTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConceptLiteral {
    pub system: String,
    pub code: String,
    pub display: Option<String>,
}

/// `REF(Type<alias>)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub resource_type: String,
    pub alias: VariableIdentifier,
}

// ──────────────────────────────────────────────
// Queries
// ──────────────────────────────────────────────

impl Document {
    /// Every resource in the document, nested ones included, in source order.
    pub fn resources(&self) -> Vec<&Resource> {
        let mut out = Vec::new();
        for rule in &self.rules {
            rule.collect_resources(&mut out);
        }
        out
    }

    /// Source fields referenced by conditions and lookups, in order of first
    /// appearance, without duplicates.
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        for rule in &self.rules {
            rule.collect_fields(&mut out);
        }
        out
    }
}

impl Rule {
    fn collect_resources<'a>(&'a self, out: &mut Vec<&'a Resource>) {
        for body in std::iter::once(&self.body).chain(self.else_body.as_ref()) {
            for member in &body.members {
                match member {
                    BodyMember::Resource(r) => out.push(r),
                    BodyMember::Rule(rule) => rule.collect_resources(out),
                }
            }
        }
    }

    fn collect_fields(&self, out: &mut Vec<String>) {
        self.condition.collect_fields(out);
        for body in std::iter::once(&self.body).chain(self.else_body.as_ref()) {
            for member in &body.members {
                match member {
                    BodyMember::Resource(r) => {
                        for a in &r.assignments {
                            if let Value::Lookup { field, .. } = &a.value {
                                push_unique(out, field.to_string());
                            }
                        }
                    }
                    BodyMember::Rule(rule) => rule.collect_fields(out),
                }
            }
        }
    }
}

impl Condition {
    fn collect_fields(&self, out: &mut Vec<String>) {
        match self {
            Condition::True | Condition::False => {}
            Condition::Null(f) | Condition::NotNull(f) | Condition::Compare { field: f, .. } => {
                push_unique(out, f.to_string())
            }
            Condition::Not(c) | Condition::Group(c) => c.collect_fields(out),
            Condition::And(l, r) | Condition::Or(l, r) => {
                l.collect_fields(out);
                r.collect_fields(out);
            }
        }
    }
}

fn push_unique(out: &mut Vec<String>, field: String) {
    if !out.contains(&field) {
        out.push(field);
    }
}

// ──────────────────────────────────────────────
// Canonical source rendering
// ──────────────────────────────────────────────

/// Double-quote `s`, escaping what the lexer would otherwise misread.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for VariableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variable {
            Some(v) => write!(f, "{}${{{}}}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => f.write_str(&quote(s)),
            Literal::Number(n) => f.write_str(&n.0),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::True => f.write_str("TRUE"),
            Condition::False => f.write_str("FALSE"),
            Condition::Null(v) => write!(f, "NULL({})", v),
            Condition::NotNull(v) => write!(f, "NOTNULL({})", v),
            Condition::Compare { field, op, literal } => {
                write!(f, "VALUE({}) {} {}", field, op.symbol(), literal)
            }
            Condition::Not(c) => write!(f, "^{}", c),
            Condition::And(l, r) => write!(f, "{} & {}", l, r),
            Condition::Or(l, r) => write!(f, "{} | {}", l, r),
            Condition::Group(c) => write!(f, "({})", c),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(i) = self.index {
            write!(f, "[{}]", i)?;
        }
        if let Some(next) = &self.next {
            write!(f, ".{}", next)?;
        }
        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => f.write_str("TRUE"),
            Value::Bool(false) => f.write_str("FALSE"),
            Value::String(s) => f.write_str(&quote(s)),
            Value::Number(n) => f.write_str(&n.0),
            Value::Reference(r) => write!(f, "REF({}<{}>)", r.resource_type, r.alias),
            Value::ConceptLiteral(c) => {
                write!(f, "CONCEPT_LITERAL({}|{}", c.system, c.code)?;
                if let Some(d) = &c.display {
                    write!(f, "|\"{}\"", d)?;
                }
                f.write_str(")")
            }
            Value::CodeLiteral(code) => write!(f, "CODE_LITERAL({})", code),
            Value::Lookup { kind, field } => write!(f, "{}({})", kind.keyword(), field),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}> ->", self.resource_type, self.alias)?;
        for (i, a) in self.assignments.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{} = {}", sep, a.attribute, a.value)?;
        }
        f.write_str(";")
    }
}

impl Rule {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        f.write_str(&pad)?;
        if let Some(r) = &self.repeats {
            write!(f, "REPEAT({}..{}: {}) ", r.start, r.end, r.variable)?;
        }
        write!(f, "{} ", self.condition)?;
        self.body.write_indented(f, depth)?;
        if let Some(else_body) = &self.else_body {
            f.write_str(" ELSE ")?;
            else_body.write_indented(f, depth)?;
        }
        Ok(())
    }
}

impl Body {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if self.members.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{\n")?;
        for member in &self.members {
            match member {
                BodyMember::Resource(r) => writeln!(f, "{}{}", "  ".repeat(depth + 1), r)?,
                BodyMember::Rule(rule) => {
                    rule.write_indented(f, depth + 1)?;
                    f.write_str("\n")?;
                }
            }
        }
        write!(f, "{}}}", "  ".repeat(depth))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}
