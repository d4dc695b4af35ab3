//! Repeat expansion.
//!
//! `REPEAT(1..3: i) cond { ... }` becomes three copies of the rule with every
//! `name${i}` replaced by `name1`, `name2` and `name3`. Nested repeat clauses
//! expand inside each copy; an inner clause rebinding a name shadows the
//! outer binding.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{
    Assignment, Body, BodyMember, Condition, Document, Reference, Resource, Rule, SourceRange,
    Value, VariableIdentifier,
};
use crate::error::Diagnostic;

/// Upper bound on the copies a single repeat clause may produce.
pub const MAX_REPEAT_INSTANCES: i64 = 10_000;

/// Upper bound on the rules, at any depth, in an expanded document.
pub const MAX_EXPANDED_RULES: i64 = 100_000;

#[derive(Debug, Clone, Default)]
struct Variables {
    values: BTreeMap<String, i64>,
}

impl Variables {
    fn with(&self, name: &str, value: i64) -> Self {
        let mut values = self.values.clone();
        values.insert(name.to_owned(), value);
        Variables { values }
    }

    fn get(&self, name: &str) -> Result<i64, String> {
        self.values.get(name).copied().ok_or_else(|| {
            let available: Vec<&str> = self.values.keys().map(String::as_str).collect();
            format!(
                "The variable '{}' was not found. Available variables are: [{}].",
                name,
                available.join(", ")
            )
        })
    }
}

/// Expand every repeat clause in `doc`. The result has no repeat clauses and
/// no `${var}` suffixes.
pub fn expand_repeats(doc: &Document) -> Result<Document, Vec<Diagnostic>> {
    let mut expander = Expander::default();
    let mut rules = Vec::new();
    for rule in &doc.rules {
        expander.expand_rule(rule, &Variables::default(), &mut rules);
    }
    if expander.diagnostics.is_empty() {
        debug!(before = doc.rules.len(), after = rules.len(), "expanded repeats");
        Ok(Document { rules })
    } else {
        Err(expander.diagnostics)
    }
}

#[derive(Default)]
struct Expander {
    diagnostics: Vec<Diagnostic>,
    /// Rules instantiated so far.
    produced: i64,
    exhausted: bool,
}

impl Expander {
    fn report(&mut self, range: SourceRange, message: String) {
        let d = Diagnostic::error(
            range.start_line,
            range.start_col,
            range.end_line,
            range.end_col,
            message,
        );
        if !self.diagnostics.contains(&d) {
            self.diagnostics.push(d);
        }
    }

    fn expand_rule(&mut self, rule: &Rule, vars: &Variables, out: &mut Vec<Rule>) {
        if self.exhausted {
            return;
        }
        let Some(repeats) = &rule.repeats else {
            out.push(self.instantiate(rule, vars));
            return;
        };
        let count = repeats.end.saturating_sub(repeats.start).saturating_add(1);
        if repeats.start > repeats.end {
            self.report(
                rule.range,
                format!(
                    "Invalid repeat range {}..{}: start is greater than end",
                    repeats.start, repeats.end
                ),
            );
            return;
        }
        if count > MAX_REPEAT_INSTANCES {
            self.report(
                rule.range,
                format!(
                    "Repeat clause expands to {} copies; the limit is {}",
                    count, MAX_REPEAT_INSTANCES
                ),
            );
            return;
        }
        if self.produced.saturating_add(count) > MAX_EXPANDED_RULES {
            self.exhausted = true;
            self.report(
                rule.range,
                format!(
                    "Repeat expansion exceeds {} rules in total",
                    MAX_EXPANDED_RULES
                ),
            );
            return;
        }
        for k in repeats.start..=repeats.end {
            if self.exhausted {
                return;
            }
            let scoped = vars.with(&repeats.variable, k);
            out.push(self.instantiate(rule, &scoped));
        }
    }

    fn instantiate(&mut self, rule: &Rule, vars: &Variables) -> Rule {
        self.produced += 1;
        Rule {
            repeats: None,
            condition: self.condition(&rule.condition, vars, rule.range),
            body: self.body(&rule.body, vars),
            else_body: rule.else_body.as_ref().map(|b| self.body(b, vars)),
            range: rule.range,
        }
    }

    fn body(&mut self, body: &Body, vars: &Variables) -> Body {
        let mut members = Vec::with_capacity(body.members.len());
        for member in &body.members {
            match member {
                BodyMember::Resource(r) => members.push(BodyMember::Resource(self.resource(r, vars))),
                BodyMember::Rule(rule) => {
                    let mut rules = Vec::new();
                    self.expand_rule(rule, vars, &mut rules);
                    members.extend(rules.into_iter().map(BodyMember::Rule));
                }
            }
        }
        Body { members }
    }

    fn condition(&mut self, c: &Condition, vars: &Variables, range: SourceRange) -> Condition {
        match c {
            Condition::True => Condition::True,
            Condition::False => Condition::False,
            Condition::Null(v) => Condition::Null(self.ident(v, vars, range)),
            Condition::NotNull(v) => Condition::NotNull(self.ident(v, vars, range)),
            Condition::Compare { field, op, literal } => Condition::Compare {
                field: self.ident(field, vars, range),
                op: *op,
                literal: literal.clone(),
            },
            Condition::Not(inner) => Condition::Not(Box::new(self.condition(inner, vars, range))),
            Condition::Group(inner) => {
                Condition::Group(Box::new(self.condition(inner, vars, range)))
            }
            Condition::And(l, r) => Condition::And(
                Box::new(self.condition(l, vars, range)),
                Box::new(self.condition(r, vars, range)),
            ),
            Condition::Or(l, r) => Condition::Or(
                Box::new(self.condition(l, vars, range)),
                Box::new(self.condition(r, vars, range)),
            ),
        }
    }

    fn resource(&mut self, r: &Resource, vars: &Variables) -> Resource {
        let assignments = r
            .assignments
            .iter()
            .map(|a| Assignment {
                attribute: a.attribute.clone(),
                value: self.value(&a.value, vars, r.range),
            })
            .collect();
        Resource {
            resource_type: r.resource_type.clone(),
            alias: self.ident(&r.alias, vars, r.range),
            assignments,
            range: r.range,
        }
    }

    fn value(&mut self, v: &Value, vars: &Variables, range: SourceRange) -> Value {
        match v {
            Value::Reference(reference) => Value::Reference(Reference {
                resource_type: reference.resource_type.clone(),
                alias: self.ident(&reference.alias, vars, range),
            }),
            Value::Lookup { kind, field } => Value::Lookup {
                kind: *kind,
                field: self.ident(field, vars, range),
            },
            other => other.clone(),
        }
    }

    fn ident(
        &mut self,
        id: &VariableIdentifier,
        vars: &Variables,
        range: SourceRange,
    ) -> VariableIdentifier {
        let Some(var) = &id.variable else {
            return id.clone();
        };
        match vars.get(var) {
            Ok(k) => VariableIdentifier::plain(format!("{}{}", id.name, k)),
            Err(message) => {
                self.report(range, message);
                id.clone()
            }
        }
    }
}
