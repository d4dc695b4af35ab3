use super::{PResult, Parser};
use crate::ast::{
    Assignment, Attribute, ConceptLiteral, LookupKind, Number, Reference, Resource, Value,
};
use crate::error::Diagnostic;
use crate::lexer::{Token, TokenKind};

impl<'a> Parser<'a> {
    /// IDENTIFIER '<' variableIdentifier '>' '->' attribute '=' value
    /// (',' attribute '=' value)* ';'
    pub(super) fn parse_resource(&mut self) -> PResult<Resource> {
        let first = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::Lt)?;
        let alias = self.parse_variable_identifier()?;
        self.expect(TokenKind::Gt)?;
        self.expect(TokenKind::Then)?;

        let mut assignments = Vec::new();
        loop {
            let attribute = self.parse_attribute()?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_value()?;
            assignments.push(Assignment { attribute, value });
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::End)?;

        Ok(Resource {
            resource_type: first.text.clone(),
            alias,
            assignments,
            range: self.range_from(first),
        })
    }

    /// IDENTIFIER ('[' NUMBER ']')? ('.' attribute)?
    fn parse_attribute(&mut self) -> PResult<Attribute> {
        let mut segments = Vec::new();
        loop {
            let name = self.expect(TokenKind::Identifier)?.text.clone();
            let index = if self.at(TokenKind::OpenSq) {
                self.advance();
                let t = self.expect(TokenKind::Number)?;
                let index = t.text.parse::<u32>().map_err(|_| {
                    Diagnostic::at_token(t, format!("Invalid attribute index '{}'", t.text))
                })?;
                self.expect(TokenKind::CloseSq)?;
                Some(index)
            } else {
                None
            };
            segments.push((name, index));
            if self.at(TokenKind::Dot) {
                self.advance();
            } else {
                break;
            }
        }

        let mut attr: Option<Attribute> = None;
        for (name, index) in segments.into_iter().rev() {
            attr = Some(Attribute {
                name,
                index,
                next: attr.map(Box::new),
            });
        }
        attr.ok_or_else(|| self.no_viable_alternative())
    }

    fn parse_value(&mut self) -> PResult<Value> {
        let Some(t) = self.cur() else {
            return Err(self.no_viable_alternative());
        };
        let lookup = match t.kind {
            TokenKind::True => {
                self.advance();
                return Ok(Value::Bool(true));
            }
            TokenKind::False => {
                self.advance();
                return Ok(Value::Bool(false));
            }
            TokenKind::String => {
                self.advance();
                return Ok(Value::String(super::unquote(&t.text)));
            }
            TokenKind::Number => {
                self.advance();
                return Ok(Value::Number(Number(t.text.clone())));
            }
            TokenKind::Ref => return self.parse_reference().map(Value::Reference),
            TokenKind::ConceptLiteral => {
                self.advance();
                let payload = self.expect(TokenKind::ConceptValue)?;
                return concept_literal(payload).map(Value::ConceptLiteral);
            }
            TokenKind::CodeLiteral => {
                self.advance();
                let payload = self.expect(TokenKind::CodeValue)?;
                return Ok(Value::CodeLiteral(payload_inner(payload).to_owned()));
            }
            TokenKind::Value => LookupKind::Value,
            TokenKind::Concept => LookupKind::Concept,
            TokenKind::ConceptSelected => LookupKind::ConceptSelected,
            TokenKind::CodeSelected => LookupKind::CodeSelected,
            _ => return Err(self.no_viable_alternative()),
        };
        self.advance();
        let field = self.parse_parenthesised_field()?;
        Ok(Value::Lookup {
            kind: lookup,
            field,
        })
    }

    /// REF '(' IDENTIFIER '<' variableIdentifier '>' ')'
    fn parse_reference(&mut self) -> PResult<Reference> {
        self.expect(TokenKind::Ref)?;
        self.expect(TokenKind::Open)?;
        let resource_type = self.expect(TokenKind::Identifier)?.text.clone();
        self.expect(TokenKind::Lt)?;
        let alias = self.parse_variable_identifier()?;
        self.expect(TokenKind::Gt)?;
        self.expect(TokenKind::Close)?;
        Ok(Reference {
            resource_type,
            alias,
        })
    }
}

/// Text between the parentheses of a literal payload, trimmed.
fn payload_inner(token: &Token) -> &str {
    let text = token.text.as_str();
    text.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text)
        .trim()
}

/// `system|code` or `system|code|"display"`.
fn concept_literal(token: &Token) -> PResult<ConceptLiteral> {
    let inner = payload_inner(token);
    let parts: Vec<&str> = split_outside_quotes(inner).map(str::trim).collect();
    match parts.as_slice() {
        [system, code] if !system.is_empty() && !code.is_empty() => Ok(ConceptLiteral {
            system: (*system).to_owned(),
            code: (*code).to_owned(),
            display: None,
        }),
        [system, code, display] if !system.is_empty() && !code.is_empty() => {
            Ok(ConceptLiteral {
                system: (*system).to_owned(),
                code: (*code).to_owned(),
                display: Some(strip_quotes(display).to_owned()),
            })
        }
        _ => Err(Diagnostic::at_token(
            token,
            format!(
                "Invalid concept literal '{}': expected system|code or system|code|\"display\"",
                inner
            ),
        )),
    }
}

/// Split on `|`, leaving bars inside double quotes alone.
fn split_outside_quotes(s: &str) -> impl Iterator<Item = &str> {
    let mut in_quote = false;
    s.split(move |c: char| {
        if c == '"' {
            in_quote = !in_quote;
        }
        c == '|' && !in_quote
    })
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use crate::ast::{ConceptLiteral, LookupKind, Value};
    use crate::parser::{parse, parse_recovering, DEFAULT_MAX_ERRORS};

    fn single_resource(src: &str) -> crate::ast::Resource {
        let doc = match parse(&format!("TRUE {{ {} }}", src)) {
            Ok(doc) => doc,
            Err(diags) => panic!("parse of {:?} failed: {:?}", src, diags),
        };
        doc.resources()[0].clone()
    }

    #[test]
    fn multiple_assignments_and_value_kinds() {
        let r = single_resource(
            "Observation<obs> -> status = CODE_LITERAL(final), subject = REF(Patient<p>), valueBoolean = TRUE, valueString = 'x', valueInteger = 7, code = CONCEPT_SELECTED(gene), interpretation = CODE_SELECTED(flag), note = VALUE(comments);",
        );
        assert_eq!(r.resource_type, "Observation");
        let values: Vec<_> = r.assignments.iter().map(|a| a.value.clone()).collect();
        assert_eq!(values.len(), 8);
        assert_eq!(values[0], Value::CodeLiteral("final".into()));
        match &values[1] {
            Value::Reference(reference) => {
                assert_eq!(reference.resource_type, "Patient");
                assert_eq!(reference.alias.name, "p");
            }
            other => panic!("expected reference, got {:?}", other),
        }
        assert_eq!(values[2], Value::Bool(true));
        assert_eq!(values[3], Value::String("x".into()));
        assert!(matches!(values[4], Value::Number(_)));
        assert!(matches!(
            values[5],
            Value::Lookup {
                kind: LookupKind::ConceptSelected,
                ..
            }
        ));
        assert!(matches!(
            values[6],
            Value::Lookup {
                kind: LookupKind::CodeSelected,
                ..
            }
        ));
        assert!(matches!(
            values[7],
            Value::Lookup {
                kind: LookupKind::Value,
                ..
            }
        ));
    }

    #[test]
    fn attribute_paths_with_indexes() {
        let r = single_resource("Patient<p> -> identifier[0].type.coding[1].code = 'MR';");
        let attr = &r.assignments[0].attribute;
        assert_eq!(attr.to_string(), "identifier[0].type.coding[1].code");
        assert_eq!(attr.segments().len(), 4);
        assert_eq!(attr.index, Some(0));
    }

    #[test]
    fn concept_literal_parts() {
        let r = single_resource(
            r#"Condition<c> -> code = CONCEPT_LITERAL(http://snomed.info/sct|230690007|"Stroke"), category = CONCEPT_LITERAL(http://loinc.org|48018-6);"#,
        );
        assert_eq!(
            r.assignments[0].value,
            Value::ConceptLiteral(ConceptLiteral {
                system: "http://snomed.info/sct".into(),
                code: "230690007".into(),
                display: Some("Stroke".into()),
            })
        );
        assert_eq!(
            r.assignments[1].value,
            Value::ConceptLiteral(ConceptLiteral {
                system: "http://loinc.org".into(),
                code: "48018-6".into(),
                display: None,
            })
        );
    }

    #[test]
    fn concept_display_may_contain_bars_and_parens() {
        let r = single_resource(
            r#"Condition<c> -> code = CONCEPT_LITERAL(http://x|1|"a|b (c)");"#,
        );
        assert_eq!(
            r.assignments[0].value,
            Value::ConceptLiteral(ConceptLiteral {
                system: "http://x".into(),
                code: "1".into(),
                display: Some("a|b (c)".into()),
            })
        );
        assert_eq!(
            r.assignments[0].value.to_string(),
            r#"CONCEPT_LITERAL(http://x|1|"a|b (c)")"#
        );
    }

    #[test]
    fn malformed_concept_literal_is_an_error() {
        let outcome = parse_recovering(
            "TRUE { Condition<c> -> code = CONCEPT_LITERAL(just-a-code); }",
            DEFAULT_MAX_ERRORS,
        );
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0]
            .message
            .starts_with("Invalid concept literal 'just-a-code'"));
    }

    #[test]
    fn alias_may_carry_repeat_variable() {
        let r = single_resource("Condition<c${i}> -> code = CONCEPT(dx_${i});");
        assert_eq!(r.alias.to_string(), "c${i}");
    }

    #[test]
    fn resource_display_is_canonical() {
        let r = single_resource("Patient<p>->active=TRUE,name[0].family=VALUE(surname);");
        assert_eq!(
            r.to_string(),
            "Patient<p> -> active = TRUE, name[0].family = VALUE(surname);"
        );
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let outcome = parse_recovering(
            "TRUE { Patient<p> -> active = TRUE }",
            DEFAULT_MAX_ERRORS,
        );
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].message,
            "mismatched input '}' expecting ';'"
        );
        assert_eq!(outcome.document.rules.len(), 1);
    }
}
