use super::{PResult, Parser};
use crate::ast::{CompareOp, Condition, Literal, Number, VariableIdentifier};
use crate::error::Diagnostic;
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    // -- Conditions ----------------------------------------------
    //
    // Binding, tightest first: `^`, `&`, `|`. Both binary operators are
    // left-associative.

    pub(super) fn parse_condition(&mut self) -> PResult<Condition> {
        self.parse_or_condition()
    }

    fn parse_or_condition(&mut self) -> PResult<Condition> {
        let mut left = self.parse_and_condition()?;
        while self.at(TokenKind::Or) {
            self.advance();
            let right = self.parse_and_condition()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_condition(&mut self) -> PResult<Condition> {
        let mut left = self.parse_unary_condition()?;
        while self.at(TokenKind::And) {
            self.advance();
            let right = self.parse_unary_condition()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary_condition(&mut self) -> PResult<Condition> {
        if self.at(TokenKind::Not) {
            self.advance();
            let inner = self.nested(|p| p.parse_unary_condition())?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        self.parse_atom_condition()
    }

    fn parse_atom_condition(&mut self) -> PResult<Condition> {
        match self.peek() {
            Some(TokenKind::Open) => {
                self.advance();
                let inner = self.nested(|p| p.parse_condition())?;
                self.expect(TokenKind::Close)?;
                Ok(Condition::Group(Box::new(inner)))
            }
            Some(TokenKind::True) => {
                self.advance();
                Ok(Condition::True)
            }
            Some(TokenKind::False) => {
                self.advance();
                Ok(Condition::False)
            }
            Some(TokenKind::Null) => {
                self.advance();
                Ok(Condition::Null(self.parse_parenthesised_field()?))
            }
            Some(TokenKind::NotNull) => {
                self.advance();
                Ok(Condition::NotNull(self.parse_parenthesised_field()?))
            }
            Some(TokenKind::Value) => {
                self.advance();
                let field = self.parse_parenthesised_field()?;
                let op = self.parse_compare_op()?;
                let literal = self.parse_condition_literal()?;
                Ok(Condition::Compare { field, op, literal })
            }
            _ => Err(self.no_viable_alternative()),
        }
    }

    fn parse_compare_op(&mut self) -> PResult<CompareOp> {
        let op = match self.peek() {
            Some(TokenKind::Eq) => CompareOp::Eq,
            Some(TokenKind::Neq) => CompareOp::Neq,
            Some(TokenKind::Lt) => CompareOp::Lt,
            Some(TokenKind::Gt) => CompareOp::Gt,
            Some(TokenKind::Lte) => CompareOp::Lte,
            Some(TokenKind::Gte) => CompareOp::Gte,
            _ => {
                let msg = format!(
                    "mismatched input {} expecting {{'=', '!=', '<', '>', '<=', '>='}}",
                    self.describe_cur()
                );
                return Err(self.err(msg));
            }
        };
        self.advance();
        Ok(op)
    }

    fn parse_condition_literal(&mut self) -> PResult<Literal> {
        match self.cur() {
            Some(t) if t.kind == TokenKind::String => {
                self.advance();
                Ok(Literal::String(super::unquote(&t.text)))
            }
            Some(t) if t.kind == TokenKind::Number => {
                self.advance();
                Ok(Literal::Number(Number(t.text.clone())))
            }
            Some(t) => Err(Diagnostic::at_token(
                t,
                format!("mismatched input '{}' expecting {{STRING, NUMBER}}", t.text),
            )),
            None => Err(self.err_at_eof("missing {STRING, NUMBER} at '<EOF>'")),
        }
    }

    // -- Fields ------------------------------------------------

    /// '(' variableIdentifier ')'
    pub(super) fn parse_parenthesised_field(&mut self) -> PResult<VariableIdentifier> {
        self.expect(TokenKind::Open)?;
        let field = self.parse_variable_identifier()?;
        self.expect(TokenKind::Close)?;
        Ok(field)
    }

    /// IDENTIFIER ('${' IDENTIFIER '}')?
    pub(super) fn parse_variable_identifier(&mut self) -> PResult<VariableIdentifier> {
        let name = self.expect(TokenKind::Identifier)?.text.clone();
        let variable = if self.at(TokenKind::OpenCurlyDollar) {
            self.advance();
            let var = self.expect(TokenKind::Identifier)?.text.clone();
            self.expect(TokenKind::CloseCurly)?;
            Some(var)
        } else {
            None
        };
        Ok(VariableIdentifier { name, variable })
    }
}
