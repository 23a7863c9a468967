use crate::dialect::func;
use crate::dialect::Namespace;
use crate::ir::display_result_types;
use crate::ir::display_types;
use crate::ir::escape;
use crate::ir::spaces;
use crate::ir::unescape;
use crate::ir::Attributes;
use crate::ir::Region;
use crate::ir::Type;
use crate::ir::Value;
use crate::ir::Values;
use crate::parser::Parser;
use crate::parser::Token;
use crate::parser::TokenKind;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationName {
    name: String,
}

impl OperationName {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The dialect namespace such as [Namespace::Mhlo] for `mhlo.add`.
    pub fn dialect(&self) -> Option<Namespace> {
        Namespace::of_op(&self.name)
    }
    /// The name without the dialect prefix (`add` for `mhlo.add`).
    pub fn strip_dialect(&self) -> &str {
        match self.name.split_once('.') {
            Some((_, rest)) => rest,
            None => &self.name,
        }
    }
}

impl Display for OperationName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "<unknown>")?;
        }
        write!(f, "{}", self.name)
    }
}

/// An operation in generic form.
///
/// Every operation, including functions and modules, is represented by this
/// type. Dialect-specific information lives in the name and the attributes.
#[derive(Debug)]
pub struct Operation {
    name: OperationName,
    operands: Values,
    results: Values,
    attributes: Attributes,
    regions: Vec<Shared<Region>>,
}

impl Operation {
    pub fn new(
        name: OperationName,
        operands: Values,
        results: Values,
        attributes: Attributes,
        regions: Vec<Shared<Region>>,
    ) -> Self {
        Self {
            name,
            operands,
            results,
            attributes,
            regions,
        }
    }
    pub fn name(&self) -> &OperationName {
        &self.name
    }
    pub fn operands(&self) -> &Values {
        &self.operands
    }
    pub fn operand_types(&self) -> Vec<Type> {
        self.operands.types()
    }
    pub fn results(&self) -> &Values {
        &self.results
    }
    pub fn result_types(&self) -> Vec<Type> {
        self.results.types()
    }
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }
    pub fn regions(&self) -> &Vec<Shared<Region>> {
        &self.regions
    }
    fn display_generic(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        write!(f, "{}", spaces(indent))?;
        if !self.results.is_empty() {
            write!(f, "{} = ", self.results)?;
        }
        write!(f, "\"{}\"({})", escape(self.name.name()), self.operands)?;
        if !self.regions.is_empty() {
            write!(f, " (")?;
            for (i, region) in self.regions.iter().enumerate() {
                if 0 < i {
                    write!(f, ", ")?;
                }
                region.rd().display(f, indent)?;
            }
            write!(f, ")")?;
        }
        if !self.attributes.is_empty() {
            write!(f, " {}", self.attributes)?;
        }
        write!(f, " : ({}) -> ", display_types(&self.operand_types()))?;
        display_result_types(f, &self.result_types())
    }
    /// Print the operation at the given indentation without a trailing
    /// newline.
    pub fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        if self.name.name() == func::FUNC {
            func::display_func(self, f, indent)
        } else {
            self.display_generic(f, indent)
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f, 0)
    }
}

impl Parser {
    /// Parse `%0, %1 =` if present.
    fn parse_result_names(&mut self) -> Result<Vec<Token>> {
        let mut names = vec![];
        if !self.check(TokenKind::PercentIdentifier) {
            return Ok(names);
        }
        loop {
            names.push(self.expect(TokenKind::PercentIdentifier)?);
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::Equal)?;
        Ok(names)
    }
    /// Parse `({ ... }, { ... })` if present.
    fn parse_op_regions(&mut self) -> Result<Vec<Shared<Region>>> {
        let mut regions = vec![];
        if !(self.check(TokenKind::LParen) && self.peek_n(1).kind == TokenKind::LBrace) {
            return Ok(regions);
        }
        self.advance();
        loop {
            regions.push(self.parse_region()?);
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::RParen)?;
        Ok(regions)
    }
    fn verify_operand_types(
        &self,
        token: &Token,
        name: &str,
        operands: &[Shared<Value>],
        expected: &[Type],
    ) -> Result<()> {
        if operands.len() != expected.len() {
            let msg = format!(
                "{name} has {} operands, but its signature lists {} types",
                operands.len(),
                expected.len()
            );
            return Err(anyhow::anyhow!(self.error(token, &msg)));
        }
        for (operand, expected) in operands.iter().zip(expected) {
            let operand = operand.rd();
            let actual = operand.typ();
            if &actual != expected {
                let msg = format!(
                    "Operand {} has type {actual}, but {name} expects {expected}",
                    operand.name()
                );
                return Err(anyhow::anyhow!(self.error(token, &msg)));
            }
        }
        Ok(())
    }
    fn parse_generic_op(&mut self, names: Vec<Token>) -> Result<Shared<Operation>> {
        let token = self.expect(TokenKind::String)?;
        let name = unescape(&token.lexeme[1..token.lexeme.len() - 1]);
        self.expect(TokenKind::LParen)?;
        let operands = self.operands()?;
        self.expect(TokenKind::RParen)?;
        let regions = self.parse_op_regions()?;
        let mut attributes = Attributes::new();
        if self.check(TokenKind::Less) {
            // Properties such as `<{dimension = 0 : i64}>`.
            self.advance();
            for (key, value) in self.parse_attributes()?.iter() {
                attributes.insert(key, value.clone());
            }
            self.expect(TokenKind::Greater)?;
        }
        if self.check(TokenKind::LBrace) {
            for (key, value) in self.parse_attributes()?.iter() {
                attributes.insert(key, value.clone());
            }
        }
        self.expect(TokenKind::Colon)?;
        let signature = self.parse_function_type()?;
        self.verify_operand_types(&token, &name, &operands, signature.inputs())?;
        if names.len() != signature.results().len() {
            let msg = format!(
                "{name} defines {} results, but its signature lists {} types",
                names.len(),
                signature.results().len()
            );
            return Err(anyhow::anyhow!(self.error(&token, &msg)));
        }
        let mut results = vec![];
        for (result, typ) in names.iter().zip(signature.results()) {
            let value = Value::op_result(&result.lexeme, typ.clone());
            self.define(result, value.clone())?;
            results.push(value);
        }
        let operation = Operation::new(
            OperationName::new(&name),
            Values::from_vec(operands),
            Values::from_vec(results),
            attributes,
            regions,
        );
        Ok(Shared::new(operation.into()))
    }
    /// Parse an operation in generic form or `func.func`.
    pub fn parse_op(&mut self) -> Result<Shared<Operation>> {
        let names = self.parse_result_names()?;
        let token = self.peek().clone();
        match token.kind {
            TokenKind::String => self.parse_generic_op(names),
            TokenKind::BareIdentifier if token.lexeme == func::FUNC && names.is_empty() => {
                self.parse_func()
            }
            _ => {
                let msg = format!("Expected operation, but got \"{}\"", token.lexeme);
                Err(anyhow::anyhow!(self.error(&token, &msg)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_name() {
        let name = OperationName::new("mhlo.add");
        assert_eq!(name.dialect(), Some(Namespace::Mhlo));
        assert_eq!(name.strip_dialect(), "add");
        let name = OperationName::new("mhlo.xla.rng_get_and_update_state");
        assert_eq!(name.strip_dialect(), "xla.rng_get_and_update_state");
        assert_eq!(OperationName::new("func.return").dialect(), None);
    }

    #[test]
    fn test_generic_round_trip() {
        let src = r#"%0 = "mhlo.compare"() <{comparison_direction = #mhlo<comparison_direction GT>}> : () -> tensor<i1>"#;
        let op = Parser::parse_single_op(src).unwrap();
        let op = op.rd();
        assert_eq!(
            op.to_string(),
            r#"%0 = "mhlo.compare"() {comparison_direction = #mhlo<comparison_direction GT>} : () -> tensor<i1>"#
        );
    }

    #[test]
    fn test_result_count_mismatch() {
        let src = r#"%0 = "mhlo.after_all"() : () -> (!mhlo.token, !mhlo.token)"#;
        let err = Parser::parse_single_op(src).unwrap_err().to_string();
        assert!(err.contains("defines 1 results"));
    }
}
