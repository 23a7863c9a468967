use crate::ir::spaces;
use crate::ir::Operation;
use crate::ir::Value;
use crate::ir::Values;
use crate::parser::Parser;
use crate::parser::TokenKind;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Formatter;
use std::sync::Arc;

/// A list of operations with arguments.
#[derive(Debug, Default)]
pub struct Block {
    /// The label such as `^bb0`, if one was parsed.
    label: Option<String>,
    arguments: Values,
    ops: Vec<Shared<Operation>>,
}

impl Block {
    pub fn new(label: Option<String>, arguments: Values, ops: Vec<Shared<Operation>>) -> Self {
        Self {
            label,
            arguments,
            ops,
        }
    }
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
    pub fn arguments(&self) -> &Values {
        &self.arguments
    }
    pub fn ops(&self) -> &Vec<Shared<Operation>> {
        &self.ops
    }
    pub fn push(&mut self, op: Shared<Operation>) {
        self.ops.push(op);
    }
    pub fn index_of(&self, op: &Shared<Operation>) -> Option<usize> {
        self.ops.iter().position(|o| Arc::ptr_eq(o, op))
    }
    /// Replace `old` by `new` at the same position.
    pub fn replace(&mut self, old: &Shared<Operation>, new: Shared<Operation>) -> Result<()> {
        match self.index_of(old) {
            Some(index) => {
                self.ops[index] = new;
                Ok(())
            }
            None => Err(anyhow::anyhow!(
                "Operation {} not found in block",
                old.rd().name()
            )),
        }
    }
    /// The last operation of the block.
    pub fn terminator(&self) -> Option<Shared<Operation>> {
        self.ops.last().cloned()
    }
    /// Print the block at the indentation of the operation that owns it.
    ///
    /// The label is printed when `show_label` is set; the operations are
    /// indented one level deeper.
    pub fn display(
        &self,
        f: &mut Formatter<'_>,
        indent: i32,
        index: usize,
        show_label: bool,
    ) -> std::fmt::Result {
        if show_label {
            let label = match &self.label {
                Some(label) => label.clone(),
                None => format!("^bb{index}"),
            };
            write!(f, "{}{label}", spaces(indent))?;
            if !self.arguments.is_empty() {
                write!(f, "({})", self.arguments.display_with_types())?;
            }
            writeln!(f, ":")?;
        }
        for op in self.ops.iter() {
            op.rd().display(f, indent + 1)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Parser {
    /// Parse `(%arg0: tensor<f32>, %arg1: tensor<f32>)` and define the
    /// arguments in the current scope.
    pub fn parse_block_arguments(&mut self) -> Result<Values> {
        let mut arguments = vec![];
        self.expect(TokenKind::LParen)?;
        while self.check(TokenKind::PercentIdentifier) {
            let name = self.expect(TokenKind::PercentIdentifier)?;
            self.expect(TokenKind::Colon)?;
            let typ = self.parse_type()?;
            let argument = Value::block_argument(&name.lexeme, typ);
            self.define(&name, argument.clone())?;
            arguments.push(argument);
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::RParen)?;
        Ok(Values::from_vec(arguments))
    }
    /// Parse a block with an optional label such as `^bb0(%x: f32):`.
    pub fn parse_block(&mut self) -> Result<Shared<Block>> {
        let (label, arguments) = if self.check(TokenKind::CaretIdentifier) {
            let label = self.expect(TokenKind::CaretIdentifier)?;
            let arguments = if self.check(TokenKind::LParen) {
                self.parse_block_arguments()?
            } else {
                Values::default()
            };
            self.expect(TokenKind::Colon)?;
            (Some(label.lexeme), arguments)
        } else {
            (None, Values::default())
        };
        let block = Shared::new(Block::new(label, arguments, vec![]).into());
        self.ops(&block)?;
        Ok(block)
    }
}
