use crate::ir::spaces;
use crate::ir::Block;
use crate::ir::Operation;
use crate::ir::Value;
use crate::parser::Parser;
use crate::parser::TokenKind;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::collections::HashSet;
use std::fmt::Formatter;
use std::sync::Arc;

/// A list of blocks owned by an operation.
#[derive(Debug, Default)]
pub struct Region {
    blocks: Vec<Shared<Block>>,
}

fn key(value: &Shared<Value>) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

fn collect_definitions(op: &Operation, defined: &mut HashSet<usize>) {
    for result in op.results().iter() {
        defined.insert(key(result));
    }
    for region in op.regions() {
        region.rd().collect_region_definitions(defined);
    }
}

impl Region {
    pub fn new(blocks: Vec<Shared<Block>>) -> Self {
        Self { blocks }
    }
    pub fn blocks(&self) -> &Vec<Shared<Block>> {
        &self.blocks
    }
    fn collect_region_definitions(&self, defined: &mut HashSet<usize>) {
        for block in self.blocks.iter() {
            let block = block.rd();
            for argument in block.arguments().iter() {
                defined.insert(key(argument));
            }
            for op in block.ops().iter() {
                collect_definitions(&op.rd(), defined);
            }
        }
    }
    fn collect_uses(&self, defined: &HashSet<usize>, captured: &mut Vec<Shared<Value>>) {
        for block in self.blocks.iter() {
            for op in block.rd().ops().iter() {
                let op = op.rd();
                for operand in op.operands().iter() {
                    let is_new = !captured.iter().any(|c| Arc::ptr_eq(c, operand));
                    if !defined.contains(&key(operand)) && is_new {
                        captured.push(operand.clone());
                    }
                }
                for region in op.regions() {
                    region.rd().collect_uses(defined, captured);
                }
            }
        }
    }
    /// Values that are used inside the region but defined outside of it.
    ///
    /// A region without such values is isolated from above.
    pub fn captured_values(&self) -> Vec<Shared<Value>> {
        let mut defined = HashSet::new();
        self.collect_region_definitions(&mut defined);
        let mut captured = vec![];
        self.collect_uses(&defined, &mut captured);
        captured
    }
    /// Print the region including braces; `indent` is the indentation of the
    /// operation that owns the region.
    pub fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        writeln!(f, "{{")?;
        let show_labels = 1 < self.blocks.len();
        for (index, block) in self.blocks.iter().enumerate() {
            let block = block.rd();
            let show_label = show_labels || !block.arguments().is_empty();
            block.display(f, indent, index, show_label)?;
        }
        write!(f, "{}}}", spaces(indent))
    }
}

impl Parser {
    /// Parse `{ ... }` with one or more blocks.
    pub fn parse_region(&mut self) -> Result<Shared<Region>> {
        self.expect(TokenKind::LBrace)?;
        self.push_scope();
        let mut blocks = vec![self.parse_block()?];
        while self.check(TokenKind::CaretIdentifier) {
            blocks.push(self.parse_block()?);
        }
        self.pop_scope();
        self.expect(TokenKind::RBrace)?;
        Ok(Shared::new(Region::new(blocks).into()))
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::Parser;
    use crate::shared::SharedExt;

    #[test]
    fn test_captured_values() {
        let src = r#"
        func.func @main(%arg0: tensor<f32>, %arg1: tensor<f32>) -> tensor<f32> {
          %0 = "mhlo.map"(%arg0) ({
          ^bb0(%a: tensor<f32>):
            %1 = "mhlo.add"(%a, %arg1) : (tensor<f32>, tensor<f32>) -> tensor<f32>
            "mhlo.return"(%1) : (tensor<f32>) -> ()
          }) {dimensions = dense<0> : tensor<1xi64>} : (tensor<f32>) -> tensor<f32>
          "func.return"(%0) : (tensor<f32>) -> ()
        }
        "#;
        let module = Parser::parse(src).unwrap();
        let func = module.ops().unwrap()[0].clone();
        let func = func.rd();
        let body = func.regions()[0].rd().blocks()[0].clone();
        let map = body.rd().ops()[0].clone();
        let region = map.rd().regions()[0].clone();
        let captured = region.rd().captured_values();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].rd().name(), "%arg1");

        let func_region = func.regions()[0].clone();
        assert!(func_region.rd().captured_values().is_empty());
    }
}
