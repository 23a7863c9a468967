use crate::ir::Attribute;
use crate::ir::Attributes;
use crate::ir::Block;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::Region;
use crate::ir::Values;
use crate::parser::Parser;
use crate::parser::TokenKind;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;

/// The top-level operation that holds the functions of a program.
///
/// The module has one region with one block.
#[derive(Debug)]
pub struct ModuleOp {
    operation: Shared<Operation>,
}

impl Default for ModuleOp {
    fn default() -> Self {
        ModuleOp::new(Attributes::new(), Block::default())
    }
}

impl ModuleOp {
    pub const NAME: &'static str = "builtin.module";

    pub fn new(attributes: Attributes, body: Block) -> Self {
        let body = Shared::new(body.into());
        let region = Shared::new(Region::new(vec![body]).into());
        let operation = Operation::new(
            OperationName::new(ModuleOp::NAME),
            Values::default(),
            Values::default(),
            attributes,
            vec![region],
        );
        Self {
            operation: Shared::new(operation.into()),
        }
    }
    pub fn operation(&self) -> &Shared<Operation> {
        &self.operation
    }
    pub fn body(&self) -> Result<Shared<Block>> {
        let operation = self.operation.rd();
        let region = match operation.regions().first() {
            Some(region) => region.clone(),
            None => return Err(anyhow::anyhow!("Expected 1 region in module, got 0")),
        };
        let block = region.rd().blocks().first().cloned();
        match block {
            Some(block) => Ok(block),
            None => Err(anyhow::anyhow!("Expected 1 block in module, got 0")),
        }
    }
    /// The top-level operations.
    pub fn ops(&self) -> Result<Vec<Shared<Operation>>> {
        Ok(self.body()?.rd().ops().clone())
    }
    pub fn first_op(&self) -> Result<Shared<Operation>> {
        match self.ops()?.first() {
            Some(op) => Ok(op.clone()),
            None => Err(anyhow::anyhow!("Expected 1 op, got 0")),
        }
    }
}

impl Display for ModuleOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let operation = self.operation.rd();
        let mut attributes = operation.attributes().clone();
        write!(f, "module")?;
        if let Some(Attribute::String(name)) = attributes.remove("sym_name") {
            write!(f, " @{name}")?;
        }
        if !attributes.is_empty() {
            write!(f, " attributes {attributes}")?;
        }
        writeln!(f, " {{")?;
        if let Some(region) = operation.regions().first() {
            for block in region.rd().blocks().iter() {
                for op in block.rd().ops().iter() {
                    op.rd().display(f, 1)?;
                    writeln!(f)?;
                }
            }
        }
        write!(f, "}}")
    }
}

impl Parser {
    /// Parse `module [@name] [attributes {...}] { ... }`.
    pub fn parse_module(&mut self) -> Result<ModuleOp> {
        let token = self.expect(TokenKind::BareIdentifier)?;
        if token.lexeme != "module" {
            let msg = format!("Expected module, but got \"{}\"", token.lexeme);
            return Err(anyhow::anyhow!(self.error(&token, &msg)));
        }
        let mut attributes = Attributes::new();
        if self.check(TokenKind::AtIdentifier) {
            let name = self.advance().lexeme[1..].to_string();
            attributes.insert("sym_name", Attribute::String(name));
        }
        if self.check_lexeme(TokenKind::BareIdentifier, "attributes") {
            self.advance();
            for (name, attribute) in self.parse_attributes()?.iter() {
                attributes.insert(name, attribute.clone());
            }
        }
        self.expect(TokenKind::LBrace)?;
        self.push_scope();
        let module = ModuleOp::new(attributes, Block::default());
        self.ops(&module.body()?)?;
        self.pop_scope();
        self.expect(TokenKind::RBrace)?;
        Ok(module)
    }
}

/// Names of the symbols (such as functions) at the top level of a module.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    names: Vec<String>,
}

impl SymbolTable {
    pub fn new(module: &ModuleOp) -> Result<Self> {
        let mut table = SymbolTable::default();
        for op in module.ops()? {
            let op = op.rd();
            if let Some(name) = op.attributes().get("sym_name").and_then(|a| a.as_str()) {
                table.insert(name)?;
            }
        }
        Ok(table)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
    pub fn names(&self) -> &[String] {
        &self.names
    }
    pub fn insert(&mut self, name: &str) -> Result<()> {
        if self.contains(name) {
            return Err(anyhow::anyhow!("Symbol @{name} is already defined"));
        }
        self.names.push(name.to_string());
        Ok(())
    }
    /// Return `base` if it is free, otherwise the first free `base_0`,
    /// `base_1`, and so on.
    ///
    /// Names in `reserved` are treated as taken.
    pub fn unique_name(&self, base: &str, reserved: &[String]) -> String {
        let is_taken = |name: &str| self.contains(name) || reserved.iter().any(|r| r == name);
        if !is_taken(base) {
            return base.to_string();
        }
        let mut counter = 0;
        loop {
            let candidate = format!("{base}_{counter}");
            if !is_taken(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_display() {
        let src = r#"module @jit attributes {mhlo.num_partitions = 1 : i32} {
          func.func private @empty() {
            "func.return"() : () -> ()
          }
        }"#;
        let module = Parser::parse(src).unwrap();
        let expected = indoc::indoc! {r#"
        module @jit attributes {mhlo.num_partitions = 1 : i32} {
          func.func private @empty() {
            "func.return"() : () -> ()
          }
        }"#};
        assert_eq!(module.to_string(), expected);
    }

    #[test]
    fn test_unique_name() {
        let src = r#"
        func.func private @reduce() {
          "func.return"() : () -> ()
        }
        func.func private @reduce_0() {
          "func.return"() : () -> ()
        }
        "#;
        let module = Parser::parse(src).unwrap();
        let mut table = SymbolTable::new(&module).unwrap();
        assert_eq!(table.unique_name("sort", &[]), "sort");
        assert_eq!(table.unique_name("reduce", &[]), "reduce_1");
        let reserved = vec!["reduce_1".to_string()];
        assert_eq!(table.unique_name("reduce", &reserved), "reduce_2");
        table.insert("sort").unwrap();
        assert!(table.insert("sort").is_err());
    }
}
