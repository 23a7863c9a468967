use crate::ir::display_result_types;
use crate::ir::spaces;
use crate::ir::Attribute;
use crate::ir::Attributes;
use crate::ir::Block;
use crate::ir::FunctionType;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::Region;
use crate::ir::Type;
use crate::ir::Value;
use crate::ir::Values;
use crate::parser::Parser;
use crate::parser::TokenKind;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::fmt::Formatter;

pub const FUNC: &str = "func.func";
pub const RETURN: &str = "func.return";
pub const CALL: &str = "func.call";

/// Attributes that are part of the custom `func.func` syntax.
const SIGNATURE_ATTRIBUTES: [&str; 5] = [
    "sym_name",
    "sym_visibility",
    "function_type",
    "arg_attrs",
    "res_attrs",
];

pub fn sym_name(op: &Operation) -> Option<String> {
    op.attributes()
        .get("sym_name")
        .and_then(|a| a.as_str())
        .map(|name| name.to_string())
}

pub fn function_type(op: &Operation) -> Option<FunctionType> {
    match op.attributes().get("function_type") {
        Some(Attribute::Type(Type::Function(typ))) => Some(typ.clone()),
        _ => None,
    }
}

fn sym_visibility(op: &Operation) -> Option<&str> {
    op.attributes().get("sym_visibility").and_then(|a| a.as_str())
}

/// Create a `func.func` that takes ownership of `region`.
pub fn build_func(
    name: &str,
    typ: FunctionType,
    region: Shared<Region>,
    visibility: Option<&str>,
) -> Operation {
    let mut attributes = Attributes::new();
    attributes.insert("sym_name", Attribute::string(name));
    if let Some(visibility) = visibility {
        attributes.insert("sym_visibility", Attribute::string(visibility));
    }
    attributes.insert("function_type", Attribute::Type(Type::Function(typ)));
    Operation::new(
        OperationName::new(FUNC),
        Values::default(),
        Values::default(),
        attributes,
        vec![region],
    )
}

/// The attribute dictionary of argument or result `index`, if not empty.
fn signature_attributes(op: &Operation, key: &str, index: usize) -> Option<Attributes> {
    match op.attributes().get(key) {
        Some(Attribute::Array(elements)) => match elements.get(index) {
            Some(Attribute::Dictionary(attributes)) if !attributes.is_empty() => {
                Some(attributes.clone())
            }
            _ => None,
        },
        _ => None,
    }
}

fn display_results(f: &mut Formatter<'_>, op: &Operation, results: &[Type]) -> std::fmt::Result {
    let has_attributes =
        (0..results.len()).any(|i| signature_attributes(op, "res_attrs", i).is_some());
    if !has_attributes {
        return display_result_types(f, results);
    }
    write!(f, "(")?;
    for (i, typ) in results.iter().enumerate() {
        if 0 < i {
            write!(f, ", ")?;
        }
        write!(f, "{typ}")?;
        if let Some(attributes) = signature_attributes(op, "res_attrs", i) {
            write!(f, " {attributes}")?;
        }
    }
    write!(f, ")")
}

pub fn display_func(op: &Operation, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
    write!(f, "{}{} ", spaces(indent), op.name())?;
    if let Some(visibility) = sym_visibility(op) {
        write!(f, "{visibility} ")?;
    }
    write!(f, "@{}(", sym_name(op).unwrap_or_default())?;
    let typ = function_type(op).unwrap_or_else(|| FunctionType::new(vec![], vec![]));
    let entry = op
        .regions()
        .first()
        .and_then(|region| region.rd().blocks().first().cloned());
    let arguments = match &entry {
        Some(entry) => entry
            .rd()
            .arguments()
            .iter()
            .map(|argument| {
                let argument = argument.rd();
                format!("{}: {}", argument.name(), argument.typ())
            })
            .collect::<Vec<String>>(),
        None => typ.inputs().iter().map(|typ| typ.to_string()).collect(),
    };
    for (i, argument) in arguments.iter().enumerate() {
        if 0 < i {
            write!(f, ", ")?;
        }
        write!(f, "{argument}")?;
        if let Some(attributes) = signature_attributes(op, "arg_attrs", i) {
            write!(f, " {attributes}")?;
        }
    }
    write!(f, ")")?;
    if !typ.results().is_empty() {
        write!(f, " -> ")?;
        display_results(f, op, typ.results())?;
    }
    let attributes = op
        .attributes()
        .iter()
        .filter(|(name, _)| !SIGNATURE_ATTRIBUTES.contains(name))
        .map(|(name, attribute)| (name.to_string(), attribute.clone()))
        .collect::<Attributes>();
    if !attributes.is_empty() {
        write!(f, " attributes {attributes}")?;
    }
    if let Some(region) = op.regions().first() {
        let region = region.rd();
        if region.blocks().is_empty() {
            return Ok(());
        }
        writeln!(f, " {{")?;
        for (index, block) in region.blocks().iter().enumerate() {
            block.rd().display(f, indent, index, 0 < index)?;
        }
        write!(f, "{}}}", spaces(indent))?;
    }
    Ok(())
}

impl Parser {
    /// Parse `{...}` after an argument or result type, or return an empty
    /// dictionary.
    fn parse_signature_attributes(&mut self) -> Result<Attribute> {
        if self.check(TokenKind::LBrace) {
            Ok(Attribute::Dictionary(self.parse_attributes()?))
        } else {
            Ok(Attribute::Dictionary(Attributes::new()))
        }
    }
    fn parse_func_arguments(&mut self) -> Result<(Values, Vec<Type>, Vec<Attribute>)> {
        let mut arguments = vec![];
        let mut types = vec![];
        let mut attributes = vec![];
        self.expect(TokenKind::LParen)?;
        while !self.check(TokenKind::RParen) {
            if self.check(TokenKind::PercentIdentifier) {
                let name = self.expect(TokenKind::PercentIdentifier)?;
                self.expect(TokenKind::Colon)?;
                let typ = self.parse_type()?;
                let argument = Value::block_argument(&name.lexeme, typ.clone());
                self.define(&name, argument.clone())?;
                arguments.push(argument);
                types.push(typ);
            } else {
                types.push(self.parse_type()?);
            }
            attributes.push(self.parse_signature_attributes()?);
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::RParen)?;
        Ok((Values::from_vec(arguments), types, attributes))
    }
    fn parse_func_results(&mut self) -> Result<(Vec<Type>, Vec<Attribute>)> {
        let mut types = vec![];
        let mut attributes = vec![];
        if !self.check(TokenKind::Arrow) {
            return Ok((types, attributes));
        }
        self.advance();
        if self.check(TokenKind::LParen) {
            self.advance();
            while !self.check(TokenKind::RParen) {
                types.push(self.parse_type()?);
                attributes.push(self.parse_signature_attributes()?);
                if !self.check(TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect(TokenKind::RParen)?;
        } else {
            types.push(self.parse_type()?);
            attributes.push(Attribute::Dictionary(Attributes::new()));
        }
        Ok((types, attributes))
    }
    /// Parse `func.func [visibility] @name(%arg0: T) -> R [attributes {...}] [{...}]`.
    pub fn parse_func(&mut self) -> Result<Shared<Operation>> {
        let token = self.expect(TokenKind::BareIdentifier)?;
        let mut attributes = Attributes::new();
        for visibility in ["private", "public", "nested"] {
            if self.check_lexeme(TokenKind::BareIdentifier, visibility) {
                self.advance();
                attributes.insert("sym_visibility", Attribute::string(visibility));
            }
        }
        let name = self.expect(TokenKind::AtIdentifier)?;
        attributes.insert("sym_name", Attribute::string(&name.lexeme[1..]));
        self.push_scope();
        let (arguments, inputs, arg_attrs) = self.parse_func_arguments()?;
        let (results, res_attrs) = self.parse_func_results()?;
        let is_named = arguments.len() == inputs.len();
        let typ = FunctionType::new(inputs, results);
        attributes.insert("function_type", Attribute::Type(Type::Function(typ)));
        let is_empty = |attrs: &[Attribute]| {
            attrs.iter().all(|a| matches!(a, Attribute::Dictionary(d) if d.is_empty()))
        };
        if !is_empty(&arg_attrs) {
            attributes.insert("arg_attrs", Attribute::Array(arg_attrs));
        }
        if !is_empty(&res_attrs) {
            attributes.insert("res_attrs", Attribute::Array(res_attrs));
        }
        if self.check_lexeme(TokenKind::BareIdentifier, "attributes") {
            self.advance();
            for (name, attribute) in self.parse_attributes()?.iter() {
                attributes.insert(name, attribute.clone());
            }
        }
        let mut regions = vec![];
        if self.check(TokenKind::LBrace) {
            if !is_named {
                let msg = "Function body requires named arguments";
                return Err(anyhow::anyhow!(self.error(&token, msg)));
            }
            self.advance();
            let entry = Shared::new(Block::new(None, arguments, vec![]).into());
            self.ops(&entry)?;
            let mut blocks = vec![entry];
            while self.check(TokenKind::CaretIdentifier) {
                blocks.push(self.parse_block()?);
            }
            self.expect(TokenKind::RBrace)?;
            regions.push(Shared::new(Region::new(blocks).into()));
        }
        self.pop_scope();
        let operation = Operation::new(
            OperationName::new(FUNC),
            Values::default(),
            Values::default(),
            attributes,
            regions,
        );
        Ok(Shared::new(operation.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_func_round_trip() {
        let src = indoc::indoc! {r#"
        module {
          func.func private @decl(tensor<f32>) -> (tensor<f32>, tensor<i32>)
          func.func public @main(%arg0: tensor<2xf32> {mhlo.sharding = "{replicated}"}) -> (tensor<2xf32> {jax.result_info = ""}) attributes {mhlo.frontend = "jax"} {
            "func.return"(%arg0) : (tensor<2xf32>) -> ()
          }
        }"#};
        let module = Parser::parse(src).unwrap();
        assert_eq!(module.to_string(), src);

        let ops = module.ops().unwrap();
        let main = ops[1].rd();
        assert_eq!(sym_name(&main), Some("main".to_string()));
        let typ = function_type(&main).unwrap();
        assert_eq!(typ.to_string(), "(tensor<2xf32>) -> tensor<2xf32>");
    }

    #[test]
    fn test_build_func() {
        let typ = FunctionType::new(vec![Type::f32()], vec![Type::f32()]);
        let argument = Value::block_argument("%arg0", Type::f32());
        let ret = Operation::new(
            OperationName::new(RETURN),
            Values::from_vec(vec![argument.clone()]),
            Values::default(),
            Attributes::new(),
            vec![],
        );
        let block = Block::new(None, Values::from_vec(vec![argument]), vec![]);
        let block = Shared::new(block.into());
        block.wr().push(Shared::new(ret.into()));
        let region = Shared::new(Region::new(vec![block]).into());
        let func = build_func("sort", typ, region, Some("private"));
        let expected = indoc::indoc! {r#"
        func.func private @sort(%arg0: f32) -> f32 {
          "func.return"(%arg0) : (f32) -> ()
        }"#};
        assert_eq!(func.to_string(), expected);
    }
}
