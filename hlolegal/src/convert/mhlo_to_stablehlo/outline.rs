use crate::convert::Rewriter;
use crate::dialect::func;
use crate::error::LegalizeError;
use crate::ir::FunctionType;
use crate::ir::Operation;
use crate::ir::Region;
use crate::ir::TypeConvert;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;

/// Move the only block of `region` into a new `func.func` at the end of the
/// module and return the name of that function.
///
/// The function takes the (converted) block arguments and returns the
/// operands of the terminator. Its name is the operation name without the
/// dialect prefix, made unique within the module.
pub fn outline_region(
    op: &Operation,
    region: &Shared<Region>,
    converter: &dyn TypeConvert,
    rewriter: &mut Rewriter,
) -> Result<String> {
    let name = op.name().to_string();
    let blocks = region.rd().blocks().clone();
    let block = match blocks.as_slice() {
        [block] => block.clone(),
        _ => {
            let blocks = blocks.len();
            return Err(LegalizeError::MultiBlockRegion { op: name, blocks }.into());
        }
    };
    let captured = region.rd().captured_values();
    if !captured.is_empty() {
        let values = captured
            .iter()
            .map(|value| value.rd().name().to_string())
            .collect::<Vec<String>>()
            .join(", ");
        return Err(LegalizeError::CapturedValues { op: name, values }.into());
    }

    let mut inputs = vec![];
    for argument in block.rd().arguments().iter() {
        let typ = argument.rd().typ();
        let converted = match converter.convert_type(&typ) {
            Some(converted) => converted,
            None => {
                let typ = typ.to_string();
                return Err(LegalizeError::TypeConversion { op: name, typ }.into());
            }
        };
        rewriter.set_type(argument, converted.clone());
        inputs.push(converted);
    }
    let terminator = match block.rd().terminator() {
        Some(terminator) => terminator,
        None => return Err(LegalizeError::MissingTerminator { op: name }.into()),
    };
    let mut results = vec![];
    for typ in terminator.rd().operand_types() {
        match converter.convert_type(&typ) {
            Some(converted) => results.push(converted),
            None => {
                let typ = typ.to_string();
                return Err(LegalizeError::TypeConversion { op: name, typ }.into());
            }
        }
    }

    let symbol = rewriter.reserve_symbol(op.name().strip_dialect());
    let typ = FunctionType::new(inputs, results);
    let func = func::build_func(&symbol, typ, region.clone(), None);
    rewriter.insert_func(func)?;
    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::mhlo_to_stablehlo::HloToStablehloTypeConverter;
    use crate::ir::ModuleOp;
    use crate::ir::SymbolTable;
    use crate::parser::Parser;

    fn outline(module: &ModuleOp) -> Result<String> {
        let symbols = SymbolTable::new(module)?;
        let main = module.first_op()?;
        let block = main.rd().regions()[0].rd().blocks()[0].clone();
        let op = block.rd().ops()[0].clone();
        let mut rewriter = Rewriter::new(block, module, &symbols);
        let op = op.rd();
        let region = op.regions()[0].clone();
        let converter = HloToStablehloTypeConverter;
        let first = outline_region(&op, &region, &converter, &mut rewriter)?;
        let second = outline_region(&op, &region, &converter, &mut rewriter)?;
        Ok(format!("{first} {second}"))
    }

    #[test]
    fn test_outline_twice() {
        let src = r#"
        func.func @main(%arg0: tensor<4xf32>, %arg1: tensor<f32>) -> tensor<f32> {
          %0 = "mhlo.reduce"(%arg0, %arg1) ({
          ^bb0(%a: tensor<f32>, %b: tensor<f32>):
            %1 = "mhlo.add"(%a, %b) : (tensor<f32>, tensor<f32>) -> tensor<f32>
            "mhlo.return"(%1) : (tensor<f32>) -> ()
          }) : (tensor<4xf32>, tensor<f32>) -> tensor<f32>
          "func.return"(%0) : (tensor<f32>) -> ()
        }
        func.func private @reduce() {
          "func.return"() : () -> ()
        }
        "#;
        let module = Parser::parse(src).unwrap();
        assert_eq!(outline(&module).unwrap(), "reduce_0 reduce_1");
    }

    #[test]
    fn test_multiple_blocks() {
        let src = r#"
        func.func @main(%arg0: tensor<4xf32>, %arg1: tensor<f32>) -> tensor<f32> {
          %0 = "mhlo.reduce"(%arg0, %arg1) ({
          ^bb0(%a: tensor<f32>, %b: tensor<f32>):
            "mhlo.return"(%a) : (tensor<f32>) -> ()
          ^bb1:
            "mhlo.return"(%b) : (tensor<f32>) -> ()
          }) : (tensor<4xf32>, tensor<f32>) -> tensor<f32>
          "func.return"(%0) : (tensor<f32>) -> ()
        }
        "#;
        let module = Parser::parse(src).unwrap();
        let err = outline(&module).err().unwrap();
        assert_eq!(
            err.to_string(),
            "region of mhlo.reduce must have exactly one block, but has 2"
        );
    }
}
