use crate::convert::mhlo_to_stablehlo::HloToStablehloTypeConverter;
use crate::convert::ChangedOp;
use crate::convert::Rewrite;
use crate::convert::RewriteResult;
use crate::convert::Rewriter;
use crate::dialect::func;
use crate::error::LegalizeError;
use crate::ir::Attribute;
use crate::ir::Operation;
use crate::ir::Type;
use crate::ir::TypeConvert;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;

fn needs_conversion(converter: &HloToStablehloTypeConverter, types: &[Type]) -> bool {
    types
        .iter()
        .any(|typ| converter.convert_type(typ).as_ref() != Some(typ))
}

fn convert_types(
    converter: &HloToStablehloTypeConverter,
    op: &str,
    types: &[Type],
) -> Result<Vec<Type>> {
    let mut converted = vec![];
    for typ in types {
        match converter.convert_type(typ) {
            Some(typ) => converted.push(typ),
            None => {
                let op = op.to_string();
                let typ = typ.to_string();
                return Err(LegalizeError::TypeConversion { op, typ }.into());
            }
        }
    }
    Ok(converted)
}

/// Converts the types in the signature of a `func.func` and the types of the
/// arguments of its blocks.
pub struct FuncSignatureConverter {
    converter: HloToStablehloTypeConverter,
}

impl FuncSignatureConverter {
    pub fn new(converter: HloToStablehloTypeConverter) -> Self {
        Self { converter }
    }
    fn argument_types(op: &Operation) -> Vec<Type> {
        let mut types = vec![];
        for region in op.regions().iter() {
            for block in region.rd().blocks().iter() {
                types.extend(block.rd().arguments().types());
            }
        }
        types
    }
}

impl Rewrite for FuncSignatureConverter {
    fn name(&self) -> &'static str {
        "mhlo_to_stablehlo::FuncSignatureConverter"
    }
    fn is_match(&self, op: &Operation) -> Result<bool> {
        if op.name().name() != func::FUNC {
            return Ok(false);
        }
        let typ = match func::function_type(op) {
            Some(typ) => typ,
            None => return Ok(false),
        };
        Ok(needs_conversion(&self.converter, typ.inputs())
            || needs_conversion(&self.converter, typ.results())
            || needs_conversion(&self.converter, &Self::argument_types(op)))
    }
    fn rewrite(&self, op: &Shared<Operation>, rewriter: &mut Rewriter) -> Result<RewriteResult> {
        let old = op.rd();
        let name = format!("@{}", func::sym_name(&old).unwrap_or_default());
        let typ = match func::function_type(&old) {
            Some(typ) => typ,
            None => return Err(anyhow::anyhow!("{name} has no function_type")),
        };
        let converted = self.converter.convert_type(&Type::Function(typ.clone()));
        let converted = match converted {
            Some(converted) => converted,
            None => {
                let typ = typ.to_string();
                return Err(LegalizeError::TypeConversion { op: name, typ }.into());
            }
        };
        for region in old.regions().iter() {
            for block in region.rd().blocks().iter() {
                for argument in block.rd().arguments().iter() {
                    let typ = argument.rd().typ();
                    let typ = convert_types(&self.converter, &name, &[typ])?;
                    rewriter.set_type(argument, typ[0].clone());
                }
            }
        }
        let mut attributes = old.attributes().clone();
        attributes.insert("function_type", Attribute::Type(converted));
        let new = Operation::new(
            old.name().clone(),
            old.operands().clone(),
            old.results().clone(),
            attributes,
            old.regions().clone(),
        );
        let new = rewriter.replace_op(op, new);
        Ok(RewriteResult::Changed(ChangedOp::new(new)))
    }
}

/// Converts the result types of `func.call`.
pub struct CallResultConverter {
    converter: HloToStablehloTypeConverter,
}

impl CallResultConverter {
    pub fn new(converter: HloToStablehloTypeConverter) -> Self {
        Self { converter }
    }
}

impl Rewrite for CallResultConverter {
    fn name(&self) -> &'static str {
        "mhlo_to_stablehlo::CallResultConverter"
    }
    fn is_match(&self, op: &Operation) -> Result<bool> {
        Ok(op.name().name() == func::CALL && needs_conversion(&self.converter, &op.result_types()))
    }
    fn rewrite(&self, op: &Shared<Operation>, rewriter: &mut Rewriter) -> Result<RewriteResult> {
        let old = op.rd();
        let types = convert_types(&self.converter, func::CALL, &old.result_types())?;
        for (result, typ) in old.results().iter().zip(types) {
            rewriter.set_type(result, typ);
        }
        Ok(RewriteResult::Changed(ChangedOp::new(op.clone())))
    }
}
