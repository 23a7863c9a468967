use crate::convert::mhlo_to_stablehlo::attr_convert::convert_attr;
use crate::convert::mhlo_to_stablehlo::attr_convert::convert_dense_array;
use crate::convert::mhlo_to_stablehlo::custom_call::rewrite_as_custom_call;
use crate::convert::mhlo_to_stablehlo::tier::classify;
use crate::convert::mhlo_to_stablehlo::tier::FeatureTier;
use crate::convert::mhlo_to_stablehlo::HloToStablehloTypeConverter;
use crate::convert::mhlo_to_stablehlo::LegalizeOptions;
use crate::convert::ChangedOp;
use crate::convert::Rewrite;
use crate::convert::RewriteResult;
use crate::convert::Rewriter;
use crate::dialect::stablehlo::OpDef;
use crate::dialect::stablehlo::Regions;
use crate::error::LegalizeError;
use crate::ir::Attribute;
use crate::ir::Attributes;
use crate::ir::EnumKind;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::Region;
use crate::ir::TypeConvert;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;

/// `custom_call_schedule = #mhlo<custom_call_schedule NONE>` carries no
/// information and is dropped from `mhlo.custom_call`.
fn is_default_schedule(op: &str, name: &str, attr: &Attribute) -> bool {
    if op != "mhlo.custom_call" || name != "custom_call_schedule" {
        return false;
    }
    match attr {
        Attribute::Enum(schedule) => {
            schedule.kind() == EnumKind::CustomCallSchedule && schedule.symbol() == Some("NONE")
        }
        _ => false,
    }
}

/// Rewrites an MHLO operation into its StableHLO counterpart.
///
/// One converter is registered per MHLO operation. Operations that use
/// private or experimental features are rejected or encoded as
/// `stablehlo.custom_call`, depending on the [LegalizeOptions].
pub struct HloToStablehloOpConverter {
    source: String,
    /// `None` for operations that exist only so that they can be rejected.
    target: Option<&'static OpDef>,
    converter: HloToStablehloTypeConverter,
    options: LegalizeOptions,
}

impl HloToStablehloOpConverter {
    pub fn new(
        source: &str,
        target: Option<&'static OpDef>,
        converter: HloToStablehloTypeConverter,
        options: LegalizeOptions,
    ) -> Self {
        Self {
            source: source.to_string(),
            target,
            converter,
            options,
        }
    }
    fn convert_attributes(&self, op: &Operation, target: &OpDef) -> Result<Attributes> {
        let mut attributes = Attributes::new();
        let target = target.name();
        for (name, attr) in op.attributes().iter() {
            if is_default_schedule(&self.source, name, attr) {
                continue;
            }
            let converted = convert_dense_array(&target, attr).or_else(|| convert_attr(attr));
            match converted {
                Some(converted) => attributes.insert(name, converted),
                None => {
                    let op = self.source.clone();
                    let name = name.to_string();
                    return Err(LegalizeError::AttributeConversion { op, name }.into());
                }
            }
        }
        Ok(attributes)
    }
    /// Record the conversion of the block argument types of `region`.
    fn convert_region_types(&self, region: &Shared<Region>, rewriter: &mut Rewriter) -> Result<()> {
        for block in region.rd().blocks().iter() {
            for argument in block.rd().arguments().iter() {
                let typ = argument.rd().typ();
                match self.converter.convert_type(&typ) {
                    Some(converted) => rewriter.set_type(argument, converted),
                    None => {
                        let op = self.source.clone();
                        let typ = typ.to_string();
                        return Err(LegalizeError::TypeConversion { op, typ }.into());
                    }
                }
            }
        }
        Ok(())
    }
}

impl Rewrite for HloToStablehloOpConverter {
    fn name(&self) -> &'static str {
        "mhlo_to_stablehlo::HloToStablehloOpConverter"
    }
    fn is_match(&self, op: &Operation) -> Result<bool> {
        Ok(op.name().name() == self.source)
    }
    fn rewrite(&self, op: &Shared<Operation>, rewriter: &mut Rewriter) -> Result<RewriteResult> {
        let name = self.source.clone();
        match classify(&op.rd()) {
            FeatureTier::Private => return Err(LegalizeError::PrivateFeature { op: name }.into()),
            FeatureTier::Experimental if !self.options.allow_experimental_features => {
                return Err(LegalizeError::ExperimentalFeature { op: name }.into());
            }
            FeatureTier::Experimental | FeatureTier::PublicUnsupported { .. } => {
                return rewrite_as_custom_call(op, &self.converter, rewriter);
            }
            FeatureTier::Supported => {}
        }
        let target = match self.target {
            Some(target) => target,
            None => return Err(LegalizeError::NoCounterpart { op: name }.into()),
        };
        let old = op.rd();

        let mut results = vec![];
        for result in old.results().iter() {
            let typ = result.rd().typ();
            match self.converter.convert_type(&typ) {
                Some(converted) => results.push((result.clone(), converted)),
                None => {
                    let typ = typ.to_string();
                    return Err(LegalizeError::TypeConversion { op: name, typ }.into());
                }
            }
        }

        let attributes = self.convert_attributes(&old, target)?;

        let regions = old.regions().len();
        if let Regions::Fixed(expected) = target.regions() {
            if expected != regions {
                return Err(anyhow::anyhow!(
                    "{} expects {expected} regions, but {name} has {regions}",
                    target.name()
                ));
            }
        }
        for region in old.regions().iter() {
            self.convert_region_types(region, rewriter)?;
        }

        for (result, typ) in results {
            rewriter.set_type(&result, typ);
        }
        // For the variadic `stablehlo.case`, the region count is that of
        // the original operation.
        let new = Operation::new(
            OperationName::new(&target.name()),
            old.operands().clone(),
            old.results().clone(),
            attributes,
            old.regions().clone(),
        );
        let new = rewriter.replace_op(op, new);
        Ok(RewriteResult::Changed(ChangedOp::new(new)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::apply_rewrites;
    use crate::dialect::stablehlo;
    use crate::parser::Parser;

    fn converter(source: &str) -> HloToStablehloOpConverter {
        let mnemonic = source.trim_start_matches("mhlo.");
        let target = stablehlo::lookup(mnemonic);
        let options = LegalizeOptions::default();
        HloToStablehloOpConverter::new(source, target, HloToStablehloTypeConverter, options)
    }

    #[test]
    fn test_wrong_region_count() {
        let src = r#"
        func.func @main(%arg0: tensor<i32>) -> tensor<i32> {
          %0 = "mhlo.while"(%arg0) ({
          ^bb0(%x: tensor<i32>):
            "mhlo.return"(%x) : (tensor<i32>) -> ()
          }) : (tensor<i32>) -> tensor<i32>
          "func.return"(%0) : (tensor<i32>) -> ()
        }
        "#;
        let module = Parser::parse(src).unwrap();
        let before = module.to_string();
        let rewrite = converter("mhlo.while");
        let summary = apply_rewrites(&module, &[&rewrite]).unwrap();
        assert_eq!(summary.changed, 0);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(
            summary.failures[0].error.to_string(),
            "stablehlo.while expects 2 regions, but mhlo.while has 1"
        );
        assert_eq!(module.to_string(), before);
    }

    #[test]
    fn test_variadic_regions() {
        let src = r#"
        func.func @main(%arg0: tensor<i32>, %arg1: tensor<f32>) -> tensor<f32> {
          %0 = "mhlo.case"(%arg0) ({
            "mhlo.return"(%arg1) : (tensor<f32>) -> ()
          }, {
            "mhlo.return"(%arg1) : (tensor<f32>) -> ()
          }, {
            "mhlo.return"(%arg1) : (tensor<f32>) -> ()
          }) : (tensor<i32>) -> tensor<f32>
          "func.return"(%0) : (tensor<f32>) -> ()
        }
        "#;
        let module = Parser::parse(src).unwrap();
        let main = module.first_op().unwrap();
        let block = main.rd().regions()[0].rd().blocks()[0].clone();
        let old = block.rd().ops()[0].clone();
        let regions = old.rd().regions().clone();

        let rewrite = converter("mhlo.case");
        let summary = apply_rewrites(&module, &[&rewrite]).unwrap();
        assert_eq!(summary.changed, 1);
        let new = block.rd().ops()[0].clone();
        let new = new.rd();
        assert_eq!(new.name().name(), "stablehlo.case");
        assert_eq!(new.regions().len(), 3);
        for (region, expected) in new.regions().iter().zip(regions.iter()) {
            assert!(std::sync::Arc::ptr_eq(region, expected));
        }
    }
}
