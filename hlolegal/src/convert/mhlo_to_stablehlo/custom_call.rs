use crate::convert::mhlo_to_stablehlo::attr_convert::convert_attr;
use crate::convert::mhlo_to_stablehlo::attr_convert::encode_precision_config;
use crate::convert::mhlo_to_stablehlo::tier::classify;
use crate::convert::mhlo_to_stablehlo::tier::public_feature_version;
use crate::convert::mhlo_to_stablehlo::tier::FeatureTier;
use crate::convert::mhlo_to_stablehlo::outline::outline_region;
use crate::convert::mhlo_to_stablehlo::HloToStablehloTypeConverter;
use crate::convert::mhlo_to_stablehlo::LegalizeOptions;
use crate::convert::ChangedOp;
use crate::convert::Rewrite;
use crate::convert::RewriteResult;
use crate::convert::Rewriter;
use crate::error::LegalizeError;
use crate::ir::Attribute;
use crate::ir::Attributes;
use crate::ir::IntegerAttr;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::TypeConvert;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;

pub const CUSTOM_CALL: &str = "stablehlo.custom_call";

/// Replace `op` by a `stablehlo.custom_call` that describes it.
///
/// ```mlir
/// %0 = "mhlo.dot"(%arg0, %arg1) {precision_config = [#mhlo<precision PACKED_NIBBLE>]} : ...
/// ```
/// becomes
/// ```mlir
/// %0 = "stablehlo.custom_call"(%arg0, %arg1) {call_target_name = "mhlo.dot", mhlo.attributes = {precision_config = ["PACKED_NIBBLE"]}} : ...
/// ```
/// The region of the operation, if any, is outlined into a function that
/// `called_computations` refers to. The encoding version of public features is
/// stored in `mhlo.version`.
pub fn rewrite_as_custom_call(
    op: &Shared<Operation>,
    converter: &dyn TypeConvert,
    rewriter: &mut Rewriter,
) -> Result<RewriteResult> {
    let old = op.rd();
    let name = old.name().to_string();
    if 1 < old.regions().len() {
        let regions = old.regions().len();
        return Err(LegalizeError::TooManyRegions { op: name, regions }.into());
    }

    let mut results = vec![];
    for result in old.results().iter() {
        let typ = result.rd().typ();
        match converter.convert_type(&typ) {
            Some(converted) => results.push((result.clone(), converted)),
            None => {
                let typ = typ.to_string();
                return Err(LegalizeError::TypeConversion { op: name, typ }.into());
            }
        }
    }

    let mut converted = Attributes::new();
    for (attr_name, attr) in old.attributes().iter() {
        let attr = if attr_name == "precision_config" {
            encode_precision_config(attr)
        } else {
            convert_attr(attr)
        };
        match attr {
            Some(attr) => converted.insert(attr_name, attr),
            None => {
                let op = name.clone();
                let name = attr_name.to_string();
                return Err(LegalizeError::AttributeConversion { op, name }.into());
            }
        }
    }

    let called = match old.regions().first() {
        Some(region) => Some(outline_region(&old, region, converter, rewriter)?),
        None => None,
    };

    let mut attributes = Attributes::new();
    attributes.insert("call_target_name", Attribute::string(&name));
    attributes.insert("mhlo.attributes", Attribute::Dictionary(converted));
    if let Some(called) = called {
        let computations = vec![Attribute::SymbolRef(called)];
        attributes.insert("called_computations", Attribute::Array(computations));
    }
    if let Some(version) = public_feature_version(&old) {
        let version = Attribute::Integer(IntegerAttr::i64(version));
        attributes.insert("mhlo.version", version);
    }

    for (result, typ) in results {
        rewriter.set_type(&result, typ);
    }
    let new = Operation::new(
        OperationName::new(CUSTOM_CALL),
        old.operands().clone(),
        old.results().clone(),
        attributes,
        vec![],
    );
    let new = rewriter.replace_op(op, new);
    Ok(RewriteResult::Changed(ChangedOp::new(new)))
}

/// Legalizes MHLO operations that have no StableHLO counterpart at all, such
/// as `mhlo.tan`, via `stablehlo.custom_call`.
pub struct HloToStablehloCustomCallOpConverter {
    source: &'static str,
    converter: HloToStablehloTypeConverter,
    options: LegalizeOptions,
}

impl HloToStablehloCustomCallOpConverter {
    pub fn new(
        source: &'static str,
        converter: HloToStablehloTypeConverter,
        options: LegalizeOptions,
    ) -> Self {
        Self {
            source,
            converter,
            options,
        }
    }
}

impl Rewrite for HloToStablehloCustomCallOpConverter {
    fn name(&self) -> &'static str {
        "mhlo_to_stablehlo::HloToStablehloCustomCallOpConverter"
    }
    fn is_match(&self, op: &Operation) -> Result<bool> {
        Ok(op.name().name() == self.source)
    }
    fn rewrite(&self, op: &Shared<Operation>, rewriter: &mut Rewriter) -> Result<RewriteResult> {
        let tier = classify(&op.rd());
        let name = op.rd().name().to_string();
        match tier {
            FeatureTier::Private => Err(LegalizeError::PrivateFeature { op: name }.into()),
            FeatureTier::Experimental if !self.options.allow_experimental_features => {
                Err(LegalizeError::ExperimentalFeature { op: name }.into())
            }
            FeatureTier::Experimental | FeatureTier::PublicUnsupported { .. } => {
                rewrite_as_custom_call(op, &self.converter, rewriter)
            }
            FeatureTier::Supported => Err(LegalizeError::NoCounterpart { op: name }.into()),
        }
    }
}
