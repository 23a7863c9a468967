//! Legalization of MHLO to StableHLO.
//!
//! Every MHLO operation with a StableHLO counterpart is rewritten 1:1 by a
//! [HloToStablehloOpConverter](generic::HloToStablehloOpConverter). Operations
//! that use features which StableHLO does not have are either rejected or
//! encoded as `stablehlo.custom_call`, depending on their [FeatureTier].

mod attr_convert;
mod custom_call;
mod func;
mod generic;
mod outline;
mod tier;
mod type_convert;

pub use attr_convert::convert_attr;
pub use attr_convert::convert_dense_array;
pub use attr_convert::encode_precision_config;
pub use tier::classify;
pub use tier::public_feature_version;
pub use tier::FeatureTier;
pub use type_convert::HloToStablehloTypeConverter;

use crate::convert::apply_rewrites;
use crate::convert::walk;
use crate::convert::ChangedOp;
use crate::convert::Pass;
use crate::convert::Rewrite;
use crate::convert::RewriteResult;
use crate::dialect::mhlo;
use crate::dialect::stablehlo;
use crate::dialect::Namespace;
use crate::error::LegalizeError;
use crate::ir::ModuleOp;
use crate::ir::Operation;
use crate::shared::SharedExt;
use anyhow::Result;
use custom_call::HloToStablehloCustomCallOpConverter;
use func::CallResultConverter;
use func::FuncSignatureConverter;
use generic::HloToStablehloOpConverter;
use std::sync::Arc;
use tracing::info;
use tracing::warn;

/// Options of the legalization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LegalizeOptions {
    /// Legalize experimental features through `stablehlo.custom_call`
    /// instead of rejecting them.
    pub allow_experimental_features: bool,
}

/// The rewrites of a conversion in the order in which they are tried.
#[derive(Default)]
pub struct RewritePatternSet {
    patterns: Vec<Box<dyn Rewrite>>,
}

impl RewritePatternSet {
    pub fn add(&mut self, pattern: Box<dyn Rewrite>) {
        self.patterns.push(pattern);
    }
    pub fn len(&self) -> usize {
        self.patterns.len()
    }
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
    pub fn rewrites(&self) -> Vec<&dyn Rewrite> {
        self.patterns.iter().map(|pattern| pattern.as_ref()).collect()
    }
}

/// Register the rewrites that legalize MHLO to StableHLO.
///
/// All rewrites share one type converter and the same options.
pub fn populate_hlo_to_stablehlo_patterns(options: &LegalizeOptions) -> RewritePatternSet {
    let converter = HloToStablehloTypeConverter;
    let options = *options;
    let mut patterns = RewritePatternSet::default();
    patterns.add(Box::new(FuncSignatureConverter::new(converter)));
    patterns.add(Box::new(CallResultConverter::new(converter)));
    for def in stablehlo::OPS {
        let source = format!("mhlo.{}", def.mnemonic());
        if mhlo::counterpart(&source).is_some() {
            let pattern = HloToStablehloOpConverter::new(&source, Some(def), converter, options);
            patterns.add(Box::new(pattern));
        }
    }
    // Private operations are registered so that they fail with a reason.
    for source in mhlo::PRIVATE_OPS {
        let pattern = HloToStablehloOpConverter::new(source, None, converter, options);
        patterns.add(Box::new(pattern));
    }
    for source in mhlo::CUSTOM_CALL_ONLY_OPS {
        let pattern = HloToStablehloCustomCallOpConverter::new(source, converter, options);
        patterns.add(Box::new(pattern));
    }
    patterns
}

/// Whether an operation may remain after the legalization.
///
/// MHLO operations are illegal, and so are functions and calls whose types
/// still need conversion.
fn is_legal(op: &Operation) -> Result<bool> {
    if op.name().dialect() == Some(Namespace::Mhlo) {
        return Ok(false);
    }
    let converter = HloToStablehloTypeConverter;
    let signature = FuncSignatureConverter::new(converter);
    let call = CallResultConverter::new(converter);
    Ok(!signature.is_match(op)? && !call.is_match(op)?)
}

pub struct ConvertMhloToStablehlo;

impl Pass for ConvertMhloToStablehlo {
    const NAME: &'static str = "convert-mhlo-to-stablehlo";
    /// Legalize all MHLO operations in the module.
    ///
    /// Fails if any MHLO operation or any function signature with MHLO
    /// types is left afterwards. Operations that were legalized before the
    /// failure stay legalized.
    fn convert(module: &ModuleOp, options: &LegalizeOptions) -> Result<RewriteResult> {
        let patterns = populate_hlo_to_stablehlo_patterns(options);
        let rewrites = patterns.rewrites();
        // Outlined functions hold operations that were not part of the
        // previous walk, so repeat until nothing changes.
        let mut changed = 0;
        let summary = loop {
            let summary = apply_rewrites(module, &rewrites)?;
            changed += summary.changed;
            if summary.changed == 0 {
                break summary;
            }
        };
        info!(
            "Legalized {changed} operations, {} failed",
            summary.failures.len()
        );
        let mut unconverted = vec![];
        for (_, op) in walk(module)? {
            let name = op.rd().name().clone();
            if is_legal(&op.rd())? {
                continue;
            }
            let failure = summary
                .failures
                .iter()
                .find(|failure| Arc::ptr_eq(&failure.op, &op));
            let reason = match failure {
                Some(failure) => failure.error.to_string(),
                None => "no rewrite matched".to_string(),
            };
            warn!("{name} was not legalized: {reason}");
            unconverted.push((name.to_string(), reason));
        }
        if let Some((op, reason)) = unconverted.into_iter().next() {
            return Err(LegalizeError::Unconverted { op, reason }.into());
        }
        if changed == 0 {
            Ok(RewriteResult::Unchanged)
        } else {
            let op = module.operation().clone();
            Ok(RewriteResult::Changed(ChangedOp::new(op)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn legalize(src: &str, allow_experimental_features: bool) -> (ModuleOp, Result<RewriteResult>) {
        let module = Parser::parse(src).unwrap();
        let options = LegalizeOptions {
            allow_experimental_features,
        };
        let result = ConvertMhloToStablehlo::convert(&module, &options);
        (module, result)
    }

    fn unconverted(result: Result<RewriteResult>) -> (String, String) {
        let err = result.err().unwrap();
        match err.downcast_ref::<LegalizeError>() {
            Some(LegalizeError::Unconverted { op, reason }) => (op.clone(), reason.clone()),
            _ => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn test_patterns() {
        let patterns = populate_hlo_to_stablehlo_patterns(&LegalizeOptions::default());
        let generic = stablehlo::OPS
            .iter()
            .filter(|def| mhlo::counterpart(&format!("mhlo.{}", def.mnemonic())).is_some())
            .count();
        let expected = 2 + generic + mhlo::PRIVATE_OPS.len() + mhlo::CUSTOM_CALL_ONLY_OPS.len();
        assert_eq!(patterns.len(), expected);
        assert!(!patterns.is_empty());
    }

    #[test]
    fn test_add() {
        let src = r#"
        func.func @main(%arg0: tensor<2xf32>) -> tensor<2xf32> {
          %0 = "mhlo.add"(%arg0, %arg0) : (tensor<2xf32>, tensor<2xf32>) -> tensor<2xf32>
          "func.return"(%0) : (tensor<2xf32>) -> ()
        }
        "#;
        let (module, result) = legalize(src, false);
        assert!(result.unwrap().is_changed().is_some());
        let repr = module.to_string();
        assert!(repr.contains(
            r#"%0 = "stablehlo.add"(%arg0, %arg0) : (tensor<2xf32>, tensor<2xf32>) -> tensor<2xf32>"#
        ));

        let options = LegalizeOptions::default();
        let result = ConvertMhloToStablehlo::convert(&module, &options).unwrap();
        assert!(result == RewriteResult::Unchanged);
        assert_eq!(module.to_string(), repr);
    }

    #[test]
    fn test_private_feature() {
        let src = r#"
        func.func @main(%arg0: tensor<f32>) -> tensor<f32> {
          %0 = "mhlo.bitcast"(%arg0) : (tensor<f32>) -> tensor<f32>
          "func.return"(%0) : (tensor<f32>) -> ()
        }
        "#;
        let expected = Parser::parse(src).unwrap().to_string();
        for allow in [false, true] {
            let (module, result) = legalize(src, allow);
            let (op, reason) = unconverted(result);
            assert_eq!(op, "mhlo.bitcast");
            assert!(reason.contains("private feature"));
            assert_eq!(module.to_string(), expected);
        }
    }

    #[test]
    fn test_comparison_direction() {
        let src = r#"
        func.func @main(%arg0: tensor<f32>) -> tensor<i1> {
          %0 = "mhlo.compare"(%arg0, %arg0) {comparison_direction = #mhlo<comparison_direction GT>} : (tensor<f32>, tensor<f32>) -> tensor<i1>
          "func.return"(%0) : (tensor<i1>) -> ()
        }
        "#;
        let (module, result) = legalize(src, false);
        result.unwrap();
        let repr = module.to_string();
        assert!(repr.contains(
            r#""stablehlo.compare"(%arg0, %arg0) {comparison_direction = #stablehlo<comparison_direction GT>}"#
        ));

        let src = src.replace("GT", "INVENTED");
        let (module, result) = legalize(&src, false);
        let (op, reason) = unconverted(result);
        assert_eq!(op, "mhlo.compare");
        assert_eq!(reason, "failed to convert attribute comparison_direction of mhlo.compare");
        assert!(module.to_string().contains("\"mhlo.compare\""));
    }

    #[test]
    fn test_unconverted_signature() {
        let src = r#"
        func.func private @decl(!mhlo.async_bundle<tensor<f32>>) -> tensor<f32>
        func.func @main(%arg0: tensor<f32>) -> tensor<f32> {
          %0 = "mhlo.abs"(%arg0) : (tensor<f32>) -> tensor<f32>
          "func.return"(%0) : (tensor<f32>) -> ()
        }
        "#;
        let (module, result) = legalize(src, false);
        let (op, reason) = unconverted(result);
        assert_eq!(op, "func.func");
        assert_eq!(
            reason,
            "failed to convert type (!mhlo.async_bundle<tensor<f32>>) -> tensor<f32> of @decl"
        );
        let repr = module.to_string();
        assert!(repr.contains("\"stablehlo.abs\""));
        assert!(repr.contains("!mhlo.async_bundle<tensor<f32>>"));
    }

    #[test]
    fn test_is_legal() {
        let legal = |src: &str| {
            let op = Parser::parse_single_op(src).unwrap();
            let legal = is_legal(&op.rd()).unwrap();
            legal
        };
        assert!(legal(r#""stablehlo.constant"() {value = dense<0> : tensor<i32>} : () -> tensor<i32>"#));
        assert!(!legal(r#""mhlo.constant"() {value = dense<0> : tensor<i32>} : () -> tensor<i32>"#));
        assert!(legal(r#""func.call"() {callee = @f} : () -> !stablehlo.token"#));
        assert!(!legal(r#""func.call"() {callee = @f} : () -> !mhlo.token"#));
    }

    const TUPLE_ALL_REDUCE: &str = r#"
    func.func @main(%arg0: tensor<8xf32>, %arg1: tensor<f32>) -> tensor<8xf32> {
      %0, %1 = "mhlo.all_reduce"(%arg0, %arg1) ({
      ^bb0(%a: tensor<f32>, %b: tensor<f32>):
        %2 = "mhlo.add"(%a, %b) : (tensor<f32>, tensor<f32>) -> tensor<f32>
        "mhlo.return"(%2) : (tensor<f32>) -> ()
      }) {replica_groups = dense<0> : tensor<1x1xi64>} : (tensor<8xf32>, tensor<f32>) -> (tensor<8xf32>, tensor<f32>)
      "func.return"(%0) : (tensor<8xf32>) -> ()
    }
    "#;

    #[test]
    fn test_experimental_feature() {
        let (module, result) = legalize(TUPLE_ALL_REDUCE, false);
        let (op, reason) = unconverted(result);
        assert_eq!(op, "mhlo.all_reduce");
        assert!(reason.contains("experimental feature"));
        assert!(module.to_string().contains("\"mhlo.all_reduce\""));

        let (module, result) = legalize(TUPLE_ALL_REDUCE, true);
        result.unwrap();
        let repr = module.to_string();
        assert!(!repr.contains("\"mhlo."));
        assert!(repr.contains(r#"%0, %1 = "stablehlo.custom_call"(%arg0, %arg1)"#));
        assert!(repr.contains(r#"call_target_name = "mhlo.all_reduce""#));
        assert!(repr.contains("mhlo.attributes = {replica_groups = dense<0> : tensor<1x1xi64>}"));
        assert!(repr.contains("called_computations = [@all_reduce]"));
        assert!(!repr.contains("mhlo.version"));
        assert!(repr.contains("func.func @all_reduce(%a: tensor<f32>, %b: tensor<f32>) -> tensor<f32> {"));
        assert!(repr.contains(r#""stablehlo.return"(%2) : (tensor<f32>) -> ()"#));
    }

    #[test]
    fn test_outlined_names_are_unique() {
        let src = r#"
        func.func @main(%arg0: tensor<8xf32>, %arg1: tensor<f32>) -> tensor<8xf32> {
          %0, %1 = "mhlo.all_reduce"(%arg0, %arg1) ({
          ^bb0(%a: tensor<f32>, %b: tensor<f32>):
            %2 = "mhlo.add"(%a, %b) : (tensor<f32>, tensor<f32>) -> tensor<f32>
            "mhlo.return"(%2) : (tensor<f32>) -> ()
          }) : (tensor<8xf32>, tensor<f32>) -> (tensor<8xf32>, tensor<f32>)
          %3, %4 = "mhlo.all_reduce"(%0, %1) ({
          ^bb0(%c: tensor<f32>, %d: tensor<f32>):
            %5 = "mhlo.add"(%c, %d) : (tensor<f32>, tensor<f32>) -> tensor<f32>
            "mhlo.return"(%5) : (tensor<f32>) -> ()
          }) : (tensor<8xf32>, tensor<f32>) -> (tensor<8xf32>, tensor<f32>)
          "func.return"(%3) : (tensor<8xf32>) -> ()
        }
        "#;
        let (module, result) = legalize(src, true);
        result.unwrap();
        let repr = module.to_string();
        assert!(repr.contains("called_computations = [@all_reduce]"));
        assert!(repr.contains("called_computations = [@all_reduce_0]"));
        assert!(repr.contains("func.func @all_reduce("));
        assert!(repr.contains("func.func @all_reduce_0("));
    }

    #[test]
    fn test_precision_config() {
        let src = r#"
        func.func @main(%arg0: tensor<2x2xf32>) -> tensor<2x2xf32> {
          %0 = "mhlo.dot"(%arg0, %arg0) {precision_config = [#mhlo<precision DEFAULT>, #mhlo<precision HIGH>, #mhlo<precision PACKED_NIBBLE>]} : (tensor<2x2xf32>, tensor<2x2xf32>) -> tensor<2x2xf32>
          "func.return"(%0) : (tensor<2x2xf32>) -> ()
        }
        "#;
        let (module, result) = legalize(src, true);
        result.unwrap();
        let repr = module.to_string();
        assert!(repr.contains(r#"call_target_name = "mhlo.dot""#));
        assert!(repr.contains(
            r#"mhlo.attributes = {precision_config = ["DEFAULT", "HIGH", "PACKED_NIBBLE"]}"#
        ));
    }

    #[test]
    fn test_public_feature() {
        let src = r#"
        func.func @main(%arg0: tensor<f32>) -> tensor<f32> {
          %0 = "mhlo.tan"(%arg0) : (tensor<f32>) -> tensor<f32>
          "func.return"(%0) : (tensor<f32>) -> ()
        }
        "#;
        // Public features do not need the override.
        let (module, result) = legalize(src, false);
        result.unwrap();
        let repr = module.to_string();
        assert!(repr.contains(
            r#"%0 = "stablehlo.custom_call"(%arg0) {call_target_name = "mhlo.tan", mhlo.attributes = {}, mhlo.version = 1 : i64} : (tensor<f32>) -> tensor<f32>"#
        ));
    }
}
