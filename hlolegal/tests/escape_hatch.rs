extern crate hlolegal;

use hlolegal::error::LegalizeError;
use hlolegal::ir::Attribute;
use hlolegal::shared::SharedExt;
use hlolegal::tester::Tester;
use indoc::indoc;
use std::panic::Location;

fn flags() -> Vec<&'static str> {
    vec!["--convert-mhlo-to-stablehlo"]
}

fn experimental_flags() -> Vec<&'static str> {
    vec!["--convert-mhlo-to-stablehlo", "--allow-experimental-features"]
}

fn reason(err: &anyhow::Error) -> String {
    match err.downcast_ref::<LegalizeError>() {
        Some(LegalizeError::Unconverted { reason, .. }) => reason.clone(),
        _ => panic!("unexpected error: {err}"),
    }
}

const TUPLE_ALL_REDUCE: &str = indoc! {r#"
func.func @main(%arg0: tensor<8xf32>, %arg1: tensor<f32>) -> tensor<8xf32> {
  %0, %1 = "mhlo.all_reduce"(%arg0, %arg1) ({
  ^bb0(%a: tensor<f32>, %b: tensor<f32>):
    %2 = "mhlo.add"(%a, %b) : (tensor<f32>, tensor<f32>) -> tensor<f32>
    "mhlo.return"(%2) : (tensor<f32>) -> ()
  }) {replica_groups = dense<0> : tensor<1x1xi64>} : (tensor<8xf32>, tensor<f32>) -> (tensor<8xf32>, tensor<f32>)
  "func.return"(%0) : (tensor<8xf32>) -> ()
}
"#};

#[test]
fn test_experimental_feature_needs_override() {
    Tester::init_tracing();
    let (module, err) = Tester::transform_err(flags(), TUPLE_ALL_REDUCE);
    assert_eq!(
        reason(&err),
        "mhlo.all_reduce uses an experimental feature (set allow_experimental_features to legalize it)"
    );
    let expected = indoc! {r#"
    %0, %1 = "mhlo.all_reduce"(%arg0, %arg1) ({
    }) {replica_groups = dense<0> : tensor<1x1xi64>} : (tensor<8xf32>, tensor<f32>) -> (tensor<8xf32>, tensor<f32>)
    "#};
    Tester::check_lines_contain(&module.to_string(), expected, Location::caller());
}

#[test]
fn test_outline_region() {
    Tester::init_tracing();
    let expected = indoc! {r#"
    module {
      func.func @main(%arg0: tensor<8xf32>, %arg1: tensor<f32>) -> tensor<8xf32> {
        %0, %1 = "stablehlo.custom_call"(%arg0, %arg1) {call_target_name = "mhlo.all_reduce", mhlo.attributes = {replica_groups = dense<0> : tensor<1x1xi64>}, called_computations = [@all_reduce]} : (tensor<8xf32>, tensor<f32>) -> (tensor<8xf32>, tensor<f32>)
        "func.return"(%0) : (tensor<8xf32>) -> ()
      }
      func.func @all_reduce(%a: tensor<f32>, %b: tensor<f32>) -> tensor<f32> {
        %2 = "stablehlo.add"(%a, %b) : (tensor<f32>, tensor<f32>) -> tensor<f32>
        "stablehlo.return"(%2) : (tensor<f32>) -> ()
      }
    }
    "#};
    let (module, actual) = Tester::transform(experimental_flags(), TUPLE_ALL_REDUCE);
    Tester::check_lines_exact(&actual, expected, Location::caller());
    Tester::verify(&module);
}

#[test]
fn test_outlined_name_does_not_collide() {
    Tester::init_tracing();
    let src = format!(
        "{TUPLE_ALL_REDUCE}{}",
        indoc! {r#"
        func.func private @all_reduce() {
          "func.return"() : () -> ()
        }
        "#}
    );
    let expected = indoc! {r#"
    called_computations = [@all_reduce_0]
    func.func private @all_reduce() {
    func.func @all_reduce_0(%a: tensor<f32>, %b: tensor<f32>) -> tensor<f32> {
    "#};
    let (module, actual) = Tester::transform(experimental_flags(), &src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
    Tester::verify(&module);
}

#[test]
fn test_captured_values_are_rejected() {
    Tester::init_tracing();
    let src = TUPLE_ALL_REDUCE.replace(
        r#""mhlo.add"(%a, %b)"#,
        r#""mhlo.add"(%a, %arg1)"#,
    );
    let (module, err) = Tester::transform_err(experimental_flags(), &src);
    assert_eq!(
        reason(&err),
        "region of mhlo.all_reduce is not isolated from above: it uses values defined outside (%arg1)"
    );
    assert_eq!(module.ops().unwrap().len(), 1);
}

#[test]
fn test_precision_config_is_encoded_as_strings() {
    Tester::init_tracing();
    let src = indoc! {r#"
    func.func @main(%arg0: tensor<2x2xi8>, %arg1: tensor<2x2xi8>) -> tensor<2x2xi32> {
      %0 = "mhlo.dot_general"(%arg0, %arg1) {dot_dimension_numbers = #mhlo.dot<lhs_contracting_dimensions = [1], rhs_contracting_dimensions = [0]>, precision_config = [#mhlo<precision DEFAULT>, #mhlo<precision HIGHEST>, #mhlo<precision PACKED_NIBBLE>]} : (tensor<2x2xi8>, tensor<2x2xi8>) -> tensor<2x2xi32>
      "func.return"(%0) : (tensor<2x2xi32>) -> ()
    }
    "#};
    let (_module, err) = Tester::transform_err(flags(), src);
    assert!(reason(&err).contains("experimental feature"));

    let expected = indoc! {r#"
    %0 = "stablehlo.custom_call"(%arg0, %arg1) {call_target_name = "mhlo.dot_general", mhlo.attributes = {dot_dimension_numbers = #stablehlo.dot<lhs_contracting_dimensions = [1], rhs_contracting_dimensions = [0]>, precision_config = ["DEFAULT", "HIGHEST", "PACKED_NIBBLE"]}} : (tensor<2x2xi8>, tensor<2x2xi8>) -> tensor<2x2xi32>
    "#};
    let (module, actual) = Tester::transform(experimental_flags(), src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
    Tester::verify(&module);
}

#[test]
fn test_public_features_are_versioned() {
    Tester::init_tracing();
    let src = indoc! {r#"
    func.func @main(%arg0: tensor<16xf32>) -> (tensor<4xf32>, tensor<4xi32>) {
      %0 = "mhlo.tan"(%arg0) : (tensor<16xf32>) -> tensor<16xf32>
      %1, %2 = "mhlo.topk"(%0) {k = 4 : i64, largest = true} : (tensor<16xf32>) -> (tensor<4xf32>, tensor<4xi32>)
      %3 = "mhlo.custom_call"(%0) {api_version = 4 : i32, backend_config = {}, call_target_name = "ffi_target"} : (tensor<16xf32>) -> tensor<16xf32>
      "func.return"(%1, %2) : (tensor<4xf32>, tensor<4xi32>) -> ()
    }
    "#};
    let expected = indoc! {r#"
    %0 = "stablehlo.custom_call"(%arg0) {call_target_name = "mhlo.tan", mhlo.attributes = {}, mhlo.version = 1 : i64} : (tensor<16xf32>) -> tensor<16xf32>
    %1, %2 = "stablehlo.custom_call"(%0) {call_target_name = "mhlo.topk", mhlo.attributes = {k = 4 : i64, largest = true}, mhlo.version = 1 : i64} : (tensor<16xf32>) -> (tensor<4xf32>, tensor<4xi32>)
    %3 = "stablehlo.custom_call"(%0) {call_target_name = "mhlo.custom_call", mhlo.attributes = {api_version = 4 : i32, backend_config = {}, call_target_name = "ffi_target"}, mhlo.version = 1 : i64} : (tensor<16xf32>) -> tensor<16xf32>
    "#};
    // Public features do not need the override.
    let (_module, actual) = Tester::transform(flags(), src);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

/// Everything that a reverse pass needs to restore the original operation
/// is in the `custom_call`.
#[test]
fn test_encoding_keeps_operation() {
    Tester::init_tracing();
    let src = indoc! {r#"
    func.func @main(%arg0: tensor<2x2xf32>, %arg1: tensor<2x2xf32>) -> tensor<2x2xf32> {
      %0 = "mhlo.dot"(%arg0, %arg1) {precision_config = [#mhlo<precision HIGH>, #mhlo<precision PACKED_NIBBLE>]} : (tensor<2x2xf32>, tensor<2x2xf32>) -> tensor<2x2xf32>
      "func.return"(%0) : (tensor<2x2xf32>) -> ()
    }
    "#};
    let (original, _) = Tester::parse(src);
    let original = original.first_op().unwrap();
    let original = original.rd().regions()[0].rd().blocks()[0].rd().ops()[0].clone();
    let original = original.rd();

    let (module, _) = Tester::transform(experimental_flags(), src);
    let main = module.first_op().unwrap();
    let call = main.rd().regions()[0].rd().blocks()[0].rd().ops()[0].clone();
    let call = call.rd();
    assert_eq!(call.name().name(), "stablehlo.custom_call");
    assert_eq!(
        call.attributes().get("call_target_name").and_then(|a| a.as_str()),
        Some(original.name().name())
    );
    let operands = call.operands().iter().map(|v| v.rd().name().to_string());
    let expected = original.operands().iter().map(|v| v.rd().name().to_string());
    assert!(operands.eq(expected));
    assert_eq!(call.result_types(), original.result_types());

    let attributes = match call.attributes().get("mhlo.attributes") {
        Some(Attribute::Dictionary(attributes)) => attributes.clone(),
        attr => panic!("expected dictionary, got {attr:?}"),
    };
    assert_eq!(attributes.len(), original.attributes().len());
    let symbols = match attributes.get("precision_config") {
        Some(Attribute::Array(symbols)) => symbols
            .iter()
            .map(|symbol| symbol.as_str().unwrap().to_string())
            .collect::<Vec<String>>(),
        attr => panic!("expected array, got {attr:?}"),
    };
    assert_eq!(symbols, vec!["HIGH", "PACKED_NIBBLE"]);
    assert!(call.attributes().get("mhlo.version").is_none());
}
