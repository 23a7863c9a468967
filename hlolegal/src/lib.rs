//! hlolegal legalizes MHLO programs to StableHLO.
//!
//! MHLO is the dialect that compilers such as XLA work with internally.
//! StableHLO is its portable sibling with compatibility guarantees, which is
//! what frameworks serialize and exchange. Most MHLO operations map 1:1 onto a
//! StableHLO operation, but not all of them:
//!
//! - Private features, such as `mhlo.bitcast`, only exist inside the compiler
//!   and are rejected.
//! - Experimental features, such as a tuple `mhlo.all_reduce`, are rejected
//!   unless [LegalizeOptions](convert::LegalizeOptions) allows them.
//! - Public features that StableHLO does not have yet, such as `mhlo.tan`, are
//!   encoded as `stablehlo.custom_call` so that a reverse pass can restore them.
//!
//! Rewrites are transactional: an operation that cannot be legalized is left
//! exactly as it was.
//!
//! ```
//! use hlolegal::convert::ConvertMhloToStablehlo;
//! use hlolegal::convert::LegalizeOptions;
//! use hlolegal::convert::Pass;
//! use hlolegal::parser::Parser;
//!
//! let src = r#"
//! func.func @main(%arg0: tensor<f32>) -> tensor<f32> {
//!   %0 = "mhlo.abs"(%arg0) : (tensor<f32>) -> tensor<f32>
//!   "func.return"(%0) : (tensor<f32>) -> ()
//! }
//! "#;
//! let module = Parser::parse(src).unwrap();
//! ConvertMhloToStablehlo::convert(&module, &LegalizeOptions::default()).unwrap();
//! assert!(module.to_string().contains("\"stablehlo.abs\""));
//! ```

pub mod convert;
pub mod dialect;
pub mod error;
pub mod ir;
pub mod parser;
pub mod shared;
#[cfg(feature = "test-utils")]
pub mod tester;
mod transform;

pub use transform::default_arguments;
pub use transform::init_subscriber;
pub use transform::transform;
pub use transform::DefaultTransformDispatch;
pub use transform::Passes;
pub use transform::SinglePass;
pub use transform::TransformDispatch;

/// Dialects can define new operations, attributes, and types.
/// Each dialect is given an unique namespace that is prefixed.
///
/// Dialects can co-exist and can be produced and consumed by different passes.
pub trait Dialect {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
}
