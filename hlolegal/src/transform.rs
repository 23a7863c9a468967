use crate::convert::ConvertMhloToStablehlo;
use crate::convert::LegalizeOptions;
use crate::convert::Pass;
use crate::convert::RewriteResult;
use crate::ir::ModuleOp;
use anyhow::Result;
use clap::Arg;
use clap::ArgAction;
use std::env::ArgsOs;
use std::fmt;
use std::fmt::Display;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;

const PASS_PREFIX: &str = "--convert-";

/// A transformation pass (e.g., `--convert-mhlo-to-stablehlo`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinglePass {
    pass: String,
}

impl Display for SinglePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pass)
    }
}

impl SinglePass {
    pub fn new(pass: &str) -> SinglePass {
        let pass = pass.strip_prefix("--").unwrap_or(pass);
        SinglePass {
            pass: pass.to_string(),
        }
    }
}

/// A collection of [SinglePass]es.
#[derive(Clone, Debug, Default)]
pub struct Passes {
    passes: Vec<SinglePass>,
}

impl Display for Passes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.passes
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<String>>()
                .join(" ")
        )
    }
}

impl Passes {
    pub fn from_vec(passes: Vec<&str>) -> Passes {
        Passes {
            passes: passes.iter().map(|p| SinglePass::new(p)).collect(),
        }
    }
    /// Extract passes (starting with `--convert-`) from the given args.
    pub fn from_convert_vec(args: Vec<&str>) -> Passes {
        let passes = args
            .into_iter()
            .filter(|arg| arg.starts_with(PASS_PREFIX))
            .collect();
        Passes::from_vec(passes)
    }
    /// Extract passes (starting with `--convert-`) from the command line.
    pub fn from_convert_args(args: ArgsOs) -> Passes {
        let mut passes = vec![];
        for arg in args {
            let arg = arg.to_string_lossy();
            if arg.starts_with(PASS_PREFIX) {
                passes.push(SinglePass::new(&arg));
            }
        }
        Passes { passes }
    }
    pub fn vec(&self) -> &Vec<SinglePass> {
        &self.passes
    }
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// Interface to add custom passes.
pub trait TransformDispatch {
    fn dispatch(
        module: &ModuleOp,
        pass: &SinglePass,
        options: &LegalizeOptions,
    ) -> Result<RewriteResult>;
}

/// Default implementation of [TransformDispatch].
///
/// This default implementation knows only the passes of this crate.
pub struct DefaultTransformDispatch;

/// Initialize logging with the given level.
pub fn init_subscriber(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_test_writer()
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

impl TransformDispatch for DefaultTransformDispatch {
    fn dispatch(
        module: &ModuleOp,
        pass: &SinglePass,
        options: &LegalizeOptions,
    ) -> Result<RewriteResult> {
        let pass = pass.to_string();
        match pass.as_str() {
            ConvertMhloToStablehlo::NAME => ConvertMhloToStablehlo::convert(module, options),
            _ => Err(anyhow::anyhow!("Unknown pass: {}", pass)),
        }
    }
}

/// Default arguments that are available in hlolegal.
///
/// `--debug` is not included to allow downstream projects to handle the
/// logging differently.
pub fn default_arguments() -> Vec<Arg> {
    vec![
        Arg::new("convert-mhlo-to-stablehlo")
            .long("convert-mhlo-to-stablehlo")
            .help("Legalize MHLO operations to StableHLO")
            .action(ArgAction::SetTrue),
        Arg::new("allow-experimental-features")
            .long("allow-experimental-features")
            .help("Legalize experimental features via stablehlo.custom_call")
            .action(ArgAction::SetTrue),
        Arg::new("print-ir-before-all")
            .long("print-ir-before-all")
            .help("Print the IR before each pass")
            .action(ArgAction::SetTrue),
    ]
}

/// Transform the given module via the given passes.
///
/// Passes run in order; the first failing pass aborts the transformation.
pub fn transform<T: TransformDispatch>(
    module: &ModuleOp,
    passes: &Passes,
    options: &LegalizeOptions,
) -> Result<RewriteResult> {
    let mut result = RewriteResult::Unchanged;
    for pass in passes.vec() {
        let new_result = T::dispatch(module, pass, options)?;
        if let RewriteResult::Changed(_) = new_result {
            result = new_result;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes() {
        let args = vec![
            "hlolegal-opt",
            "--convert-mhlo-to-stablehlo",
            "--allow-experimental-features",
            "input.mlir",
        ];
        let passes = Passes::from_convert_vec(args);
        assert_eq!(passes.vec().len(), 1);
        assert_eq!(passes.to_string(), "convert-mhlo-to-stablehlo");
        assert_eq!(passes.vec()[0], SinglePass::new("convert-mhlo-to-stablehlo"));
    }

    #[test]
    fn test_unknown_pass() {
        let module = ModuleOp::default();
        let passes = Passes::from_vec(vec!["--convert-foo-to-bar"]);
        let options = LegalizeOptions::default();
        let err = transform::<DefaultTransformDispatch>(&module, &passes, &options).err();
        assert_eq!(err.unwrap().to_string(), "Unknown pass: convert-foo-to-bar");
    }
}
