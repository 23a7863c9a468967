use crate::convert::walk;
use crate::convert::LegalizeOptions;
use crate::convert::RewriteResult;
use crate::init_subscriber;
use crate::ir::Attribute;
use crate::ir::ModuleOp;
use crate::ir::SymbolTable;
use crate::parser::Parser;
use crate::shared::SharedExt;
use crate::transform;
use crate::DefaultTransformDispatch;
use crate::Passes;
use std::cmp::max;
use std::panic::Location;
use tracing::info;

const ALLOW_EXPERIMENTAL_FEATURES: &str = "--allow-experimental-features";

pub struct Tester;

impl Tester {
    /// Initialize the subscriber for the tests.
    ///
    /// Cannot pass options, since the tests run concurrently.
    pub fn init_tracing() {
        let level = tracing::Level::INFO;
        match init_subscriber(level) {
            Ok(_) => (),
            Err(_e) => (),
        }
    }
    fn point_to_missing_line(expected: &str, index: usize) -> String {
        let mut result = String::new();
        result.push_str("A line is missing from the output:\n");
        result.push_str("```");
        for (i, line) in expected.lines().enumerate() {
            if i == index {
                let msg = format!("{line}   <== missing");
                result.push_str(&format!("\n{msg}"));
            } else {
                result.push_str(&format!("\n{line}"));
            }
        }
        result.push_str("\n```");
        result
    }
    pub fn check_lines_exact(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual = actual.trim();
        let expected = expected.trim();
        let l = max(actual.lines().count(), expected.lines().count());
        for i in 0..l {
            let actual_line = match actual.lines().nth(i) {
                None => panic!("Line {i} not found in output: called from {caller}"),
                Some(actual_line) => actual_line,
            };
            let expected_line = match expected.lines().nth(i) {
                None => panic!("Output has more lines than expected: called from {caller}"),
                Some(expected_line) => expected_line,
            };
            assert_eq!(actual_line, expected_line, "called from {}", caller);
        }
    }
    /// Check whether the expected lines are present in the actual output.
    ///
    /// The actual output may contain additional lines that are not in the expected output.
    pub fn check_lines_contain(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual = actual.trim();
        let expected = expected.trim();
        let mut actual_index = 0;
        'outer: for (i, expected_line) in expected.lines().enumerate() {
            let expected_line = expected_line.trim();
            // If not skipping these, an empty line will match any line (which
            // can then cause the next expected line to be reported as missing).
            if expected_line.is_empty() {
                continue;
            }
            for (j, actual_line) in actual.lines().enumerate().skip(actual_index) {
                if actual_line.contains(expected_line) {
                    actual_index = j + 1;
                    continue 'outer;
                }
            }
            let msg = Self::point_to_missing_line(expected, i);
            panic!("{msg}\nwhen called from {caller}");
        }
    }
    fn print_heading(msg: &str, src: &str) {
        info!("{msg}:\n```\n{src}\n```\n");
    }
    pub fn parse(src: &str) -> (ModuleOp, String) {
        let src = src.trim();
        Self::print_heading("Before parse", src);
        let module = Parser::parse(src).unwrap();
        let actual = module.to_string();
        Self::print_heading("After parse", &actual);
        (module, actual)
    }
    fn options(arguments: &[&str]) -> LegalizeOptions {
        LegalizeOptions {
            allow_experimental_features: arguments.contains(&ALLOW_EXPERIMENTAL_FEATURES),
        }
    }
    fn run(arguments: &[&str], module: &ModuleOp) -> anyhow::Result<RewriteResult> {
        for arg in arguments {
            if arg.starts_with("convert-") {
                panic!("conversion passes should be prefixed with `--convert-`");
            }
        }
        let passes = Passes::from_convert_vec(arguments.to_vec());
        let options = Self::options(arguments);
        transform::<DefaultTransformDispatch>(module, &passes, &options)
    }
    /// Parse `src` and run the passes in `arguments` on it.
    ///
    /// Panics if the transformation fails or does not change the module.
    pub fn transform(arguments: Vec<&str>, src: &str) -> (ModuleOp, String) {
        let src = src.trim();
        let module = Parser::parse(src).unwrap();
        let msg = format!("Before (transform {arguments:?})");
        Self::print_heading(&msg, src);

        let result = Self::run(&arguments, &module).unwrap();
        if result == RewriteResult::Unchanged {
            panic!("Expected changes");
        }
        let actual = module.to_string();
        let msg = format!("After (transform {arguments:?})");
        Self::print_heading(&msg, &actual);
        (module, actual)
    }
    /// Parse `src` and run the passes in `arguments` on it, expecting failure.
    ///
    /// Returns the module in the state that the failed transformation left it
    /// in, together with the error.
    pub fn transform_err(arguments: Vec<&str>, src: &str) -> (ModuleOp, anyhow::Error) {
        let src = src.trim();
        let module = Parser::parse(src).unwrap();
        let err = match Self::run(&arguments, &module) {
            Ok(_) => panic!("Expected the transformation to fail"),
            Err(err) => err,
        };
        let msg = format!("After failed (transform {arguments:?}): {err}");
        Self::print_heading(&msg, &module.to_string());
        (module, err)
    }
    /// Run some extra verification on the module.
    ///
    /// This catches problems that are not visible in the textual
    /// representation: top-level symbols must be unique and every
    /// `called_computations` entry must refer to a function in the module.
    pub fn verify(module: &ModuleOp) {
        let symbols = match SymbolTable::new(module) {
            Ok(symbols) => symbols,
            Err(e) => panic!("invalid symbol table: {e}\n{module}"),
        };
        for (_, op) in walk(module).unwrap() {
            let op = op.rd();
            if let Some(Attribute::Array(called)) = op.attributes().get("called_computations") {
                for callee in called {
                    match callee {
                        Attribute::SymbolRef(name) => assert!(
                            symbols.contains(name),
                            "@{name} is called by {} but not defined:\n{module}",
                            op.name()
                        ),
                        _ => panic!("{} calls {callee}", op.name()),
                    }
                }
            }
        }
    }
}
