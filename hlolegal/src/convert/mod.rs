//! Conversion logic.
//!
//! A conversion is a set of [Rewrite]s that the driver in [apply_rewrites]
//! offers every operation of a module to. Rewrites do not mutate the IR
//! directly. Instead, they record their edits in a [Rewriter], and the driver
//! commits these edits only when the rewrite succeeds. A failed rewrite thus
//! leaves the operation exactly as it was.

use crate::dialect::func;
use crate::ir::spaces;
use crate::ir::Block;
use crate::ir::ModuleOp;
use crate::ir::Operation;
use crate::ir::SymbolTable;
use crate::ir::Type;
use crate::ir::Value;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

mod mhlo_to_stablehlo;

pub use mhlo_to_stablehlo::classify;
pub use mhlo_to_stablehlo::convert_attr;
pub use mhlo_to_stablehlo::convert_dense_array;
pub use mhlo_to_stablehlo::encode_precision_config;
pub use mhlo_to_stablehlo::populate_hlo_to_stablehlo_patterns;
pub use mhlo_to_stablehlo::public_feature_version;
pub use mhlo_to_stablehlo::ConvertMhloToStablehlo;
pub use mhlo_to_stablehlo::FeatureTier;
pub use mhlo_to_stablehlo::HloToStablehloTypeConverter;
pub use mhlo_to_stablehlo::LegalizeOptions;
pub use mhlo_to_stablehlo::RewritePatternSet;

pub struct ChangedOp {
    pub op: Shared<Operation>,
}

impl ChangedOp {
    pub fn new(op: Shared<Operation>) -> Self {
        ChangedOp { op }
    }
}

impl PartialEq for ChangedOp {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.op, &other.op)
    }
}

/// Whether a rewrite changed the IR.
///
/// If a rewrite changes the IR, it returns the operation that took the place
/// of the matched operation.
#[derive(PartialEq)]
pub enum RewriteResult {
    Changed(ChangedOp),
    Unchanged,
}

impl RewriteResult {
    pub fn is_changed(&self) -> Option<&ChangedOp> {
        match self {
            RewriteResult::Changed(op) => Some(op),
            RewriteResult::Unchanged => None,
        }
    }
}

/// A change to the IR that is applied when the rewrite succeeds.
enum Edit {
    SetType {
        value: Shared<Value>,
        typ: Type,
    },
    Replace {
        block: Shared<Block>,
        old: Shared<Operation>,
        new: Shared<Operation>,
    },
    InsertFunc {
        name: String,
        func: Shared<Operation>,
    },
}

/// Records the edits of one rewrite.
///
/// The rewriter knows where the matched operation lives and which symbols are
/// defined at the top level of the module.
pub struct Rewriter<'a> {
    block: Shared<Block>,
    module: &'a ModuleOp,
    symbols: &'a SymbolTable,
    /// Symbol names that pending functions will take.
    reserved: Vec<String>,
    edits: Vec<Edit>,
}

impl<'a> Rewriter<'a> {
    pub fn new(block: Shared<Block>, module: &'a ModuleOp, symbols: &'a SymbolTable) -> Self {
        Self {
            block,
            module,
            symbols,
            reserved: vec![],
            edits: vec![],
        }
    }
    /// Change the type of `value` once the rewrite succeeds.
    ///
    /// Every user of the value sees the new type.
    pub fn set_type(&mut self, value: &Shared<Value>, typ: Type) {
        self.edits.push(Edit::SetType {
            value: value.clone(),
            typ,
        });
    }
    /// Replace `old` by `new` in the block that holds `old`.
    pub fn replace_op(&mut self, old: &Shared<Operation>, new: Operation) -> Shared<Operation> {
        let new = Shared::new(new.into());
        self.edits.push(Edit::Replace {
            block: self.block.clone(),
            old: old.clone(),
            new: new.clone(),
        });
        new
    }
    /// Return a name based on `base` that no symbol in the module (or a
    /// function that this rewrite inserts) uses, and reserve it.
    pub fn reserve_symbol(&mut self, base: &str) -> String {
        let name = self.symbols.unique_name(base, &self.reserved);
        self.reserved.push(name.clone());
        name
    }
    /// Append a `func.func` to the module body.
    ///
    /// The name must be reserved via [Rewriter::reserve_symbol].
    pub fn insert_func(&mut self, func: Operation) -> Result<Shared<Operation>> {
        let name = match func::sym_name(&func) {
            Some(name) => name,
            None => return Err(anyhow::anyhow!("Function without sym_name")),
        };
        if !self.reserved.contains(&name) {
            return Err(anyhow::anyhow!("Symbol @{name} was not reserved"));
        }
        let func = Shared::new(func.into());
        self.edits.push(Edit::InsertFunc {
            name,
            func: func.clone(),
        });
        Ok(func)
    }
    pub fn module(&self) -> &ModuleOp {
        self.module
    }
    pub fn has_edits(&self) -> bool {
        !self.edits.is_empty()
    }
    fn into_edits(self) -> Vec<Edit> {
        self.edits
    }
}

fn commit(edits: Vec<Edit>, module: &ModuleOp, symbols: &mut SymbolTable) -> Result<()> {
    let body = module.body()?;
    for edit in edits {
        match edit {
            Edit::SetType { value, typ } => value.wr().set_typ(typ),
            Edit::Replace { block, old, new } => block.wr().replace(&old, new)?,
            Edit::InsertFunc { name, func } => {
                symbols.insert(&name)?;
                body.wr().push(func);
            }
        }
    }
    Ok(())
}

pub trait Rewrite: Send + Sync {
    /// The name of the rewrite; is used for logging.
    fn name(&self) -> &'static str;
    /// Returns true if the rewrite can be applied to the given operation.
    ///
    /// This method is not allowed to mutate the IR.
    fn is_match(&self, op: &Operation) -> Result<bool>;
    /// Record the edits that rewrite `op` in `rewriter`.
    ///
    /// An error means that the operation cannot be legalized; the recorded
    /// edits are then discarded.
    fn rewrite(&self, op: &Shared<Operation>, rewriter: &mut Rewriter) -> Result<RewriteResult>;
}

/// An operation that a matching rewrite failed on.
#[derive(Debug)]
pub struct MatchFailure {
    pub op: Shared<Operation>,
    pub error: anyhow::Error,
}

/// What [apply_rewrites] did to a module.
#[derive(Debug, Default)]
pub struct RewriteSummary {
    pub changed: usize,
    pub failures: Vec<MatchFailure>,
}

fn collect_ops(block: &Shared<Block>, ops: &mut Vec<(Shared<Block>, Shared<Operation>)>) {
    for op in block.rd().ops().iter() {
        ops.push((block.clone(), op.clone()));
        for region in op.rd().regions().iter() {
            for nested in region.rd().blocks().iter() {
                collect_ops(nested, ops);
            }
        }
    }
}

/// Operations of the module in pre-order together with their blocks.
///
/// Operations created while rewriting are not part of the walk.
pub(crate) fn walk(module: &ModuleOp) -> Result<Vec<(Shared<Block>, Shared<Operation>)>> {
    let mut ops = vec![];
    collect_ops(&module.body()?, &mut ops);
    Ok(ops)
}

enum Outcome {
    NoMatch,
    Changed,
    Failed(anyhow::Error),
}

fn apply_rewrite_to_op(
    module: &ModuleOp,
    symbols: &mut SymbolTable,
    block: &Shared<Block>,
    op: &Shared<Operation>,
    rewrites: &[&dyn Rewrite],
    indent: i32,
) -> Result<Outcome> {
    for rewrite in rewrites {
        debug!(
            "{}Matching {} with {}",
            spaces(indent),
            op.rd().name(),
            rewrite.name()
        );
        if !rewrite.is_match(&op.rd())? {
            continue;
        }
        debug!("{}--> Success", spaces(indent));
        let mut rewriter = Rewriter::new(block.clone(), module, symbols);
        let result = rewrite.rewrite(op, &mut rewriter);
        let edits = rewriter.into_edits();
        match result {
            Ok(RewriteResult::Unchanged) => continue,
            Ok(RewriteResult::Changed(_)) => {
                commit(edits, module, symbols)?;
                debug!("{}----> Changed", spaces(indent));
                return Ok(Outcome::Changed);
            }
            Err(e) => {
                debug!("{}----> Failed: {e}", spaces(indent));
                return Ok(Outcome::Failed(e));
            }
        }
    }
    Ok(Outcome::NoMatch)
}

fn depth(module: &ModuleOp, block: &Shared<Block>) -> i32 {
    match module.body() {
        Ok(body) if Arc::ptr_eq(&body, block) => 0,
        _ => 1,
    }
}

/// Offer every operation of the module to the first matching rewrite.
///
/// Each operation is tried at most once. When a rewrite fails, the operation
/// stays as it was and the failure is recorded in the summary.
pub fn apply_rewrites(module: &ModuleOp, rewrites: &[&dyn Rewrite]) -> Result<RewriteSummary> {
    let mut symbols = SymbolTable::new(module)?;
    let mut summary = RewriteSummary::default();
    for (block, op) in walk(module)? {
        let indent = depth(module, &block);
        match apply_rewrite_to_op(module, &mut symbols, &block, &op, rewrites, indent)? {
            Outcome::Changed => summary.changed += 1,
            Outcome::Failed(error) => summary.failures.push(MatchFailure { op, error }),
            Outcome::NoMatch => {}
        }
    }
    Ok(summary)
}

/// A pass is a transformation that can be applied to the IR.
pub trait Pass {
    const NAME: &'static str;
    fn convert(module: &ModuleOp, options: &LegalizeOptions) -> Result<RewriteResult>;
}
