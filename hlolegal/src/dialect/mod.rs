//! Dialect definitions.
//!
//! The legalization moves programs from the internal `mhlo` dialect to the
//! portable `stablehlo` dialect. Both dialects share most of their vocabulary;
//! the tables in [mhlo] and [stablehlo] describe where they differ. The
//! [func] dialect holds the functions that regions are outlined into.

pub mod func;
pub mod mhlo;
pub mod records;
pub mod stablehlo;

use crate::ir::EnumKind;
use crate::Dialect;
use std::fmt::Display;
use std::fmt::Formatter;

/// The namespace of a dialect that owns attributes, types, and operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Mhlo,
    Stablehlo,
}

impl Namespace {
    pub fn from_name(name: &str) -> Option<Namespace> {
        match name {
            "mhlo" => Some(Namespace::Mhlo),
            "stablehlo" => Some(Namespace::Stablehlo),
            _ => None,
        }
    }
    /// The namespace of an operation name such as `mhlo.add`.
    pub fn of_op(name: &str) -> Option<Namespace> {
        let (prefix, _) = name.split_once('.')?;
        Namespace::from_name(prefix)
    }
    /// All symbols of the given enum in this dialect.
    ///
    /// The position of a symbol in this list is the numeric value of the enum
    /// case. The numbering is dialect-specific.
    pub fn symbols(&self, kind: EnumKind) -> &'static [&'static str] {
        match self {
            Namespace::Mhlo => mhlo::enums::symbols(kind),
            Namespace::Stablehlo => stablehlo::enums::symbols(kind),
        }
    }
    /// Return the symbol of the enum case with the given value.
    pub fn stringify(&self, kind: EnumKind, value: u32) -> Option<&'static str> {
        self.symbols(kind).get(value as usize).copied()
    }
    /// Return the value of the enum case with the given symbol.
    pub fn symbolize(&self, kind: EnumKind, symbol: &str) -> Option<u32> {
        self.symbols(kind)
            .iter()
            .position(|s| *s == symbol)
            .map(|index| index as u32)
    }
}

impl Dialect for Namespace {
    fn name(&self) -> &'static str {
        match self {
            Namespace::Mhlo => "mhlo",
            Namespace::Stablehlo => "stablehlo",
        }
    }
    fn description(&self) -> &'static str {
        match self {
            Namespace::Mhlo => "Internal high-level operations of the XLA compiler.",
            Namespace::Stablehlo => "Portable operation set for ML programs.",
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
