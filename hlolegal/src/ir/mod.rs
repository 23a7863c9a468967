//! Intermediate representation (IR) for the legalization.
//!
//! An [Operation] has operands, results, attributes, and regions. Regions
//! contain [Block]s which contain operations again. Everything that is
//! referenced from more than one place is wrapped in a
//! [Shared](crate::shared::Shared).

mod attribute;
mod block;
mod module;
mod operation;
mod region;
mod typ;
mod value;

pub use attribute::Attribute;
pub use attribute::Attributes;
pub use attribute::DenseElementsAttr;
pub use attribute::DenseValues;
pub use attribute::EnumAttr;
pub use attribute::EnumKind;
pub use attribute::FloatAttr;
pub use attribute::IntegerAttr;
pub use attribute::OpaqueAttr;
pub use block::Block;
pub use module::ModuleOp;
pub use module::SymbolTable;
pub use operation::Operation;
pub use operation::OperationName;
pub use region::Region;
pub use typ::display_result_types;
pub use typ::display_types;
pub use typ::FloatType;
pub use typ::FunctionType;
pub use typ::IntegerType;
pub use typ::Signedness;
pub use typ::TensorEncoding;
pub use typ::TensorType;
pub use typ::Type;
pub use typ::TypeConvert;
pub use value::Value;
pub use value::Values;

pub fn spaces(indent: i32) -> String {
    "  ".repeat(indent as usize)
}

/// Join dimensions with the given separator while printing unknown
/// dimensions as `?`.
pub fn display_dims(dims: &[Option<i64>], separator: &str) -> String {
    dims.iter()
        .map(|dim| match dim {
            Some(dim) => dim.to_string(),
            None => "?".to_string(),
        })
        .collect::<Vec<String>>()
        .join(separator)
}

pub fn escape(src: &str) -> String {
    src.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

pub fn unescape(src: &str) -> String {
    let mut out = String::new();
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(c) => out.push(c),
            None => out.push('\\'),
        }
    }
    out
}

#[test]
fn test_display_dims() {
    assert_eq!(display_dims(&[Some(4), None, Some(2)], ", "), "4, ?, 2");
    assert_eq!(display_dims(&[], ", "), "");
}

#[test]
fn test_escape() {
    let src = "say \"hi\"\n";
    assert_eq!(escape(src), "say \\\"hi\\\"\\n");
    assert_eq!(unescape(&escape(src)), src);
}
