//! Structured attributes such as `#mhlo.conv<..>` and `#mhlo.dot<..>`.
//!
//! MHLO and StableHLO define the same records with the same fields, so one
//! representation serves both dialects and only the namespace differs.

use crate::dialect::Namespace;
use crate::ir::display_dims;
use crate::Dialect;
use std::fmt::Display;
use std::fmt::Formatter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    ChannelHandle,
    Conv,
    Dot,
    Gather,
    Scatter,
    OutputOperandAlias,
}

impl RecordKind {
    pub fn from_mnemonic(mnemonic: &str) -> Option<RecordKind> {
        match mnemonic {
            "channel_handle" => Some(RecordKind::ChannelHandle),
            "conv" => Some(RecordKind::Conv),
            "dot" => Some(RecordKind::Dot),
            "gather" => Some(RecordKind::Gather),
            "scatter" => Some(RecordKind::Scatter),
            "output_operand_alias" => Some(RecordKind::OutputOperandAlias),
            _ => None,
        }
    }
    pub fn mnemonic(&self) -> &'static str {
        match self {
            RecordKind::ChannelHandle => "channel_handle",
            RecordKind::Conv => "conv",
            RecordKind::Dot => "dot",
            RecordKind::Gather => "gather",
            RecordKind::Scatter => "scatter",
            RecordKind::OutputOperandAlias => "output_operand_alias",
        }
    }
    /// The names of the fields that the record may hold.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            RecordKind::ChannelHandle => &["handle", "type"],
            RecordKind::Conv => &[
                "input_batch_dimension",
                "input_feature_dimension",
                "input_spatial_dimensions",
                "kernel_input_feature_dimension",
                "kernel_output_feature_dimension",
                "kernel_spatial_dimensions",
                "output_batch_dimension",
                "output_feature_dimension",
                "output_spatial_dimensions",
            ],
            RecordKind::Dot => &[
                "lhs_batching_dimensions",
                "rhs_batching_dimensions",
                "lhs_contracting_dimensions",
                "rhs_contracting_dimensions",
            ],
            RecordKind::Gather => &[
                "offset_dims",
                "collapsed_slice_dims",
                "operand_batching_dims",
                "start_indices_batching_dims",
                "start_index_map",
                "index_vector_dim",
            ],
            RecordKind::Scatter => &[
                "update_window_dims",
                "inserted_window_dims",
                "input_batching_dims",
                "scatter_indices_batching_dims",
                "scatter_dims_to_operand_dims",
                "index_vector_dim",
            ],
            RecordKind::OutputOperandAlias => &[
                "output_tuple_indices",
                "operand_index",
                "operand_tuple_indices",
            ],
        }
    }
}

/// The value of a record field.
///
/// Dimensions are `None` when they are unknown, which is printed as `?`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordValue {
    Dim(Option<i64>),
    Dims(Vec<Option<i64>>),
}

impl RecordValue {
    fn has_unknown(&self) -> bool {
        match self {
            RecordValue::Dim(dim) => dim.is_none(),
            RecordValue::Dims(dims) => dims.iter().any(|dim| dim.is_none()),
        }
    }
}

impl Display for RecordValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordValue::Dim(dim) => write!(f, "{}", display_dims(&[*dim], "")),
            RecordValue::Dims(dims) => write!(f, "[{}]", display_dims(dims, ", ")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordAttr {
    namespace: Namespace,
    kind: RecordKind,
    fields: Vec<(String, RecordValue)>,
}

impl RecordAttr {
    pub fn new(namespace: Namespace, kind: RecordKind, fields: Vec<(String, RecordValue)>) -> Self {
        Self {
            namespace,
            kind,
            fields,
        }
    }
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }
    pub fn kind(&self) -> RecordKind {
        self.kind
    }
    pub fn fields(&self) -> &[(String, RecordValue)] {
        &self.fields
    }
    pub fn get(&self, name: &str) -> Option<&RecordValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
    /// Whether any dimension in the record is unknown (`?`).
    pub fn has_unknown_dimension(&self) -> bool {
        self.fields.iter().any(|(_, value)| value.has_unknown())
    }
    /// The same record, owned by another dialect.
    ///
    /// Fields are kept in their original order.
    pub fn with_namespace(&self, namespace: Namespace) -> Self {
        Self {
            namespace,
            kind: self.kind,
            fields: self.fields.clone(),
        }
    }
}

impl Display for RecordAttr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}.{}<", self.namespace.name(), self.kind.mnemonic())?;
        if self.kind == RecordKind::Conv {
            write!(f, "raw ")?;
        }
        let fields = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name} = {value}"))
            .collect::<Vec<String>>()
            .join(", ");
        write!(f, "{fields}>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let fields = vec![
            ("lhs_contracting_dimensions".to_string(), RecordValue::Dims(vec![Some(1)])),
            ("rhs_contracting_dimensions".to_string(), RecordValue::Dims(vec![Some(0)])),
        ];
        let dot = RecordAttr::new(Namespace::Mhlo, RecordKind::Dot, fields);
        assert_eq!(
            dot.to_string(),
            "#mhlo.dot<lhs_contracting_dimensions = [1], rhs_contracting_dimensions = [0]>"
        );
        let dot = dot.with_namespace(Namespace::Stablehlo);
        assert!(dot.to_string().starts_with("#stablehlo.dot<lhs_contracting"));

        let fields = vec![
            ("input_batch_dimension".to_string(), RecordValue::Dim(None)),
            ("input_spatial_dimensions".to_string(), RecordValue::Dims(vec![Some(1), Some(2)])),
        ];
        let conv = RecordAttr::new(Namespace::Mhlo, RecordKind::Conv, fields);
        assert!(conv.has_unknown_dimension());
        assert_eq!(
            conv.to_string(),
            "#mhlo.conv<raw input_batch_dimension = ?, input_spatial_dimensions = [1, 2]>"
        );
    }
}
