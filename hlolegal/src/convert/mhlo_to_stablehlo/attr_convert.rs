use crate::dialect::records::RecordKind;
use crate::dialect::Namespace;
use crate::ir::Attribute;
use crate::ir::Attributes;
use crate::ir::EnumAttr;
use crate::ir::EnumKind;

/// StableHLO operations that hold `array<i64: ...>` where MHLO holds
/// `dense<...>` integer elements.
const DENSE_ARRAY_OPS: [&str; 7] = [
    "stablehlo.broadcast",
    "stablehlo.dynamic_slice",
    "stablehlo.fft",
    "stablehlo.pad",
    "stablehlo.reverse",
    "stablehlo.slice",
    "stablehlo.transpose",
];

/// Convert dense integer elements to a dense i64 array if the target
/// operation expects one.
///
/// Returns `None` when the conversion does not apply, in which case the
/// caller falls back to [convert_attr].
pub fn convert_dense_array(target: &str, attr: &Attribute) -> Option<Attribute> {
    if !DENSE_ARRAY_OPS.contains(&target) {
        return None;
    }
    match attr {
        Attribute::DenseElements(dense) => Some(Attribute::DenseArray(dense.to_i64_vec()?)),
        _ => None,
    }
}

fn convert_enum(attr: &EnumAttr) -> Option<Attribute> {
    let symbol = attr.symbol()?;
    if attr.kind() == EnumKind::Precision && symbol == "PACKED_NIBBLE" {
        return None;
    }
    let converted = EnumAttr::from_symbol(Namespace::Stablehlo, attr.kind(), symbol)?;
    Some(Attribute::Enum(converted))
}

/// Convert an MHLO attribute to its StableHLO counterpart.
///
/// Attributes of other dialects are unchanged, but arrays and dictionaries
/// are walked so that nested MHLO attributes are converted too. Returns
/// `None` if any part has no StableHLO counterpart.
pub fn convert_attr(attr: &Attribute) -> Option<Attribute> {
    match attr {
        Attribute::Enum(attr) if attr.namespace() == Namespace::Mhlo => convert_enum(attr),
        Attribute::Record(record) if record.namespace() == Namespace::Mhlo => {
            if record.kind() == RecordKind::Conv && record.has_unknown_dimension() {
                return None;
            }
            Some(Attribute::Record(record.with_namespace(Namespace::Stablehlo)))
        }
        Attribute::Opaque(opaque) if opaque.dialect() == "mhlo" => None,
        Attribute::Array(elements) => {
            let elements = elements
                .iter()
                .map(convert_attr)
                .collect::<Option<Vec<Attribute>>>()?;
            Some(Attribute::Array(elements))
        }
        Attribute::Dictionary(attributes) => {
            Some(Attribute::Dictionary(convert_attributes(attributes)?))
        }
        _ => Some(attr.clone()),
    }
}

fn convert_attributes(attributes: &Attributes) -> Option<Attributes> {
    attributes
        .iter()
        .map(|(name, attr)| Some((name.to_string(), convert_attr(attr)?)))
        .collect()
}

/// Encode `[#mhlo<precision HIGH>, ...]` as `["HIGH", ...]`.
///
/// Strings keep every precision including the ones that StableHLO does not
/// have, such as `PACKED_NIBBLE`.
pub fn encode_precision_config(attr: &Attribute) -> Option<Attribute> {
    let elements = match attr {
        Attribute::Array(elements) => elements,
        _ => return None,
    };
    let symbols = elements
        .iter()
        .map(|element| match element {
            Attribute::Enum(precision)
                if precision.namespace() == Namespace::Mhlo
                    && precision.kind() == EnumKind::Precision =>
            {
                match precision.symbol() {
                    Some(symbol) if !symbol.is_empty() => Some(Attribute::string(symbol)),
                    _ => None,
                }
            }
            _ => None,
        })
        .collect::<Option<Vec<Attribute>>>()?;
    Some(Attribute::Array(symbols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::shared::SharedExt;

    fn parse(src: &str) -> Attribute {
        let src = format!("\"test.op\"() {{a = {src}}} : () -> ()");
        let op = Parser::parse_single_op(&src).unwrap();
        let op = op.rd();
        op.attributes().get("a").unwrap().clone()
    }

    fn convert(src: &str) -> Option<String> {
        convert_attr(&parse(src)).map(|attr| attr.to_string())
    }

    #[test]
    fn test_convert_enum() {
        assert_eq!(
            convert("#mhlo<comparison_direction GT>"),
            Some("#stablehlo<comparison_direction GT>".to_string())
        );
        assert_eq!(
            convert("#mhlo<precision HIGHEST>"),
            Some("#stablehlo<precision HIGHEST>".to_string())
        );
        assert_eq!(convert("#mhlo<precision PACKED_NIBBLE>"), None);
        assert_eq!(convert("#mhlo<custom_call_schedule NONE>"), None);
    }

    #[test]
    fn test_unknown_enum_symbol() {
        // An unknown symbol parses as an opaque `#mhlo` attribute, which has no
        // StableHLO counterpart.
        assert_eq!(convert("#mhlo<comparison_direction INVENTED>"), None);
        let invented = EnumAttr::new(Namespace::Mhlo, EnumKind::ComparisonDirection, 99);
        assert_eq!(convert_attr(&Attribute::Enum(invented)), None);
    }

    #[test]
    fn test_enum_round_trip() {
        let kinds = [
            EnumKind::ComparisonDirection,
            EnumKind::ComparisonType,
            EnumKind::Precision,
            EnumKind::FftType,
            EnumKind::RngAlgorithm,
            EnumKind::RngDistribution,
            EnumKind::Transpose,
        ];
        for kind in kinds {
            for symbol in Namespace::Mhlo.symbols(kind) {
                let Some(back) = EnumAttr::from_symbol(Namespace::Stablehlo, kind, symbol) else {
                    continue;
                };
                let back = back.symbol().unwrap();
                let mhlo = EnumAttr::from_symbol(Namespace::Mhlo, kind, back).unwrap();
                assert_eq!(mhlo.symbol(), Some(*symbol));
            }
        }
    }

    #[test]
    fn test_convert_record() {
        assert_eq!(
            convert("#mhlo.dot<lhs_contracting_dimensions = [1], rhs_contracting_dimensions = [0]>"),
            Some(
                "#stablehlo.dot<lhs_contracting_dimensions = [1], rhs_contracting_dimensions = [0]>"
                    .to_string()
            )
        );
        assert_eq!(
            convert("#mhlo.channel_handle<handle = 1, type = 2>"),
            Some("#stablehlo.channel_handle<handle = 1, type = 2>".to_string())
        );
    }

    #[test]
    fn test_convert_nested() {
        assert_eq!(
            convert("[1 : i64, #mhlo<precision DEFAULT>]"),
            Some("[1 : i64, #stablehlo<precision DEFAULT>]".to_string())
        );
        assert_eq!(convert("[#mhlo<precision PACKED_NIBBLE>]"), None);
        assert_eq!(
            convert("{b = #mhlo<fft_type FFT>}"),
            Some("{b = #stablehlo<fft_type FFT>}".to_string())
        );
        assert_eq!(convert("\"text\""), Some("\"text\"".to_string()));
        assert_eq!(convert("#mhlo.unknown<1>"), None);
        assert_eq!(convert("[#mhlo.unknown<1>]"), None);
        assert_eq!(convert("{b = [#mhlo.unknown<1>]}"), None);
    }

    #[test]
    fn test_convert_dense_array() {
        let attr = parse("dense<[1, 0]> : tensor<2xi64>");
        assert_eq!(
            convert_dense_array("stablehlo.transpose", &attr),
            Some(Attribute::DenseArray(vec![1, 0]))
        );
        assert_eq!(convert_dense_array("stablehlo.add", &attr), None);
        let splat = parse("dense<0> : tensor<3xi64>");
        assert_eq!(
            convert_dense_array("stablehlo.pad", &splat),
            Some(Attribute::DenseArray(vec![0, 0, 0]))
        );
        let float = parse("dense<1.0> : tensor<2xf32>");
        assert_eq!(convert_dense_array("stablehlo.pad", &float), None);
    }

    #[test]
    fn test_encode_precision_config() {
        let attr = parse(
            "[#mhlo<precision DEFAULT>, #mhlo<precision HIGH>, #mhlo<precision PACKED_NIBBLE>]",
        );
        let encoded = encode_precision_config(&attr).unwrap();
        assert_eq!(encoded.to_string(), r#"["DEFAULT", "HIGH", "PACKED_NIBBLE"]"#);
        assert_eq!(encode_precision_config(&parse("[]")), Some(Attribute::Array(vec![])));
        assert_eq!(encode_precision_config(&parse("[1 : i64]")), None);
        assert_eq!(encode_precision_config(&parse("#mhlo<precision HIGH>")), None);
    }
}
