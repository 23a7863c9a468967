//! Compatibility tiers of MHLO operations.

use crate::dialect::mhlo;
use crate::ir::Attribute;
use crate::ir::EnumKind;
use crate::ir::Operation;

/// `API_VERSION_TYPED_FFI` of the `api_version` attribute of `mhlo.custom_call`.
const API_VERSION_TYPED_FFI: i64 = 4;

/// How an MHLO operation can cross into StableHLO.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureTier {
    /// Internal to the compiler; never legalized.
    Private,
    /// No compatibility guarantees yet; legalized through `custom_call` only
    /// when experimental features are allowed.
    Experimental,
    /// Used by frameworks but not in StableHLO yet; legalized through
    /// `custom_call` with the given encoding version.
    PublicUnsupported { version: i64 },
    /// Has a direct StableHLO counterpart.
    Supported,
}

fn has_private_features(op: &Operation) -> bool {
    let name = op.name().name();
    if mhlo::is_private_op(name) {
        return true;
    }
    match name {
        "mhlo.convolution" => match op.attributes().get("dimension_numbers") {
            Some(Attribute::Record(record)) => record.has_unknown_dimension(),
            Some(attr) => attr.to_string().contains('?'),
            None => false,
        },
        "mhlo.custom_call" => match op.attributes().get("custom_call_schedule") {
            Some(Attribute::Enum(schedule)) if schedule.kind() == EnumKind::CustomCallSchedule => {
                schedule.symbol() != Some("NONE")
            }
            Some(_) => true,
            None => false,
        },
        _ => false,
    }
}

fn has_packed_nibble(op: &Operation) -> bool {
    match op.attributes().get("precision_config") {
        Some(Attribute::Array(elements)) => elements.iter().any(|element| match element {
            Attribute::Enum(precision) => {
                precision.kind() == EnumKind::Precision
                    && precision.symbol() == Some("PACKED_NIBBLE")
            }
            _ => false,
        }),
        _ => false,
    }
}

fn has_experimental_features(op: &Operation) -> bool {
    match op.name().name() {
        // Tuple form.
        "mhlo.all_reduce" | "mhlo.all_to_all" => op.operands().len() != 1,
        "mhlo.convolution" | "mhlo.dot_general" | "mhlo.dot" => has_packed_nibble(op),
        _ => false,
    }
}

/// The version of the `custom_call` encoding of a public feature that
/// StableHLO does not have yet.
///
/// The version must be incremented whenever the encoding of the operation
/// changes.
pub fn public_feature_version(op: &Operation) -> Option<i64> {
    match op.name().name() {
        "mhlo.tan" => Some(1),
        "mhlo.topk" => Some(1),
        "mhlo.custom_call" => {
            let api_version = op.attributes().get("api_version")?.as_integer()?;
            (api_version == API_VERSION_TYPED_FFI).then_some(1)
        }
        _ => None,
    }
}

/// Determine the tier of `op`.
///
/// Private takes precedence over experimental, which takes precedence over
/// public.
pub fn classify(op: &Operation) -> FeatureTier {
    if has_private_features(op) {
        FeatureTier::Private
    } else if has_experimental_features(op) {
        FeatureTier::Experimental
    } else if let Some(version) = public_feature_version(op) {
        FeatureTier::PublicUnsupported { version }
    } else {
        FeatureTier::Supported
    }
}
