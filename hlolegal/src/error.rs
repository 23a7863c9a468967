//! Reasons why an operation could not be legalized.
//!
//! Rewrites return these through [anyhow::Error] so that callers can
//! `downcast_ref::<LegalizeError>()` to find out which rule rejected an op.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LegalizeError {
    #[error("{op} uses a private feature that has no StableHLO representation")]
    PrivateFeature { op: String },
    #[error("{op} uses an experimental feature (set allow_experimental_features to legalize it)")]
    ExperimentalFeature { op: String },
    #[error("failed to convert type {typ} of {op}")]
    TypeConversion { op: String, typ: String },
    #[error("failed to convert attribute {name} of {op}")]
    AttributeConversion { op: String, name: String },
    #[error("region of {op} must have exactly one block, but has {blocks}")]
    MultiBlockRegion { op: String, blocks: usize },
    #[error("region of {op} is not isolated from above: it uses values defined outside ({values})")]
    CapturedValues { op: String, values: String },
    #[error("region of {op} has no terminator")]
    MissingTerminator { op: String },
    #[error("{op} has {regions} regions, but the custom_call encoding supports at most one")]
    TooManyRegions { op: String, regions: usize },
    #[error("{op} has no StableHLO counterpart")]
    NoCounterpart { op: String },
    #[error("failed to legalize {op}: {reason}")]
    Unconverted { op: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = LegalizeError::TooManyRegions {
            op: "mhlo.if".to_string(),
            regions: 2,
        };
        assert_eq!(
            err.to_string(),
            "mhlo.if has 2 regions, but the custom_call encoding supports at most one"
        );
        let err = anyhow::Error::new(LegalizeError::PrivateFeature {
            op: "mhlo.bitcast".to_string(),
        });
        assert!(matches!(
            err.downcast_ref::<LegalizeError>(),
            Some(LegalizeError::PrivateFeature { .. })
        ));
    }
}
