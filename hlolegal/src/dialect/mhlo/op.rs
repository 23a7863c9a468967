use crate::dialect::stablehlo;
use crate::dialect::stablehlo::OpDef;

/// Operations that only exist inside the compiler.
///
/// These are never produced by frameworks, so they are rejected no matter
/// which options are set.
pub const PRIVATE_OPS: &[&str] = &[
    "mhlo.add_dependency",
    "mhlo.async_done",
    "mhlo.async_start",
    "mhlo.async_update",
    "mhlo.bitcast",
    "mhlo.copy",
    "mhlo.domain",
    "mhlo.fusion",
    "mhlo.stochastic_convert",
    "mhlo.xla.rng_get_and_update_state",
];

/// Public operations without a StableHLO counterpart.
///
/// They can only be legalized through `stablehlo.custom_call`.
pub const CUSTOM_CALL_ONLY_OPS: &[&str] = &["mhlo.tan", "mhlo.topk"];

pub fn is_private_op(name: &str) -> bool {
    PRIVATE_OPS.contains(&name)
}

/// The StableHLO operation that the given MHLO operation maps onto.
pub fn counterpart(name: &str) -> Option<&'static OpDef> {
    let mnemonic = name.strip_prefix("mhlo.")?;
    if is_private_op(name) || CUSTOM_CALL_ONLY_OPS.contains(&name) {
        return None;
    }
    stablehlo::lookup(mnemonic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterpart() {
        let def = counterpart("mhlo.compare").unwrap();
        assert_eq!(def.name(), "stablehlo.compare");
        assert!(counterpart("mhlo.bitcast").is_none());
        assert!(counterpart("mhlo.tan").is_none());
        assert!(counterpart("stablehlo.add").is_none());
        assert!(counterpart("mhlo.minimum_broadcast_shapes").is_none());
    }
}
