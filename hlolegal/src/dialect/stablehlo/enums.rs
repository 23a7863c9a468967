use crate::ir::EnumKind;

const COMPARISON_DIRECTION: &[&str] = &["EQ", "NE", "GE", "GT", "LE", "LT"];
const COMPARISON_TYPE: &[&str] = &["NOTYPE", "FLOAT", "TOTALORDER", "SIGNED", "UNSIGNED"];
const PRECISION: &[&str] = &["DEFAULT", "HIGH", "HIGHEST"];
const FFT_TYPE: &[&str] = &["FFT", "IFFT", "RFFT", "IRFFT"];
const RNG_ALGORITHM: &[&str] = &["DEFAULT", "THREE_FRY", "PHILOX"];
const RNG_DISTRIBUTION: &[&str] = &["UNIFORM", "NORMAL"];
const TRANSPOSE: &[&str] = &["TRANSPOSE_INVALID", "NO_TRANSPOSE", "TRANSPOSE", "ADJOINT"];

/// Scheduling hints are compiler-private, so StableHLO has no such enum.
pub(crate) fn symbols(kind: EnumKind) -> &'static [&'static str] {
    match kind {
        EnumKind::ComparisonDirection => COMPARISON_DIRECTION,
        EnumKind::ComparisonType => COMPARISON_TYPE,
        EnumKind::Precision => PRECISION,
        EnumKind::FftType => FFT_TYPE,
        EnumKind::RngAlgorithm => RNG_ALGORITHM,
        EnumKind::RngDistribution => RNG_DISTRIBUTION,
        EnumKind::Transpose => TRANSPOSE,
        EnumKind::CustomCallSchedule => &[],
    }
}
