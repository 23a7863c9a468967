/// The number of regions that an operation is constructed with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regions {
    Fixed(usize),
    /// The region count is passed when the operation is constructed.
    Variadic,
}

/// Definition of a StableHLO operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpDef {
    mnemonic: &'static str,
    regions: Regions,
}

impl OpDef {
    const fn new(mnemonic: &'static str) -> Self {
        Self {
            mnemonic,
            regions: Regions::Fixed(0),
        }
    }
    const fn with_regions(mnemonic: &'static str, regions: usize) -> Self {
        Self {
            mnemonic,
            regions: Regions::Fixed(regions),
        }
    }
    const fn variadic(mnemonic: &'static str) -> Self {
        Self {
            mnemonic,
            regions: Regions::Variadic,
        }
    }
    pub fn mnemonic(&self) -> &'static str {
        self.mnemonic
    }
    /// The operation name including the dialect prefix.
    pub fn name(&self) -> String {
        format!("stablehlo.{}", self.mnemonic)
    }
    pub fn regions(&self) -> Regions {
        self.regions
    }
}

/// StableHLO operations, sorted by mnemonic.
pub const OPS: &[OpDef] = &[
    OpDef::new("abs"),
    OpDef::new("add"),
    OpDef::new("after_all"),
    OpDef::new("all_gather"),
    OpDef::with_regions("all_reduce", 1),
    OpDef::new("all_to_all"),
    OpDef::new("and"),
    OpDef::new("atan2"),
    OpDef::new("batch_norm_grad"),
    OpDef::new("batch_norm_inference"),
    OpDef::new("batch_norm_training"),
    OpDef::new("bitcast_convert"),
    OpDef::new("broadcast"),
    OpDef::new("broadcast_in_dim"),
    OpDef::variadic("case"),
    OpDef::new("cbrt"),
    OpDef::new("ceil"),
    OpDef::new("cholesky"),
    OpDef::new("clamp"),
    OpDef::new("collective_broadcast"),
    OpDef::new("collective_permute"),
    OpDef::new("compare"),
    OpDef::new("complex"),
    OpDef::new("concatenate"),
    OpDef::new("constant"),
    OpDef::new("convert"),
    OpDef::new("convolution"),
    OpDef::new("cosine"),
    OpDef::new("count_leading_zeros"),
    OpDef::new("create_token"),
    OpDef::new("cross-replica-sum"),
    OpDef::new("custom_call"),
    OpDef::new("divide"),
    OpDef::new("dot"),
    OpDef::new("dot_general"),
    OpDef::new("dynamic_broadcast_in_dim"),
    OpDef::new("dynamic_conv"),
    OpDef::new("dynamic_gather"),
    OpDef::new("dynamic_iota"),
    OpDef::new("dynamic_pad"),
    OpDef::new("dynamic_reshape"),
    OpDef::new("dynamic_slice"),
    OpDef::new("dynamic_update_slice"),
    OpDef::new("einsum"),
    OpDef::new("exponential"),
    OpDef::new("exponential_minus_one"),
    OpDef::new("fft"),
    OpDef::new("floor"),
    OpDef::new("gather"),
    OpDef::new("get_dimension_size"),
    OpDef::new("get_tuple_element"),
    OpDef::with_regions("if", 2),
    OpDef::new("imag"),
    OpDef::new("infeed"),
    OpDef::new("iota"),
    OpDef::new("is_finite"),
    OpDef::new("log"),
    OpDef::new("log_plus_one"),
    OpDef::new("logistic"),
    OpDef::with_regions("map", 1),
    OpDef::new("maximum"),
    OpDef::new("minimum"),
    OpDef::new("multiply"),
    OpDef::new("negate"),
    OpDef::new("not"),
    OpDef::new("optimization_barrier"),
    OpDef::new("or"),
    OpDef::new("outfeed"),
    OpDef::new("pad"),
    OpDef::new("partition_id"),
    OpDef::new("popcnt"),
    OpDef::new("power"),
    OpDef::new("real"),
    OpDef::new("real_dynamic_slice"),
    OpDef::new("recv"),
    OpDef::with_regions("reduce", 1),
    OpDef::new("reduce_precision"),
    OpDef::with_regions("reduce_scatter", 1),
    OpDef::with_regions("reduce_window", 1),
    OpDef::new("remainder"),
    OpDef::new("replica_id"),
    OpDef::new("reshape"),
    OpDef::new("return"),
    OpDef::new("reverse"),
    OpDef::new("rng"),
    OpDef::new("rng_bit_generator"),
    OpDef::new("round_nearest_afz"),
    OpDef::new("round_nearest_even"),
    OpDef::new("rsqrt"),
    OpDef::with_regions("scatter", 1),
    OpDef::new("select"),
    OpDef::with_regions("select_and_scatter", 2),
    OpDef::new("send"),
    OpDef::new("set_dimension_size"),
    OpDef::new("shift_left"),
    OpDef::new("shift_right_arithmetic"),
    OpDef::new("shift_right_logical"),
    OpDef::new("sign"),
    OpDef::new("sine"),
    OpDef::new("slice"),
    OpDef::with_regions("sort", 1),
    OpDef::new("sqrt"),
    OpDef::new("subtract"),
    OpDef::new("tanh"),
    OpDef::new("torch_index_select"),
    OpDef::new("transpose"),
    OpDef::new("triangular_solve"),
    OpDef::new("tuple"),
    OpDef::new("unary_einsum"),
    OpDef::new("uniform_dequantize"),
    OpDef::new("uniform_quantize"),
    OpDef::with_regions("while", 2),
    OpDef::new("xor"),
];

/// Find the definition of the operation with the given mnemonic.
pub fn lookup(mnemonic: &str) -> Option<&'static OpDef> {
    OPS.iter().find(|def| def.mnemonic == mnemonic)
}
