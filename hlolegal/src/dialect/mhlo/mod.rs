//! The internal `mhlo` dialect.
//!
//! Only the parts that the legalization needs are described here: which
//! operations are compiler-private, which have no StableHLO counterpart, and
//! the symbols of the dialect enums.

pub mod enums;
mod op;

pub use op::counterpart;
pub use op::is_private_op;
pub use op::CUSTOM_CALL_ONLY_OPS;
pub use op::PRIVATE_OPS;
