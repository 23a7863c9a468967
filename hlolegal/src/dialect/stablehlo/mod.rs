//! The portable `stablehlo` dialect.

pub mod enums;
mod op;

pub use op::lookup;
pub use op::OpDef;
pub use op::Regions;
pub use op::OPS;
