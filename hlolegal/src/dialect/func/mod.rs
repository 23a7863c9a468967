//! Function dialect.
//!
//! Functions are kept in generic form: a `func.func` operation with a
//! `sym_name` and a `function_type` attribute and an optional body region.
//! Only the printing and parsing use the custom `func.func @name(...)` form.
mod op;

pub use op::build_func;
pub use op::display_func;
pub use op::function_type;
pub use op::sym_name;
pub use op::CALL;
pub use op::FUNC;
pub use op::RETURN;
