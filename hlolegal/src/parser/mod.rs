//! Parsing logic for the textual IR including a scanner (tokenizer).
//!
//! Operation-specific parsing lives next to the IR data structures (see for
//! example [Operation](crate::ir::Operation)) as `impl Parser` blocks.

mod cursor;
mod parser;
mod scanner;
mod token;

pub use cursor::Cursor;
pub use parser::Parser;
pub use scanner::Scanner;
pub use token::Location;
pub use token::Token;
pub use token::TokenKind;
