//! Swift source text to full-fidelity syntax tree.

mod error;
mod lexer;
mod parser;

pub use error::{Location, ParseError};
pub use lexer::{tokenize, Lexeme, Lexer};
pub use parser::parse;
