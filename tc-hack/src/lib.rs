//! Migrates Swift test classes from one base class to another.
//!
//! The source is parsed into a full-fidelity syntax tree, qualifying classes
//! are rewritten structurally, and the tree is rendered back to text that is
//! byte-identical to the input outside the edited spans.

pub mod config;
pub mod diff;
pub mod engine;
pub mod matchers;
pub mod parse;
pub mod render;
pub mod rules;
pub mod syntax;
pub mod trivia;

#[cfg(test)]
mod tests;

pub use config::RewriteConfig;
pub use diff::{generate_unified_diff, print_diff, DiffStats};
pub use engine::{ClassReport, RewriteEngine, RewriteReport};
pub use parse::{parse, Location, ParseError};
pub use render::render;
pub use syntax::{Node, SourceFile, Token, TokenKind};
pub use trivia::{Trivia, TriviaPiece};

/// The outcome of rewriting one source text.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub text: String,
    pub report: RewriteReport,
}

/// Parses `source`, runs the rewrite engine with `config` and renders the
/// result.
pub fn rewrite_source(source: &str, config: &RewriteConfig) -> Result<Rewrite, ParseError> {
    let file = parse(source)?;
    let (rewritten, report) = RewriteEngine::new(config.clone()).process_with_report(&file);
    Ok(Rewrite {
        text: render(&rewritten),
        report,
    })
}
