//! Serializes a syntax tree back to source text.

use std::fmt;

use crate::syntax::{Node, SourceFile, Token};

/// Flattens `file` back to text: every token's leading trivia, text and
/// trailing trivia, depth-first.
pub fn render(file: &SourceFile) -> String {
    let mut out = String::new();
    for item in &file.items {
        write_node(item, &mut out);
    }
    write_token(&file.eof, &mut out);
    out
}

pub fn render_node(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    node.for_each_token(&mut |token| write_token(token, out));
}

fn write_token(token: &Token, out: &mut String) {
    token.leading_trivia().write_to(out);
    out.push_str(token.text());
    token.trailing_trivia().write_to(out);
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(self.full_len());
        write_token(self, &mut out);
        f.write_str(&out)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_node(self))
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}
