//! Trivia: the whitespace and comments attached to a token.
//!
//! Every byte of a source file that is not part of a token's text lives in
//! the leading or trailing trivia of some token. Rendering all trivia and
//! token text in order reproduces the input exactly.

use std::fmt;

/// A single run of non-semantic text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TriviaPiece {
    Spaces(usize),
    Tabs(usize),
    Newlines(usize),
    CarriageReturns(usize),
    CarriageReturnLineFeeds(usize),
    /// A line or block comment, delimiters included.
    Comment(String),
    /// Whitespace with no dedicated piece (BOM, form feed, vertical tab, ...).
    Unexpected(String),
}

impl TriviaPiece {
    /// Returns `true` if this piece ends a line.
    pub fn is_newline(&self) -> bool {
        matches!(
            self,
            TriviaPiece::Newlines(_)
                | TriviaPiece::CarriageReturns(_)
                | TriviaPiece::CarriageReturnLineFeeds(_)
        )
    }

    /// Returns `true` for spaces and tabs.
    pub fn is_indentation(&self) -> bool {
        matches!(self, TriviaPiece::Spaces(_) | TriviaPiece::Tabs(_))
    }

    pub fn write_to(&self, out: &mut String) {
        match self {
            TriviaPiece::Spaces(n) => push_repeated(out, " ", *n),
            TriviaPiece::Tabs(n) => push_repeated(out, "\t", *n),
            TriviaPiece::Newlines(n) => push_repeated(out, "\n", *n),
            TriviaPiece::CarriageReturns(n) => push_repeated(out, "\r", *n),
            TriviaPiece::CarriageReturnLineFeeds(n) => push_repeated(out, "\r\n", *n),
            TriviaPiece::Comment(text) | TriviaPiece::Unexpected(text) => out.push_str(text),
        }
    }

    /// Number of bytes this piece renders to.
    pub fn len(&self) -> usize {
        match self {
            TriviaPiece::Spaces(n)
            | TriviaPiece::Tabs(n)
            | TriviaPiece::Newlines(n)
            | TriviaPiece::CarriageReturns(n) => *n,
            TriviaPiece::CarriageReturnLineFeeds(n) => n * 2,
            TriviaPiece::Comment(text) | TriviaPiece::Unexpected(text) => text.len(),
        }
    }

    /// Merges `other` into `self` when both are runs of the same character.
    fn merge(&mut self, other: &TriviaPiece) -> bool {
        match (self, other) {
            (TriviaPiece::Spaces(a), TriviaPiece::Spaces(b))
            | (TriviaPiece::Tabs(a), TriviaPiece::Tabs(b))
            | (TriviaPiece::Newlines(a), TriviaPiece::Newlines(b))
            | (TriviaPiece::CarriageReturns(a), TriviaPiece::CarriageReturns(b))
            | (
                TriviaPiece::CarriageReturnLineFeeds(a),
                TriviaPiece::CarriageReturnLineFeeds(b),
            ) => {
                *a += b;
                true
            }
            (TriviaPiece::Unexpected(a), TriviaPiece::Unexpected(b)) => {
                a.push_str(b);
                true
            }
            _ => false,
        }
    }
}

/// The line terminator style a file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    fn piece(self, count: usize) -> TriviaPiece {
        match self {
            LineEnding::Lf => TriviaPiece::Newlines(count),
            LineEnding::CrLf => TriviaPiece::CarriageReturnLineFeeds(count),
            LineEnding::Cr => TriviaPiece::CarriageReturns(count),
        }
    }
}

fn push_repeated(out: &mut String, unit: &str, count: usize) {
    for _ in 0..count {
        out.push_str(unit);
    }
}

/// An ordered sequence of trivia pieces. Immutable once built; the builder
/// methods return new values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Trivia(Vec<TriviaPiece>);

impl Trivia {
    pub fn zero() -> Self {
        Self(Vec::new())
    }

    pub fn spaces(count: usize) -> Self {
        Self::zero().appending(TriviaPiece::Spaces(count))
    }

    /// `count` line breaks written with `ending`.
    pub fn line_breaks(count: usize, ending: LineEnding) -> Self {
        Self::zero().appending(ending.piece(count))
    }

    pub fn pieces(&self) -> &[TriviaPiece] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy with `piece` appended, merging runs of the same kind.
    pub fn appending(&self, piece: TriviaPiece) -> Self {
        let mut next = self.clone();
        next.push(piece);
        next
    }

    /// Returns a copy with every piece of `other` appended.
    pub fn concat(&self, other: &Trivia) -> Self {
        let mut next = self.clone();
        for piece in &other.0 {
            next.push(piece.clone());
        }
        next
    }

    pub(crate) fn push(&mut self, piece: TriviaPiece) {
        if piece.len() == 0 {
            return;
        }
        if let Some(last) = self.0.last_mut() {
            if last.merge(&piece) {
                return;
            }
        }
        self.0.push(piece);
    }

    pub fn contains_newline(&self) -> bool {
        self.0.iter().any(TriviaPiece::is_newline)
    }

    /// The kind of the first line break, if any.
    pub fn line_ending(&self) -> Option<LineEnding> {
        self.0.iter().find_map(|piece| match piece {
            TriviaPiece::Newlines(_) => Some(LineEnding::Lf),
            TriviaPiece::CarriageReturnLineFeeds(_) => Some(LineEnding::CrLf),
            TriviaPiece::CarriageReturns(_) => Some(LineEnding::Cr),
            _ => None,
        })
    }

    pub fn contains_comment(&self) -> bool {
        self.0.iter().any(|p| matches!(p, TriviaPiece::Comment(_)))
    }

    /// The spaces and tabs that follow the last newline, i.e. the indentation
    /// of the token this trivia leads. `None` when the trivia has no newline.
    pub fn indentation(&self) -> Option<Trivia> {
        let last_newline = self.0.iter().rposition(TriviaPiece::is_newline)?;
        let indent = self.0[last_newline + 1..]
            .iter()
            .take_while(|p| p.is_indentation())
            .cloned()
            .collect();
        Some(indent)
    }

    /// Number of bytes this trivia renders to.
    pub fn len(&self) -> usize {
        self.0.iter().map(TriviaPiece::len).sum()
    }

    pub fn write_to(&self, out: &mut String) {
        for piece in &self.0 {
            piece.write_to(out);
        }
    }
}

impl FromIterator<TriviaPiece> for Trivia {
    fn from_iter<I: IntoIterator<Item = TriviaPiece>>(iter: I) -> Self {
        let mut trivia = Trivia::zero();
        for piece in iter {
            trivia.push(piece);
        }
        trivia
    }
}

impl fmt::Display for Trivia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(self.len());
        self.write_to(&mut out);
        f.write_str(&out)
    }
}
