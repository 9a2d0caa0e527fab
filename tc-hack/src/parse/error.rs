use std::fmt;

use thiserror::Error;

/// A 1-based line/column position in the source text. Columns count
/// characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Resolves a byte offset against precomputed line start offsets.
    pub(crate) fn from_offset(source: &str, line_offsets: &[usize], offset: usize) -> Self {
        let line = match line_offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = line_offsets.get(line).copied().unwrap_or(0);
        let end = offset.min(source.len());
        let column = source
            .get(line_start..end)
            .map_or(0, |prefix| prefix.chars().count());
        Self {
            line: line + 1,
            column: column + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Byte offsets at which each line of `source` starts.
pub(crate) fn compute_line_offsets(source: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, ch) in source.char_indices() {
        if ch == '\n' {
            offsets.push(i + 1);
        }
    }
    offsets
}

/// Malformed input. This is the only error the rewriter itself produces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unterminated string literal starting at {0}")]
    UnterminatedString(Location),

    #[error("Unterminated regex literal starting at {0}")]
    UnterminatedRegex(Location),

    #[error("Unterminated block comment starting at {0}")]
    UnterminatedComment(Location),

    #[error("Unexpected closing '{found}' at {location}")]
    UnexpectedDelimiter { found: char, location: Location },

    #[error("Mismatched delimiter: expected '{expected}' but found '{found}' at {location}")]
    MismatchedDelimiter {
        expected: char,
        found: char,
        location: Location,
    },

    #[error("Unclosed '{open}' opened at {location}")]
    UnclosedDelimiter { open: char, location: Location },
}

impl ParseError {
    pub fn location(&self) -> Location {
        match self {
            ParseError::UnterminatedString(location)
            | ParseError::UnterminatedRegex(location)
            | ParseError::UnterminatedComment(location)
            | ParseError::UnexpectedDelimiter { location, .. }
            | ParseError::MismatchedDelimiter { location, .. }
            | ParseError::UnclosedDelimiter { location, .. } => *location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_offset() {
        let source = "ab\ncdé\nf";
        let offsets = compute_line_offsets(source);
        assert_eq!(offsets, vec![0, 3, 8]);

        assert_eq!(
            Location::from_offset(source, &offsets, 0),
            Location { line: 1, column: 1 }
        );
        assert_eq!(
            Location::from_offset(source, &offsets, 3),
            Location { line: 2, column: 1 }
        );
        // 'é' is two bytes but one column
        assert_eq!(
            Location::from_offset(source, &offsets, 7),
            Location { line: 2, column: 4 }
        );
        assert_eq!(
            Location::from_offset(source, &offsets, 8),
            Location { line: 3, column: 1 }
        );
    }

    #[test]
    fn test_error_messages_name_position() {
        let err = ParseError::UnclosedDelimiter {
            open: '{',
            location: Location { line: 4, column: 9 },
        };
        assert_eq!(err.to_string(), "Unclosed '{' opened at line 4, column 9");
        assert_eq!(err.location().line, 4);
    }
}
