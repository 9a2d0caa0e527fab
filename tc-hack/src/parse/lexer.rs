//! Lexical analysis for Swift source code.
//!
//! Converts source text into [`Token`]s that carry every byte of the input:
//! whitespace and comments become leading or trailing [`Trivia`]. A token's
//! trailing trivia holds the spaces, tabs and comments that follow it on the
//! same line; everything from the newline onwards leads the next token.

use std::iter::Peekable;
use std::str::CharIndices;

use super::error::{compute_line_offsets, Location, ParseError};
use crate::syntax::{Token, TokenKind};
use crate::trivia::{Trivia, TriviaPiece};

/// Words lexed as [`TokenKind::Keyword`]. Contextual keywords such as
/// `override` or `final` stay identifiers.
const KEYWORDS: &[&str] = &[
    "any", "as", "associatedtype", "async", "await", "break", "case", "catch", "class",
    "continue", "default", "defer", "deinit", "do", "else", "enum", "extension",
    "fallthrough", "false", "fileprivate", "for", "func", "guard", "if", "import", "in",
    "init", "inout", "internal", "is", "let", "nil", "operator", "private", "protocol",
    "public", "repeat", "rethrows", "return", "self", "Self", "some", "static", "struct",
    "subscript", "super", "switch", "throw", "throws", "true", "try", "typealias", "var",
    "where", "while",
];

/// A token with the byte offset where its text starts.
#[derive(Debug, Clone)]
pub struct Lexeme {
    pub token: Token,
    pub offset: usize,
}

/// A lexer that tokenizes Swift source code.
pub struct Lexer<'src> {
    source: &'src str,
    chars: Peekable<CharIndices<'src>>,
    position: usize,
    pending_trivia: Trivia,
    line_offsets: Vec<usize>,
    /// Whether the previous token leaves room for an operand, in which case
    /// `/` opens a regex literal rather than dividing.
    operand_allowed: bool,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("position", &self.position)
            .field("remaining", &self.source.get(self.position..).unwrap_or(""))
            .finish()
    }
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            position: 0,
            pending_trivia: Trivia::zero(),
            line_offsets: compute_line_offsets(source),
            operand_allowed: true,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Peeks `n+1` characters ahead without consuming (n=0 is `peek_char`).
    fn peek_char_n(&self, n: usize) -> Option<char> {
        let mut iter = self.chars.clone();
        for _ in 0..n {
            iter.next();
        }
        iter.next().map(|(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        let (pos, c) = self.chars.next()?;
        self.position = pos + c.len_utf8();
        Some(c)
    }

    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek_char().is_some_and(&predicate) {
            self.advance();
        }
    }

    /// Consumes characters up to byte offset `end`.
    fn advance_to(&mut self, end: usize) {
        while self.position < end && self.advance().is_some() {}
    }

    fn location(&self, offset: usize) -> Location {
        Location::from_offset(self.source, &self.line_offsets, offset)
    }

    fn rest(&self) -> &'src str {
        &self.source[self.position..]
    }

    /// Lexes the whole input. The last lexeme is always the end-of-file token.
    pub fn tokenize(mut self) -> Result<Vec<Lexeme>, ParseError> {
        let mut lexemes = Vec::new();
        loop {
            let lexeme = self.next_token()?;
            let done = lexeme.token.kind() == TokenKind::EndOfFile;
            lexemes.push(lexeme);
            if done {
                return Ok(lexemes);
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Lexeme, ParseError> {
        self.skip_trivia()?;
        let leading = std::mem::take(&mut self.pending_trivia);

        let source = self.source;
        let start = self.position;
        let kind = match self.peek_char() {
            None => TokenKind::EndOfFile,
            Some(c) => self.lex_token_kind(c, start)?,
        };
        let text = &source[start..self.position];

        if kind != TokenKind::EndOfFile {
            self.operand_allowed = operand_may_follow(kind, text);
            self.collect_trailing_trivia()?;
        }
        let trailing = std::mem::take(&mut self.pending_trivia);

        Ok(Lexeme {
            token: Token::with_trivia(kind, text, leading, trailing),
            offset: start,
        })
    }

    /// Collects whitespace, newlines and comments as leading trivia.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        if self.position == 0 && self.rest().starts_with("#!") {
            self.lex_line_comment();
        }
        loop {
            match self.peek_char() {
                Some(' ') => self.lex_run(' ', TriviaPiece::Spaces),
                Some('\t') => self.lex_run('\t', TriviaPiece::Tabs),
                Some('\n') => self.lex_run('\n', TriviaPiece::Newlines),
                Some('\r') if self.peek_char_n(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                    self.pending_trivia
                        .push(TriviaPiece::CarriageReturnLineFeeds(1));
                }
                Some('\r') => {
                    self.advance();
                    self.pending_trivia.push(TriviaPiece::CarriageReturns(1));
                }
                Some('/') if self.peek_char_n(1) == Some('/') => self.lex_line_comment(),
                Some('/') if self.peek_char_n(1) == Some('*') => {
                    let start = self.position;
                    let len = block_comment_len(self.rest())
                        .ok_or_else(|| ParseError::UnterminatedComment(self.location(start)))?;
                    self.advance_to(start + len);
                    self.pending_trivia.push(TriviaPiece::Comment(
                        self.source[start..self.position].to_string(),
                    ));
                }
                Some(c) if is_unexpected_whitespace(c) => {
                    self.advance();
                    self.pending_trivia
                        .push(TriviaPiece::Unexpected(c.to_string()));
                }
                _ => return Ok(()),
            }
        }
    }

    /// Collects trailing trivia (same-line whitespace and comments).
    fn collect_trailing_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek_char() {
                Some(' ') => self.lex_run(' ', TriviaPiece::Spaces),
                Some('\t') => self.lex_run('\t', TriviaPiece::Tabs),
                Some('/') if self.peek_char_n(1) == Some('/') => {
                    self.lex_line_comment();
                    return Ok(());
                }
                Some('/') if self.peek_char_n(1) == Some('*') => {
                    let source = self.source;
                    let start = self.position;
                    let len = block_comment_len(self.rest())
                        .ok_or_else(|| ParseError::UnterminatedComment(self.location(start)))?;
                    let text = &source[start..start + len];
                    // A comment spanning lines belongs to the next token.
                    if text.contains('\n') || text.contains('\r') {
                        return Ok(());
                    }
                    self.advance_to(start + len);
                    self.pending_trivia
                        .push(TriviaPiece::Comment(text.to_string()));
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_run(&mut self, unit: char, piece: fn(usize) -> TriviaPiece) {
        let start = self.position;
        self.advance_while(|c| c == unit);
        self.pending_trivia.push(piece(self.position - start));
    }

    /// `// ...` (and a leading `#!` line) up to, not including, the newline.
    fn lex_line_comment(&mut self) {
        let start = self.position;
        self.advance_while(|c| c != '\n' && c != '\r');
        self.pending_trivia.push(TriviaPiece::Comment(
            self.source[start..self.position].to_string(),
        ));
    }

    fn lex_token_kind(&mut self, c: char, start: usize) -> Result<TokenKind, ParseError> {
        let kind = match c {
            c if is_identifier_start(c) => self.lex_identifier_or_keyword(),
            '`' => self.lex_escaped_identifier(),
            '0'..='9' => self.lex_number(),
            '"' => self.lex_string(start)?,
            '#' if self.is_raw_string_start() => self.lex_string(start)?,
            '#' if self.is_extended_regex_start() => self.lex_extended_regex(start)?,
            '#' => {
                self.advance();
                if self.peek_char().is_some_and(is_identifier_start) {
                    self.advance_while(is_identifier_continue);
                    TokenKind::PoundDirective
                } else {
                    TokenKind::Unknown
                }
            }
            '@' => {
                self.advance();
                self.advance_while(is_identifier_continue);
                TokenKind::Attribute
            }
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            '[' => self.single(TokenKind::LeftSquare),
            ']' => self.single(TokenKind::RightSquare),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            ';' => self.single(TokenKind::Semicolon),
            '\\' => self.single(TokenKind::Operator),
            '.' => self.lex_dot(),
            '/' if self.operand_allowed => match bare_regex_len(self.rest()) {
                Some(len) => {
                    self.advance_to(start + len);
                    TokenKind::RegexLiteral
                }
                None => self.lex_operator(start),
            },
            c if is_operator_char(c) => self.lex_operator(start),
            _ => self.single(TokenKind::Unknown),
        };
        Ok(kind)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn lex_identifier_or_keyword(&mut self) -> TokenKind {
        let start = self.position;
        self.advance();
        self.advance_while(is_identifier_continue);
        if KEYWORDS.contains(&&self.source[start..self.position]) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        }
    }

    /// `` `default` `` is an ordinary identifier.
    fn lex_escaped_identifier(&mut self) -> TokenKind {
        self.advance();
        self.advance_while(|c| c != '`' && c != '\n' && c != '\r');
        if self.peek_char() == Some('`') {
            self.advance();
            TokenKind::Identifier
        } else {
            TokenKind::Unknown
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        loop {
            match self.peek_char() {
                Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
                    self.advance();
                    let exponent = matches!(c, 'e' | 'E' | 'p' | 'P');
                    if exponent
                        && matches!(self.peek_char(), Some('+' | '-'))
                        && self.peek_char_n(1).is_some_and(|d| d.is_ascii_digit())
                    {
                        self.advance();
                    }
                }
                Some('.') if self.peek_char_n(1).is_some_and(|d| d.is_ascii_digit()) => {
                    self.advance();
                }
                _ => return TokenKind::Number,
            }
        }
    }

    fn is_raw_string_start(&self) -> bool {
        let mut n = 0;
        while self.peek_char_n(n) == Some('#') {
            n += 1;
        }
        n > 0 && self.peek_char_n(n) == Some('"')
    }

    fn is_extended_regex_start(&self) -> bool {
        let mut n = 0;
        while self.peek_char_n(n) == Some('#') {
            n += 1;
        }
        n > 0 && self.peek_char_n(n) == Some('/')
    }

    /// Lexes `#/.../#`, `##/.../##` and so on. The body may span lines and
    /// contain unescaped quotes and slashes.
    fn lex_extended_regex(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let mut hashes = 0;
        while self.peek_char() == Some('#') {
            self.advance();
            hashes += 1;
        }
        self.advance();

        loop {
            match self.advance() {
                None => return Err(ParseError::UnterminatedRegex(self.location(start))),
                Some('\\') => {
                    self.advance();
                }
                Some('/') if self.at_hashes(0, hashes) => {
                    for _ in 0..hashes {
                        self.advance();
                    }
                    return Ok(TokenKind::RegexLiteral);
                }
                Some(_) => {}
            }
        }
    }

    /// `true` when the next `count` characters are all `#`.
    fn at_hashes(&self, offset: usize, count: usize) -> bool {
        (0..count).all(|i| self.peek_char_n(offset + i) == Some('#'))
    }

    /// Lexes `"..."`, `"""..."""` and their raw `#"..."#` forms, including
    /// `\( ... )` interpolations with nested strings.
    fn lex_string(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let mut hashes = 0;
        while self.peek_char() == Some('#') {
            self.advance();
            hashes += 1;
        }
        let multiline = self.peek_char_n(1) == Some('"') && self.peek_char_n(2) == Some('"');
        let quotes = if multiline { 3 } else { 1 };
        for _ in 0..quotes {
            self.advance();
        }

        loop {
            match self.advance() {
                None => return Err(ParseError::UnterminatedString(self.location(start))),
                Some('\n' | '\r') if !multiline => {
                    return Err(ParseError::UnterminatedString(self.location(start)))
                }
                Some('\\') if self.at_hashes(0, hashes) => {
                    for _ in 0..hashes {
                        self.advance();
                    }
                    match self.advance() {
                        None => return Err(ParseError::UnterminatedString(self.location(start))),
                        Some('(') => self.skip_interpolation(start)?,
                        Some(_) => {}
                    }
                }
                Some('"') if !multiline && self.at_hashes(0, hashes) => {
                    for _ in 0..hashes {
                        self.advance();
                    }
                    return Ok(TokenKind::StringLiteral);
                }
                Some('"')
                    if multiline
                        && self.peek_char() == Some('"')
                        && self.peek_char_n(1) == Some('"')
                        && self.at_hashes(2, hashes) =>
                {
                    for _ in 0..2 + hashes {
                        self.advance();
                    }
                    return Ok(TokenKind::StringLiteral);
                }
                Some(_) => {}
            }
        }
    }

    /// Skips the body of `\( ... )` after its opening parenthesis.
    fn skip_interpolation(&mut self, string_start: usize) -> Result<(), ParseError> {
        let mut depth = 1usize;
        loop {
            match self.peek_char() {
                None => return Err(ParseError::UnterminatedString(self.location(string_start))),
                Some('"') => {
                    let nested = self.position;
                    self.lex_string(nested)?;
                }
                Some('#') if self.is_raw_string_start() => {
                    let nested = self.position;
                    self.lex_string(nested)?;
                }
                Some('(') => {
                    self.advance();
                    depth += 1;
                }
                Some(')') => {
                    self.advance();
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// `.` alone is a period; `...` and `..<` are operators.
    fn lex_dot(&mut self) -> TokenKind {
        self.advance();
        if self.peek_char() == Some('.') {
            self.advance_while(|c| c == '.' || is_operator_char(c));
            TokenKind::Operator
        } else {
            TokenKind::Period
        }
    }

    fn lex_operator(&mut self, start: usize) -> TokenKind {
        loop {
            match self.peek_char() {
                Some('/') if matches!(self.peek_char_n(1), Some('/' | '*')) => break,
                Some(c) if is_operator_char(c) => {
                    self.advance();
                }
                _ => break,
            }
        }
        match &self.source[start..self.position] {
            "=" => TokenKind::Equal,
            "->" => TokenKind::Arrow,
            "!" => TokenKind::ExclamationMark,
            "?" => TokenKind::QuestionMark,
            _ => TokenKind::Operator,
        }
    }
}

/// Lexes `source` into tokens, ending with the end-of-file token.
pub fn tokenize(source: &str) -> Result<Vec<Lexeme>, ParseError> {
    Lexer::new(source).tokenize()
}

/// Byte length of the (possibly nested) block comment at the start of `text`,
/// or `None` when it is never closed.
fn block_comment_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

/// Byte length of the bare `/.../` regex at the start of `text`, or `None`
/// when the slash reads as an operator: the literal must close on the same
/// line and may neither start nor end with whitespace.
fn bare_regex_len(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().skip(1).peekable();
    let &(_, first) = chars.peek()?;
    if first.is_whitespace() || matches!(first, '/' | '*' | ')') {
        return None;
    }
    let mut previous = first;
    while let Some((i, c)) = chars.next() {
        match c {
            '\n' | '\r' => return None,
            '\\' => {
                let (_, escaped) = chars.next()?;
                if matches!(escaped, '\n' | '\r') {
                    return None;
                }
                previous = escaped;
                continue;
            }
            '/' => {
                if previous == ' ' || previous == '\t' {
                    return None;
                }
                return Some(i + 1);
            }
            _ => {}
        }
        previous = c;
    }
    None
}

/// Whether an operand may follow a token of `kind` spelled `text`.
fn operand_may_follow(kind: TokenKind, text: &str) -> bool {
    match kind {
        TokenKind::Operator
        | TokenKind::LeftParen
        | TokenKind::LeftSquare
        | TokenKind::LeftBrace
        | TokenKind::Comma
        | TokenKind::Colon
        | TokenKind::Semicolon
        | TokenKind::Equal
        | TokenKind::Arrow => true,
        TokenKind::Keyword => {
            !matches!(text, "self" | "Self" | "super" | "true" | "false" | "nil")
        }
        _ => false,
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_identifier_continue(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '/' | '=' | '-' | '+' | '!' | '*' | '%' | '<' | '>' | '&' | '|' | '^' | '~' | '?'
    )
}

/// Whitespace without a dedicated trivia piece.
fn is_unexpected_whitespace(c: char) -> bool {
    c == '\u{feff}' || (c.is_whitespace() && !matches!(c, ' ' | '\t' | '\n' | '\r'))
}
