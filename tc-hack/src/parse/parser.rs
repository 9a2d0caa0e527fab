//! Declaration-level parser.
//!
//! Works in two steps. Delimiters are matched first: `()`/`[]` groups become
//! [`Expression`] nodes and `{}` become [`CodeBlock`]s whose contents are
//! parsed recursively. The element sequence of a file or block is then split
//! into items at line boundaries, and each item is classified as a class,
//! function or variable declaration or left as an opaque [`Statement`].

use std::sync::Arc;

use super::error::{compute_line_offsets, Location, ParseError};
use super::lexer::{tokenize, Lexeme};
use crate::syntax::{
    ClassDecl, CodeBlock, Expression, FunctionDecl, FunctionSignature, InheritanceClause,
    InheritedType, MemberList, Node, PatternBinding, SourceFile, Statement, Token, TokenKind,
    TypeAnnotation, VariableDecl,
};

/// Declaration modifiers that may precede `class`, `func`, `var` and `let`.
const MODIFIERS: &[&str] = &[
    "borrowing", "consuming", "convenience", "distributed", "dynamic", "fileprivate",
    "final", "indirect", "infix", "internal", "isolated", "lazy", "mutating",
    "nonisolated", "nonmutating", "open", "optional", "override", "package", "postfix",
    "prefix", "private", "public", "required", "static", "unowned", "weak",
];

/// Words that may follow `class` when it is used as a modifier.
const CLASS_MEMBER_INTRODUCERS: &[&str] = &["func", "var", "let", "subscript", "typealias"];

const EFFECT_WORDS: &[&str] = &["async", "reasync", "throws", "rethrows"];

/// Parses Swift source into a full-fidelity [`SourceFile`].
pub fn parse(source: &str) -> Result<SourceFile, ParseError> {
    let lexemes = tokenize(source)?;
    Parser::new(source, lexemes).parse_source_file()
}

struct Parser<'src> {
    source: &'src str,
    line_offsets: Vec<usize>,
    lexemes: Vec<Lexeme>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, lexemes: Vec<Lexeme>) -> Self {
        Self {
            source,
            line_offsets: compute_line_offsets(source),
            lexemes,
            pos: 0,
        }
    }

    fn location(&self, offset: usize) -> Location {
        Location::from_offset(self.source, &self.line_offsets, offset)
    }

    fn current(&self) -> &Lexeme {
        // The lexer always ends the stream with an end-of-file token and
        // nothing advances past it.
        &self.lexemes[self.pos.min(self.lexemes.len() - 1)]
    }

    fn bump(&mut self) -> Lexeme {
        let lexeme = self.current().clone();
        if lexeme.token.kind() != TokenKind::EndOfFile {
            self.pos += 1;
        }
        lexeme
    }

    fn parse_source_file(&mut self) -> Result<SourceFile, ParseError> {
        let elements = self.parse_elements(None)?;
        let eof = self.bump().token;
        Ok(SourceFile {
            items: build_items(elements),
            eof,
        })
    }

    /// Reads elements up to, not including, the delimiter closing `opener`.
    /// With no opener, reads to the end of the file.
    fn parse_elements(&mut self, opener: Option<(char, usize)>) -> Result<Vec<Node>, ParseError> {
        let mut elements = Vec::new();
        loop {
            let lexeme = self.current();
            let offset = lexeme.offset;
            match lexeme.token.kind() {
                TokenKind::EndOfFile => {
                    return match opener {
                        None => Ok(elements),
                        Some((open, at)) => Err(ParseError::UnclosedDelimiter {
                            open,
                            location: self.location(at),
                        }),
                    };
                }
                TokenKind::LeftParen | TokenKind::LeftSquare => {
                    elements.push(Node::Expression(self.parse_group()?));
                }
                TokenKind::LeftBrace => {
                    elements.push(Node::CodeBlock(self.parse_block()?));
                }
                kind @ (TokenKind::RightParen | TokenKind::RightSquare | TokenKind::RightBrace) => {
                    let found = delimiter_char(kind);
                    return match opener.map(|(open, _)| closing_for(open)) {
                        Some(expected) if expected == found => Ok(elements),
                        Some(expected) => Err(ParseError::MismatchedDelimiter {
                            expected,
                            found,
                            location: self.location(offset),
                        }),
                        None => Err(ParseError::UnexpectedDelimiter {
                            found,
                            location: self.location(offset),
                        }),
                    };
                }
                _ => elements.push(Node::Token(self.bump().token)),
            }
        }
    }

    fn parse_group(&mut self) -> Result<Arc<Expression>, ParseError> {
        let open = self.bump();
        let inner = self.parse_elements(Some((delimiter_char(open.token.kind()), open.offset)))?;
        let close = self.bump();

        let mut elements = Vec::with_capacity(inner.len() + 2);
        elements.push(Node::Token(open.token));
        elements.extend(inner);
        elements.push(Node::Token(close.token));
        Ok(Arc::new(Expression { elements }))
    }

    fn parse_block(&mut self) -> Result<Arc<CodeBlock>, ParseError> {
        let open = self.bump();
        let inner = self.parse_elements(Some(('{', open.offset)))?;
        let close = self.bump();
        Ok(Arc::new(CodeBlock {
            left_brace: open.token,
            items: build_items(inner),
            right_brace: close.token,
        }))
    }
}

fn delimiter_char(kind: TokenKind) -> char {
    kind.fixed_text()
        .and_then(|text| text.chars().next())
        .unwrap_or('?')
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn build_items(elements: Vec<Node>) -> Vec<Node> {
    split_items(elements).into_iter().map(classify).collect()
}

/// Splits a block's elements into items: one per line unless the next line
/// continues the current item. A `;` is an item of its own.
fn split_items(elements: Vec<Node>) -> Vec<Vec<Node>> {
    let mut items = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    for element in elements {
        if token_kind(&element) == Some(TokenKind::Semicolon) {
            if !current.is_empty() {
                items.push(std::mem::take(&mut current));
            }
            items.push(vec![element]);
            continue;
        }
        if !current.is_empty() && starts_line(&element) && !continues(&current, &element) {
            items.push(std::mem::take(&mut current));
        }
        current.push(element);
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

fn token_kind(node: &Node) -> Option<TokenKind> {
    node.as_token().map(Token::kind)
}

fn starts_line(node: &Node) -> bool {
    node.first_token()
        .is_some_and(|t| t.leading_trivia().contains_newline())
}

/// Whether `next`, which starts a new line, belongs to the item `current`.
fn continues(current: &[Node], next: &Node) -> bool {
    if prefix_len(current) == current.len() {
        return true;
    }

    let last = current.last();
    if let Some(Node::Token(token)) = last {
        match token.kind() {
            TokenKind::Comma | TokenKind::Colon | TokenKind::Period => return true,
            TokenKind::Equal | TokenKind::Arrow => return true,
            // A binary operator has whitespace on its left; `Array<Int>` does not.
            TokenKind::Operator if !token.leading_trivia().is_empty() => return true,
            _ => {}
        }
    }

    match next {
        Node::CodeBlock(_) => !matches!(last, Some(Node::CodeBlock(_))),
        Node::Token(token) => match token.kind() {
            TokenKind::Period | TokenKind::Comma | TokenKind::Colon => true,
            TokenKind::Equal | TokenKind::Arrow => true,
            // `+ b` continues, a prefix `!flag` or `-1` starts a new item.
            TokenKind::Operator | TokenKind::QuestionMark => {
                !token.trailing_trivia().is_empty()
            }
            _ if token.is_word("else") || token.is_word("catch") || token.is_word("where") => {
                true
            }
            _ if token.is_word("while") => {
                let repeat = current
                    .first()
                    .and_then(Node::as_token)
                    .is_some_and(|t| t.is_word("repeat"));
                repeat && matches!(last, Some(Node::CodeBlock(_)))
            }
            _ => false,
        },
        _ => false,
    }
}

fn is_modifier(token: &Token) -> bool {
    MODIFIERS.iter().any(|m| token.is_word(m))
}

/// Number of leading attribute and modifier elements, argument groups
/// (`@available(...)`, `private(set)`) included.
fn prefix_len(elements: &[Node]) -> usize {
    let mut i = 0;
    while let Some(Node::Token(token)) = elements.get(i) {
        let class_modifier = token.is_word("class")
            && elements
                .get(i + 1)
                .and_then(Node::as_token)
                .is_some_and(|next| {
                    CLASS_MEMBER_INTRODUCERS.iter().any(|w| next.is_word(w)) || is_modifier(next)
                });
        if token.kind() != TokenKind::Attribute && !is_modifier(token) && !class_modifier {
            break;
        }
        i += 1;
        if let Some(Node::Expression(group)) = elements.get(i) {
            let glued = token.trailing_trivia().is_empty()
                && group.open().is_some_and(|open| {
                    open.kind() == TokenKind::LeftParen && open.leading_trivia().is_empty()
                });
            if glued {
                i += 1;
            }
        }
    }
    i
}

fn classify(elements: Vec<Node>) -> Node {
    let start = prefix_len(&elements);
    let introducer = elements.get(start).and_then(Node::as_token);
    let decl = match introducer {
        Some(t) if t.is_word("class") => {
            class_decl(&elements, start).map(|d| Node::Class(Arc::new(d)))
        }
        Some(t) if t.is_word("func") => {
            function_decl(&elements, start).map(|d| Node::Function(Arc::new(d)))
        }
        Some(t) if t.is_word("var") || t.is_word("let") => {
            variable_decl(&elements, start).map(|d| Node::Variable(Arc::new(d)))
        }
        _ => None,
    };
    decl.unwrap_or_else(|| Node::Statement(Arc::new(Statement { elements })))
}

/// Net change in angle-bracket depth contributed by an operator token.
fn angle_delta(node: &Node) -> i32 {
    match node {
        Node::Token(t) if t.kind() == TokenKind::Operator => {
            let opens = t.text().matches('<').count() as i32;
            let closes = t.text().matches('>').count() as i32;
            opens - closes
        }
        _ => 0,
    }
}

/// Index just past a generic clause starting at `start`, or `start` when
/// there is none. Never goes beyond `limit`.
fn generic_clause_end(elements: &[Node], start: usize, limit: usize) -> usize {
    let opens_generics = elements
        .get(start)
        .and_then(Node::as_token)
        .is_some_and(|t| t.kind() == TokenKind::Operator && t.text().starts_with('<'));
    if !opens_generics || start >= limit {
        return start;
    }
    let mut depth = 0;
    for (i, node) in elements.iter().enumerate().take(limit).skip(start) {
        depth += angle_delta(node);
        if depth <= 0 {
            return i + 1;
        }
    }
    limit
}

fn class_decl(elements: &[Node], start: usize) -> Option<ClassDecl> {
    let name = elements.get(start + 1)?.as_token()?;
    if name.kind() != TokenKind::Identifier {
        return None;
    }
    let body_index = elements.len() - 1;
    let Node::CodeBlock(body) = &elements[body_index] else {
        return None;
    };
    if body_index < start + 2 {
        return None;
    }

    let mut i = generic_clause_end(elements, start + 2, body_index);
    let generic_clause = elements[start + 2..i].to_vec();

    let mut inheritance = None;
    if let Some(colon) = elements[i..body_index]
        .first()
        .and_then(Node::as_token)
        .filter(|t| t.kind() == TokenKind::Colon)
    {
        let where_index = (i + 1..body_index)
            .find(|&j| elements[j].as_token().is_some_and(|t| t.is_word("where")))
            .unwrap_or(body_index);
        inheritance = Some(Arc::new(InheritanceClause {
            colon: colon.clone(),
            entries: inherited_types(&elements[i + 1..where_index]),
        }));
        i = where_index;
    }

    Some(ClassDecl {
        modifiers: elements[..start].to_vec(),
        class_keyword: elements[start].as_token()?.clone(),
        name: name.clone(),
        generic_clause,
        inheritance,
        where_clause: elements[i..body_index].to_vec(),
        members: Arc::new(MemberList {
            left_brace: body.left_brace.clone(),
            members: body.items.clone(),
            right_brace: body.right_brace.clone(),
        }),
    })
}

fn inherited_types(elements: &[Node]) -> Vec<Arc<InheritedType>> {
    let mut entries = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0;
    for node in elements {
        depth += angle_delta(node);
        if token_kind(node) == Some(TokenKind::Comma) && depth <= 0 {
            entries.push(Arc::new(InheritedType {
                type_name: std::mem::take(&mut current),
                trailing_comma: node.as_token().cloned(),
            }));
            continue;
        }
        current.push(node.clone());
    }
    if !current.is_empty() {
        entries.push(Arc::new(InheritedType {
            type_name: current,
            trailing_comma: None,
        }));
    }
    entries
}

fn function_decl(elements: &[Node], start: usize) -> Option<FunctionDecl> {
    let name = elements.get(start + 1)?.as_token()?;
    let body_index = match elements.last() {
        Some(Node::CodeBlock(_)) if elements.len() - 1 > start + 1 => Some(elements.len() - 1),
        _ => None,
    };
    let limit = body_index.unwrap_or(elements.len());

    let params_index = generic_clause_end(elements, start + 2, limit);
    let Some(Node::Expression(parameters)) = elements.get(params_index) else {
        return None;
    };
    if params_index >= limit || parameters.open().map(Token::kind) != Some(TokenKind::LeftParen) {
        return None;
    }

    let mut i = params_index + 1;
    while i < limit {
        match &elements[i] {
            Node::Token(t) if EFFECT_WORDS.iter().any(|w| t.is_word(w)) => i += 1,
            // typed throws: `throws(MyError)`
            Node::Expression(_)
                if elements[i - 1]
                    .as_token()
                    .is_some_and(|t| t.is_word("throws")) =>
            {
                i += 1
            }
            _ => break,
        }
    }

    let body = match body_index.map(|b| &elements[b]) {
        Some(Node::CodeBlock(block)) => Some(block.clone()),
        _ => None,
    };

    Some(FunctionDecl {
        modifiers: elements[..start].to_vec(),
        func_keyword: elements[start].as_token()?.clone(),
        name: name.clone(),
        signature: FunctionSignature {
            generic_clause: elements[start + 2..params_index].to_vec(),
            parameters: parameters.clone(),
            effects: elements[params_index + 1..i].to_vec(),
            output: elements[i..limit].to_vec(),
        },
        body,
    })
}

fn variable_decl(elements: &[Node], start: usize) -> Option<VariableDecl> {
    let mut bindings = Vec::new();
    let mut i = start + 1;
    while i < elements.len() {
        let binding_start = i;
        while i < elements.len()
            && !matches!(
                token_kind(&elements[i]),
                Some(TokenKind::Colon | TokenKind::Equal | TokenKind::Comma)
            )
            && !matches!(elements[i], Node::CodeBlock(_))
        {
            i += 1;
        }
        let pattern = elements[binding_start..i].to_vec();
        if pattern.is_empty() {
            return None;
        }

        let mut type_annotation = None;
        if let Some(colon) = elements
            .get(i)
            .and_then(Node::as_token)
            .filter(|t| t.kind() == TokenKind::Colon)
        {
            i += 1;
            let ty_start = i;
            let mut depth = 0;
            while i < elements.len() {
                let node = &elements[i];
                let ends_type = matches!(node, Node::CodeBlock(_))
                    || token_kind(node) == Some(TokenKind::Equal)
                    || (token_kind(node) == Some(TokenKind::Comma) && depth <= 0);
                if ends_type {
                    break;
                }
                depth += angle_delta(node);
                i += 1;
            }
            type_annotation = Some(TypeAnnotation {
                colon: colon.clone(),
                ty: elements[ty_start..i].to_vec(),
            });
        }

        let tail_start = i;
        while i < elements.len() && token_kind(&elements[i]) != Some(TokenKind::Comma) {
            i += 1;
        }
        let tail = elements[tail_start..i].to_vec();

        let trailing_comma = elements.get(i).and_then(Node::as_token).cloned();
        if trailing_comma.is_some() {
            i += 1;
        }
        bindings.push(PatternBinding {
            pattern,
            type_annotation,
            tail,
            trailing_comma,
        });
    }
    if bindings.is_empty() {
        return None;
    }

    Some(VariableDecl {
        modifiers: elements[..start].to_vec(),
        keyword: elements[start].as_token()?.clone(),
        bindings,
    })
}
