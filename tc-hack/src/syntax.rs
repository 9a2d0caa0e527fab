//! Full-fidelity syntax tree for Swift sources.
//!
//! The tree is immutable. Children are shared through [`Arc`], and every
//! `with_*` / `appending` method returns a new value that reuses the untouched
//! subtrees of the old one. Nothing in the tree is ever mutated in place.
//!
//! Only the shapes the rewriter cares about get dedicated node types:
//! classes, functions, variables, inheritance clauses, code blocks and member
//! lists. Everything else is kept as an opaque [`Statement`] whose bracketed
//! groups ([`Expression`]) and braces ([`CodeBlock`]) are still structured, so
//! declarations nested anywhere in the file stay reachable.

use std::sync::Arc;

use crate::trivia::Trivia;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    /// `@objc`, `@MainActor`, ...
    Attribute,
    /// `#if`, `#selector`, ...
    PoundDirective,
    Number,
    StringLiteral,
    /// `/a+/` or `#/a+/#`.
    RegexLiteral,
    Operator,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftSquare,
    RightSquare,
    Comma,
    Colon,
    Semicolon,
    Period,
    Equal,
    Arrow,
    ExclamationMark,
    QuestionMark,
    Unknown,
    EndOfFile,
}

impl TokenKind {
    /// The text of tokens whose spelling is fixed by their kind.
    pub fn fixed_text(self) -> Option<&'static str> {
        match self {
            TokenKind::LeftParen => Some("("),
            TokenKind::RightParen => Some(")"),
            TokenKind::LeftBrace => Some("{"),
            TokenKind::RightBrace => Some("}"),
            TokenKind::LeftSquare => Some("["),
            TokenKind::RightSquare => Some("]"),
            TokenKind::Comma => Some(","),
            TokenKind::Colon => Some(":"),
            TokenKind::Semicolon => Some(";"),
            TokenKind::Period => Some("."),
            TokenKind::Equal => Some("="),
            TokenKind::Arrow => Some("->"),
            TokenKind::ExclamationMark => Some("!"),
            TokenKind::QuestionMark => Some("?"),
            TokenKind::EndOfFile => Some(""),
            TokenKind::Identifier
            | TokenKind::Keyword
            | TokenKind::Attribute
            | TokenKind::PoundDirective
            | TokenKind::Number
            | TokenKind::StringLiteral
            | TokenKind::RegexLiteral
            | TokenKind::Operator
            | TokenKind::Unknown => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct TokenData {
    kind: TokenKind,
    text: String,
    leading: Trivia,
    trailing: Trivia,
}

/// A leaf of the tree: literal text plus its leading and trailing trivia.
///
/// Cloning a token is cheap; the data lives behind an [`Arc`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(Arc<TokenData>);

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self::with_trivia(kind, text, Trivia::zero(), Trivia::zero())
    }

    pub fn with_trivia(
        kind: TokenKind,
        text: impl Into<String>,
        leading: Trivia,
        trailing: Trivia,
    ) -> Self {
        Token(Arc::new(TokenData {
            kind,
            text: text.into(),
            leading,
            trailing,
        }))
    }

    /// A punctuation token spelled by its kind.
    pub fn punctuation(kind: TokenKind) -> Self {
        Self::new(kind, kind.fixed_text().unwrap_or_default())
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Identifier, text)
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Keyword, text)
    }

    pub fn kind(&self) -> TokenKind {
        self.0.kind
    }

    pub fn text(&self) -> &str {
        &self.0.text
    }

    pub fn leading_trivia(&self) -> &Trivia {
        &self.0.leading
    }

    pub fn trailing_trivia(&self) -> &Trivia {
        &self.0.trailing
    }

    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self::with_trivia(
            self.kind(),
            text,
            self.0.leading.clone(),
            self.0.trailing.clone(),
        )
    }

    pub fn with_leading_trivia(&self, leading: Trivia) -> Self {
        Self::with_trivia(self.kind(), self.text(), leading, self.0.trailing.clone())
    }

    pub fn with_trailing_trivia(&self, trailing: Trivia) -> Self {
        Self::with_trivia(self.kind(), self.text(), self.0.leading.clone(), trailing)
    }

    /// Identifier or keyword spelled `word`.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self.kind(), TokenKind::Identifier | TokenKind::Keyword) && self.text() == word
    }

    /// Bytes this token renders to, trivia included.
    pub fn full_len(&self) -> usize {
        self.0.leading.len() + self.0.text.len() + self.0.trailing.len()
    }

    pub fn ptr_eq(&self, other: &Token) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A node of the syntax tree.
///
/// The set of kinds is closed; traversals match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Class(Arc<ClassDecl>),
    Function(Arc<FunctionDecl>),
    Variable(Arc<VariableDecl>),
    InheritanceClause(Arc<InheritanceClause>),
    InheritedType(Arc<InheritedType>),
    Statement(Arc<Statement>),
    Expression(Arc<Expression>),
    Token(Token),
    CodeBlock(Arc<CodeBlock>),
    MemberList(Arc<MemberList>),
}

/// The root of a parsed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub items: Vec<Node>,
    /// Zero-width token whose leading trivia holds the end of the file.
    pub eof: Token,
}

/// `class Name<T>: Base, Proto where ... { members }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    /// Attributes and modifiers, in source order (`@MainActor final`).
    pub modifiers: Vec<Node>,
    pub class_keyword: Token,
    pub name: Token,
    pub generic_clause: Vec<Node>,
    pub inheritance: Option<Arc<InheritanceClause>>,
    pub where_clause: Vec<Node>,
    pub members: Arc<MemberList>,
}

/// `: A, B, C`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritanceClause {
    pub colon: Token,
    pub entries: Vec<Arc<InheritedType>>,
}

/// One entry of an inheritance clause with its separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritedType {
    pub type_name: Vec<Node>,
    pub trailing_comma: Option<Token>,
}

/// The braced body of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberList {
    pub left_brace: Token,
    pub members: Vec<Node>,
    pub right_brace: Token,
}

/// `func name<T>(params) async throws -> Out where ... { body }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub modifiers: Vec<Node>,
    pub func_keyword: Token,
    pub name: Token,
    pub signature: FunctionSignature,
    pub body: Option<Arc<CodeBlock>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub generic_clause: Vec<Node>,
    /// The parenthesized parameter list.
    pub parameters: Arc<Expression>,
    /// `async`, `throws`, `rethrows`, typed-throws groups.
    pub effects: Vec<Node>,
    /// Return clause and generic where clause.
    pub output: Vec<Node>,
}

/// `var a: T = x, b = y` / `let c: U`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDecl {
    pub modifiers: Vec<Node>,
    /// `var` or `let`.
    pub keyword: Token,
    pub bindings: Vec<PatternBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternBinding {
    pub pattern: Vec<Node>,
    pub type_annotation: Option<TypeAnnotation>,
    /// Initializer and/or accessor block.
    pub tail: Vec<Node>,
    pub trailing_comma: Option<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub colon: Token,
    pub ty: Vec<Node>,
}

/// Any item that is not one of the typed declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub elements: Vec<Node>,
}

/// A parenthesized or bracketed group; the delimiters are the first and
/// last elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub elements: Vec<Node>,
}

/// `{ items }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub left_brace: Token,
    pub items: Vec<Node>,
    pub right_brace: Token,
}

impl Node {
    /// Ordered children, tokens included. Concatenating the children's text
    /// reproduces the node's text.
    pub fn children(&self) -> Vec<Node> {
        match self {
            Node::Class(class) => {
                let mut out = class.modifiers.clone();
                out.push(Node::Token(class.class_keyword.clone()));
                out.push(Node::Token(class.name.clone()));
                out.extend(class.generic_clause.iter().cloned());
                if let Some(clause) = &class.inheritance {
                    out.push(Node::InheritanceClause(clause.clone()));
                }
                out.extend(class.where_clause.iter().cloned());
                out.push(Node::MemberList(class.members.clone()));
                out
            }
            Node::Function(function) => {
                let mut out = function.modifiers.clone();
                out.push(Node::Token(function.func_keyword.clone()));
                out.push(Node::Token(function.name.clone()));
                out.extend(function.signature.generic_clause.iter().cloned());
                out.push(Node::Expression(function.signature.parameters.clone()));
                out.extend(function.signature.effects.iter().cloned());
                out.extend(function.signature.output.iter().cloned());
                if let Some(body) = &function.body {
                    out.push(Node::CodeBlock(body.clone()));
                }
                out
            }
            Node::Variable(variable) => {
                let mut out = variable.modifiers.clone();
                out.push(Node::Token(variable.keyword.clone()));
                for binding in &variable.bindings {
                    out.extend(binding.pattern.iter().cloned());
                    if let Some(annotation) = &binding.type_annotation {
                        out.push(Node::Token(annotation.colon.clone()));
                        out.extend(annotation.ty.iter().cloned());
                    }
                    out.extend(binding.tail.iter().cloned());
                    if let Some(comma) = &binding.trailing_comma {
                        out.push(Node::Token(comma.clone()));
                    }
                }
                out
            }
            Node::InheritanceClause(clause) => {
                let mut out = vec![Node::Token(clause.colon.clone())];
                out.extend(clause.entries.iter().cloned().map(Node::InheritedType));
                out
            }
            Node::InheritedType(entry) => {
                let mut out = entry.type_name.clone();
                if let Some(comma) = &entry.trailing_comma {
                    out.push(Node::Token(comma.clone()));
                }
                out
            }
            Node::Statement(statement) => statement.elements.clone(),
            Node::Expression(expression) => expression.elements.clone(),
            Node::Token(_) => Vec::new(),
            Node::CodeBlock(block) => {
                let mut out = vec![Node::Token(block.left_brace.clone())];
                out.extend(block.items.iter().cloned());
                out.push(Node::Token(block.right_brace.clone()));
                out
            }
            Node::MemberList(list) => {
                let mut out = vec![Node::Token(list.left_brace.clone())];
                out.extend(list.members.iter().cloned());
                out.push(Node::Token(list.right_brace.clone()));
                out
            }
        }
    }

    /// Calls `f` on every token below this node, depth-first.
    pub fn for_each_token(&self, f: &mut dyn FnMut(&Token)) {
        match self {
            Node::Token(token) => f(token),
            other => {
                for child in other.children() {
                    child.for_each_token(f);
                }
            }
        }
    }

    /// The first token below this node, if any.
    pub fn first_token(&self) -> Option<Token> {
        match self {
            Node::Token(token) => Some(token.clone()),
            other => other.children().iter().find_map(Node::first_token),
        }
    }

    /// The last token below this node, if any.
    pub fn last_token(&self) -> Option<Token> {
        match self {
            Node::Token(token) => Some(token.clone()),
            other => other.children().iter().rev().find_map(Node::last_token),
        }
    }

    /// Rebuilds this node with `f` applied to each node-valued child.
    ///
    /// Token fields are leaves and are carried over as they are. When `f`
    /// returns every child unchanged (pointer-equal) the original node is
    /// returned, so untouched subtrees stay shared.
    pub fn map_children(&self, f: &mut dyn FnMut(&Node) -> Node) -> Node {
        let mut mapper = ChildMapper { f, changed: false };
        let rebuilt = match self {
            Node::Class(class) => Node::Class(Arc::new(ClassDecl {
                modifiers: mapper.nodes(&class.modifiers),
                class_keyword: class.class_keyword.clone(),
                name: class.name.clone(),
                generic_clause: mapper.nodes(&class.generic_clause),
                inheritance: class.inheritance.as_ref().map(|c| mapper.inheritance(c)),
                where_clause: mapper.nodes(&class.where_clause),
                members: mapper.member_list(&class.members),
            })),
            Node::Function(function) => Node::Function(Arc::new(FunctionDecl {
                modifiers: mapper.nodes(&function.modifiers),
                func_keyword: function.func_keyword.clone(),
                name: function.name.clone(),
                signature: FunctionSignature {
                    generic_clause: mapper.nodes(&function.signature.generic_clause),
                    parameters: mapper.expression(&function.signature.parameters),
                    effects: mapper.nodes(&function.signature.effects),
                    output: mapper.nodes(&function.signature.output),
                },
                body: function.body.as_ref().map(|b| mapper.block(b)),
            })),
            Node::Variable(variable) => Node::Variable(Arc::new(VariableDecl {
                modifiers: mapper.nodes(&variable.modifiers),
                keyword: variable.keyword.clone(),
                bindings: variable
                    .bindings
                    .iter()
                    .map(|binding| PatternBinding {
                        pattern: mapper.nodes(&binding.pattern),
                        type_annotation: binding.type_annotation.as_ref().map(|a| {
                            TypeAnnotation {
                                colon: a.colon.clone(),
                                ty: mapper.nodes(&a.ty),
                            }
                        }),
                        tail: mapper.nodes(&binding.tail),
                        trailing_comma: binding.trailing_comma.clone(),
                    })
                    .collect(),
            })),
            Node::InheritanceClause(clause) => Node::InheritanceClause(Arc::new(InheritanceClause {
                colon: clause.colon.clone(),
                entries: clause.entries.iter().map(|e| mapper.inherited_type(e)).collect(),
            })),
            Node::InheritedType(entry) => Node::InheritedType(Arc::new(InheritedType {
                type_name: mapper.nodes(&entry.type_name),
                trailing_comma: entry.trailing_comma.clone(),
            })),
            Node::Statement(statement) => Node::Statement(Arc::new(Statement {
                elements: mapper.nodes(&statement.elements),
            })),
            Node::Expression(expression) => Node::Expression(Arc::new(Expression {
                elements: mapper.nodes(&expression.elements),
            })),
            Node::Token(_) => return self.clone(),
            Node::CodeBlock(block) => Node::CodeBlock(Arc::new(CodeBlock {
                left_brace: block.left_brace.clone(),
                items: mapper.nodes(&block.items),
                right_brace: block.right_brace.clone(),
            })),
            Node::MemberList(list) => Node::MemberList(Arc::new(MemberList {
                left_brace: list.left_brace.clone(),
                members: mapper.nodes(&list.members),
                right_brace: list.right_brace.clone(),
            })),
        };
        if mapper.changed {
            rebuilt
        } else {
            self.clone()
        }
    }

    /// Identity comparison: `true` when both nodes share the same allocation.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Class(a), Node::Class(b)) => Arc::ptr_eq(a, b),
            (Node::Function(a), Node::Function(b)) => Arc::ptr_eq(a, b),
            (Node::Variable(a), Node::Variable(b)) => Arc::ptr_eq(a, b),
            (Node::InheritanceClause(a), Node::InheritanceClause(b)) => Arc::ptr_eq(a, b),
            (Node::InheritedType(a), Node::InheritedType(b)) => Arc::ptr_eq(a, b),
            (Node::Statement(a), Node::Statement(b)) => Arc::ptr_eq(a, b),
            (Node::Expression(a), Node::Expression(b)) => Arc::ptr_eq(a, b),
            (Node::Token(a), Node::Token(b)) => a.ptr_eq(b),
            (Node::CodeBlock(a), Node::CodeBlock(b)) => Arc::ptr_eq(a, b),
            (Node::MemberList(a), Node::MemberList(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Node::Token(token) => Some(token),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<FunctionDecl>> {
        match self {
            Node::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Arc<VariableDecl>> {
        match self {
            Node::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    /// Indentation of the line this node starts on, when it starts a line.
    pub fn indentation(&self) -> Option<Trivia> {
        self.first_token()?.leading_trivia().indentation()
    }

    /// Rebuilds the node with `f` applied to its first token.
    pub fn map_first_token<F: FnOnce(&Token) -> Token>(&self, f: F) -> Node {
        match self {
            Node::Token(token) => Node::Token(f(token)),
            Node::Class(class) => {
                let mut class = ClassDecl::clone(class);
                match class.modifiers.first_mut() {
                    Some(first) => *first = first.map_first_token(f),
                    None => class.class_keyword = f(&class.class_keyword),
                }
                Node::Class(Arc::new(class))
            }
            Node::Function(function) => {
                let mut function = FunctionDecl::clone(function);
                match function.modifiers.first_mut() {
                    Some(first) => *first = first.map_first_token(f),
                    None => function.func_keyword = f(&function.func_keyword),
                }
                Node::Function(Arc::new(function))
            }
            Node::Variable(variable) => {
                let mut variable = VariableDecl::clone(variable);
                match variable.modifiers.first_mut() {
                    Some(first) => *first = first.map_first_token(f),
                    None => variable.keyword = f(&variable.keyword),
                }
                Node::Variable(Arc::new(variable))
            }
            Node::InheritanceClause(clause) => Node::InheritanceClause(Arc::new(InheritanceClause {
                colon: f(&clause.colon),
                entries: clause.entries.clone(),
            })),
            Node::InheritedType(entry) => Node::InheritedType(Arc::new(InheritedType {
                type_name: map_first_in(&entry.type_name, f),
                trailing_comma: entry.trailing_comma.clone(),
            })),
            Node::Statement(statement) => Node::Statement(Arc::new(Statement {
                elements: map_first_in(&statement.elements, f),
            })),
            Node::Expression(expression) => Node::Expression(Arc::new(Expression {
                elements: map_first_in(&expression.elements, f),
            })),
            Node::CodeBlock(block) => {
                Node::CodeBlock(Arc::new(block.with_left_brace(f(&block.left_brace))))
            }
            Node::MemberList(list) => Node::MemberList(Arc::new(MemberList {
                left_brace: f(&list.left_brace),
                ..MemberList::clone(list)
            })),
        }
    }

    /// Rebuilds the node with `f` applied to its last token.
    pub fn map_last_token<F: FnOnce(&Token) -> Token>(&self, f: F) -> Node {
        match self {
            Node::Token(token) => Node::Token(f(token)),
            Node::Class(class) => Node::Class(Arc::new(ClassDecl {
                members: Arc::new(class.members.with_right_brace(f(&class.members.right_brace))),
                ..ClassDecl::clone(class)
            })),
            Node::Function(function) => {
                let mut function = FunctionDecl::clone(function);
                let signature = &mut function.signature;
                if let Some(body) = &function.body {
                    function.body = Some(Arc::new(body.with_right_brace(f(&body.right_brace))));
                } else if !signature.output.is_empty() {
                    signature.output = map_last_in(&signature.output, f);
                } else if !signature.effects.is_empty() {
                    signature.effects = map_last_in(&signature.effects, f);
                } else if let Node::Expression(parameters) =
                    Node::Expression(signature.parameters.clone()).map_last_token(f)
                {
                    signature.parameters = parameters;
                }
                Node::Function(Arc::new(function))
            }
            Node::Variable(variable) => {
                let mut variable = VariableDecl::clone(variable);
                match variable.bindings.last_mut() {
                    Some(binding) => {
                        if let Some(comma) = &binding.trailing_comma {
                            binding.trailing_comma = Some(f(comma));
                        } else if !binding.tail.is_empty() {
                            binding.tail = map_last_in(&binding.tail, f);
                        } else if let Some(annotation) = binding
                            .type_annotation
                            .as_mut()
                            .filter(|a| !a.ty.is_empty())
                        {
                            annotation.ty = map_last_in(&annotation.ty, f);
                        } else {
                            binding.pattern = map_last_in(&binding.pattern, f);
                        }
                    }
                    None => variable.keyword = f(&variable.keyword),
                }
                Node::Variable(Arc::new(variable))
            }
            Node::InheritanceClause(clause) => {
                let mut clause = InheritanceClause::clone(clause);
                match clause.entries.last_mut() {
                    Some(entry) => {
                        if let Node::InheritedType(mapped) =
                            Node::InheritedType(entry.clone()).map_last_token(f)
                        {
                            *entry = mapped;
                        }
                    }
                    None => clause.colon = f(&clause.colon),
                }
                Node::InheritanceClause(Arc::new(clause))
            }
            Node::InheritedType(entry) => {
                let mut entry = InheritedType::clone(entry);
                match &entry.trailing_comma {
                    Some(comma) => entry.trailing_comma = Some(f(comma)),
                    None => entry.type_name = map_last_in(&entry.type_name, f),
                }
                Node::InheritedType(Arc::new(entry))
            }
            Node::Statement(statement) => Node::Statement(Arc::new(Statement {
                elements: map_last_in(&statement.elements, f),
            })),
            Node::Expression(expression) => Node::Expression(Arc::new(Expression {
                elements: map_last_in(&expression.elements, f),
            })),
            Node::CodeBlock(block) => {
                Node::CodeBlock(Arc::new(block.with_right_brace(f(&block.right_brace))))
            }
            Node::MemberList(list) => {
                Node::MemberList(Arc::new(list.with_right_brace(f(&list.right_brace))))
            }
        }
    }
}

fn map_first_in<F: FnOnce(&Token) -> Token>(nodes: &[Node], f: F) -> Vec<Node> {
    let mut nodes = nodes.to_vec();
    if let Some(first) = nodes.first_mut() {
        *first = first.map_first_token(f);
    }
    nodes
}

fn map_last_in<F: FnOnce(&Token) -> Token>(nodes: &[Node], f: F) -> Vec<Node> {
    let mut nodes = nodes.to_vec();
    if let Some(last) = nodes.last_mut() {
        *last = last.map_last_token(f);
    }
    nodes
}

/// Applies a child mapping function and records whether anything changed.
struct ChildMapper<'f> {
    f: &'f mut dyn FnMut(&Node) -> Node,
    changed: bool,
}

impl ChildMapper<'_> {
    fn node(&mut self, node: &Node) -> Node {
        let mapped = (self.f)(node);
        if !mapped.ptr_eq(node) {
            self.changed = true;
        }
        mapped
    }

    fn nodes(&mut self, nodes: &[Node]) -> Vec<Node> {
        nodes.iter().map(|n| self.node(n)).collect()
    }

    // Typed slots only accept a node of their own kind back; anything else
    // leaves the slot as it was.

    fn block(&mut self, block: &Arc<CodeBlock>) -> Arc<CodeBlock> {
        match self.node(&Node::CodeBlock(block.clone())) {
            Node::CodeBlock(mapped) => mapped,
            _ => block.clone(),
        }
    }

    fn member_list(&mut self, list: &Arc<MemberList>) -> Arc<MemberList> {
        match self.node(&Node::MemberList(list.clone())) {
            Node::MemberList(mapped) => mapped,
            _ => list.clone(),
        }
    }

    fn expression(&mut self, expression: &Arc<Expression>) -> Arc<Expression> {
        match self.node(&Node::Expression(expression.clone())) {
            Node::Expression(mapped) => mapped,
            _ => expression.clone(),
        }
    }

    fn inheritance(&mut self, clause: &Arc<InheritanceClause>) -> Arc<InheritanceClause> {
        match self.node(&Node::InheritanceClause(clause.clone())) {
            Node::InheritanceClause(mapped) => mapped,
            _ => clause.clone(),
        }
    }

    fn inherited_type(&mut self, entry: &Arc<InheritedType>) -> Arc<InheritedType> {
        match self.node(&Node::InheritedType(entry.clone())) {
            Node::InheritedType(mapped) => mapped,
            _ => entry.clone(),
        }
    }
}

impl SourceFile {
    pub fn with_items(&self, items: Vec<Node>) -> Self {
        Self {
            items,
            eof: self.eof.clone(),
        }
    }

    /// Rebuilds the file with `f` applied to each top-level item.
    pub fn map_items(&self, f: &mut dyn FnMut(&Node) -> Node) -> Self {
        self.with_items(self.items.iter().map(|item| f(item)).collect())
    }
}

/// Tokens of a modifier list, skipping attribute argument groups.
fn modifier_tokens(modifiers: &[Node]) -> impl Iterator<Item = &Token> {
    modifiers.iter().filter_map(Node::as_token)
}

impl ClassDecl {
    pub fn name(&self) -> &str {
        self.name.text()
    }

    /// Direct member functions with their index in the member list.
    pub fn functions(&self) -> impl Iterator<Item = (usize, &Arc<FunctionDecl>)> {
        self.members
            .members
            .iter()
            .enumerate()
            .filter_map(|(i, member)| member.as_function().map(|f| (i, f)))
    }

    /// Direct member variables.
    pub fn variables(&self) -> impl Iterator<Item = &Arc<VariableDecl>> {
        self.members.members.iter().filter_map(Node::as_variable)
    }

    pub fn with_inheritance(&self, inheritance: InheritanceClause) -> Self {
        Self {
            inheritance: Some(Arc::new(inheritance)),
            ..self.clone()
        }
    }

    pub fn with_members(&self, members: MemberList) -> Self {
        Self {
            members: Arc::new(members),
            ..self.clone()
        }
    }

    /// Indentation of the line holding the `class` declaration.
    pub fn indentation(&self) -> Option<Trivia> {
        let first = modifier_tokens(&self.modifiers)
            .next()
            .unwrap_or(&self.class_keyword);
        first.leading_trivia().indentation()
    }
}

impl InheritanceClause {
    pub fn replacing_entry(&self, index: usize, entry: InheritedType) -> Self {
        let mut entries = self.entries.clone();
        entries[index] = Arc::new(entry);
        Self {
            colon: self.colon.clone(),
            entries,
        }
    }
}

impl InheritedType {
    /// The name of a plain type reference (`Foo` or `Foo<T>`); `None` for
    /// member types, compositions and other shapes.
    pub fn simple_name(&self) -> Option<&str> {
        let mut elements = self.type_name.iter();
        let first = elements.next()?.as_token()?;
        if first.kind() != TokenKind::Identifier {
            return None;
        }
        match elements.next() {
            None => Some(first.text()),
            Some(Node::Token(next))
                if next.kind() == TokenKind::Operator && next.text().starts_with('<') =>
            {
                Some(first.text())
            }
            Some(_) => None,
        }
    }

    /// Replaces the text of the simple type name, keeping its trivia and the
    /// trailing comma exactly as they were.
    pub fn with_simple_name(&self, name: &str) -> Self {
        let mut type_name = self.type_name.clone();
        if let Some(Node::Token(first)) = type_name.first() {
            type_name[0] = Node::Token(first.with_text(name));
        }
        Self {
            type_name,
            trailing_comma: self.trailing_comma.clone(),
        }
    }
}

impl MemberList {
    pub fn with_members(&self, members: Vec<Node>) -> Self {
        Self {
            members,
            ..self.clone()
        }
    }

    pub fn appending(&self, member: Node) -> Self {
        let mut members = self.members.clone();
        members.push(member);
        self.with_members(members)
    }

    pub fn with_right_brace(&self, right_brace: Token) -> Self {
        Self {
            right_brace,
            ..self.clone()
        }
    }
}

impl FunctionDecl {
    pub fn name(&self) -> &str {
        self.name.text()
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        modifier_tokens(&self.modifiers).any(|t| t.is_word(modifier))
    }

    /// `static func` / `class func`.
    pub fn is_type_scoped(&self) -> bool {
        self.has_modifier("static") || self.has_modifier("class")
    }

    /// `throws`, `throws(E)` or `rethrows` in the effects clause.
    pub fn is_throwing(&self) -> bool {
        self.signature
            .effects
            .iter()
            .filter_map(Node::as_token)
            .any(|t| t.is_word("throws") || t.is_word("rethrows"))
    }

    pub fn with_body(&self, body: CodeBlock) -> Self {
        Self {
            body: Some(Arc::new(body)),
            ..self.clone()
        }
    }

    /// Indentation of the line holding the declaration.
    pub fn indentation(&self) -> Option<Trivia> {
        let first = modifier_tokens(&self.modifiers)
            .next()
            .unwrap_or(&self.func_keyword);
        first.leading_trivia().indentation()
    }
}

impl VariableDecl {
    pub fn is_mutable(&self) -> bool {
        self.keyword.is_word("var")
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        modifier_tokens(&self.modifiers).any(|t| t.is_word(modifier))
    }

    pub fn is_type_scoped(&self) -> bool {
        self.has_modifier("static") || self.has_modifier("class")
    }

    /// Only the first binding of a declaration is inspected by the rewriter.
    pub fn first_binding(&self) -> Option<&PatternBinding> {
        self.bindings.first()
    }
}

impl PatternBinding {
    /// Text of the first token of the pattern.
    pub fn name(&self) -> Option<&str> {
        match self.pattern.first()? {
            Node::Token(token) if token.kind() == TokenKind::Identifier => Some(token.text()),
            _ => None,
        }
    }

    /// The type annotation carries a forced-unwrap marker (`T!`).
    pub fn is_implicitly_unwrapped(&self) -> bool {
        let Some(annotation) = &self.type_annotation else {
            return false;
        };
        let mut found = false;
        for node in &annotation.ty {
            node.for_each_token(&mut |token| {
                if matches!(token.kind(), TokenKind::ExclamationMark | TokenKind::Operator)
                    && token.text().contains('!')
                {
                    found = true;
                }
            });
        }
        found
    }

    /// Has an accessor block other than `willSet`/`didSet` observers.
    pub fn is_computed(&self) -> bool {
        let Some(Node::CodeBlock(block)) = self.tail.first() else {
            return false;
        };
        let observer = block
            .items
            .first()
            .and_then(Node::first_token)
            .is_some_and(|t| t.is_word("willSet") || t.is_word("didSet"));
        !observer
    }
}

impl Expression {
    /// The opening delimiter of the group.
    pub fn open(&self) -> Option<&Token> {
        self.elements.first().and_then(Node::as_token)
    }
}

impl CodeBlock {
    pub fn empty() -> Self {
        Self {
            left_brace: Token::punctuation(TokenKind::LeftBrace),
            items: Vec::new(),
            right_brace: Token::punctuation(TokenKind::RightBrace),
        }
    }

    pub fn with_items(&self, items: Vec<Node>) -> Self {
        Self {
            items,
            ..self.clone()
        }
    }

    pub fn prepending(&self, item: Node) -> Self {
        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.push(item);
        items.extend(self.items.iter().cloned());
        self.with_items(items)
    }

    pub fn appending(&self, item: Node) -> Self {
        let mut items = self.items.clone();
        items.push(item);
        self.with_items(items)
    }

    pub fn with_left_brace(&self, left_brace: Token) -> Self {
        Self {
            left_brace,
            ..self.clone()
        }
    }

    pub fn with_right_brace(&self, right_brace: Token) -> Self {
        Self {
            right_brace,
            ..self.clone()
        }
    }
}
