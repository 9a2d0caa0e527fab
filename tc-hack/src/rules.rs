//! The structural rewrites applied to a qualifying class.
//!
//! Each rule takes a class declaration and returns a new one; nothing is
//! edited in place. Rules only touch the tokens they own: renamed tokens
//! keep their trivia, and inserted nodes carry trivia chosen to match the
//! surrounding indentation and line endings.

use std::sync::Arc;

use crate::config::RewriteConfig;
use crate::matchers::{
    eligible_fields, has_cleanup_method, has_super_call, inherited_entry, is_target_class,
    nil_assigned_fields,
};
use crate::syntax::{
    ClassDecl, CodeBlock, Expression, FunctionDecl, FunctionSignature, InheritanceClause,
    MemberList, Node, SourceFile, Statement, Token, TokenKind,
};
use crate::trivia::{LineEnding, Trivia, TriviaPiece};

const INDENT_WIDTH: usize = 4;

/// One level deeper than `base`: a tab for tab-indented code, otherwise
/// four spaces.
fn indented(base: &Trivia) -> Trivia {
    let tabs_only = !base.is_empty()
        && base
            .pieces()
            .iter()
            .all(|p| matches!(p, TriviaPiece::Tabs(_)));
    if tabs_only {
        base.appending(TriviaPiece::Tabs(1))
    } else {
        base.appending(TriviaPiece::Spaces(INDENT_WIDTH))
    }
}

/// Drops trailing spaces and tabs; comments are kept.
fn without_trailing_whitespace(trivia: &Trivia) -> Trivia {
    let pieces = trivia.pieces();
    let keep = pieces
        .iter()
        .rposition(|p| !p.is_indentation())
        .map_or(0, |i| i + 1);
    pieces[..keep].iter().cloned().collect()
}

fn trimmed_trailing(token: &Token) -> Token {
    token.with_trailing_trivia(without_trailing_whitespace(token.trailing_trivia()))
}

fn starts_line(node: &Node) -> bool {
    node.first_token()
        .is_some_and(|t| t.leading_trivia().contains_newline())
}

fn class_indentation(class: &ClassDecl) -> Trivia {
    class.indentation().unwrap_or_default()
}

/// Indentation for a new member: that of the last member, otherwise one
/// level deeper than the class.
fn member_indentation(class: &ClassDecl) -> Trivia {
    class
        .members
        .members
        .iter()
        .rev()
        .find_map(Node::indentation)
        .unwrap_or_else(|| indented(&class_indentation(class)))
}

/// Line terminator of the first line break inside `class`, LF when the
/// class sits on a single line.
fn line_ending(class: &ClassDecl) -> LineEnding {
    let mut ending = None;
    Node::Class(Arc::new(class.clone())).for_each_token(&mut |token| {
        if ending.is_none() {
            ending = token.leading_trivia().line_ending();
        }
    });
    ending.unwrap_or_default()
}

/// Line endings and member indentation of the class being rewritten.
struct Layout {
    ending: LineEnding,
    member_indent: Trivia,
}

impl Layout {
    fn of(class: &ClassDecl) -> Self {
        Self {
            ending: line_ending(class),
            member_indent: member_indentation(class),
        }
    }

    /// `count` line breaks followed by `indent`.
    fn line_break(&self, count: usize, indent: &Trivia) -> Trivia {
        Trivia::line_breaks(count, self.ending).concat(indent)
    }

    /// A function sharing its line with the class brace or another member
    /// is treated as if it sat at the member indentation.
    fn function_indentation(&self, function: &FunctionDecl) -> Trivia {
        function
            .indentation()
            .unwrap_or_else(|| self.member_indent.clone())
    }

    /// Indentation of statements in `body`: that of the first statement on
    /// its own line, otherwise one level deeper than the function.
    fn statement_indentation(&self, function: &FunctionDecl, body: &CodeBlock) -> Trivia {
        body.items
            .first()
            .and_then(Node::indentation)
            .unwrap_or_else(|| indented(&self.function_indentation(function)))
    }
}

/// Rule 1: renames the first inheritance entry naming the legacy base to the
/// target base. `None` when there is no such entry.
pub fn substitute_base_class(class: &ClassDecl, config: &RewriteConfig) -> Option<ClassDecl> {
    let index = inherited_entry(class, &config.legacy_base)?;
    let clause = class.inheritance.as_ref()?;
    let entry = clause.entries[index].with_simple_name(&config.target_base);
    Some(class.with_inheritance(clause.replacing_entry(index, entry)))
}

/// Drops the spaces and tabs ending the line of the last member, or of the
/// opening brace when there are no members.
fn trimmed_member_list(list: &MemberList) -> MemberList {
    let mut list = list.clone();
    match list.members.last_mut() {
        Some(last) => *last = last.map_last_token(trimmed_trailing),
        None => list.left_brace = trimmed_trailing(&list.left_brace),
    }
    list
}

/// Rule 2: appends an empty `override func <cleanup>()` when the class has
/// no cleanup method. `None` when one already exists.
pub fn ensure_cleanup_method(class: &ClassDecl, config: &RewriteConfig) -> Option<ClassDecl> {
    if has_cleanup_method(class, config) {
        return None;
    }
    let layout = Layout::of(class);
    let indent = &layout.member_indent;

    let function = FunctionDecl {
        modifiers: vec![Node::Token(Token::with_trivia(
            TokenKind::Identifier,
            "override",
            layout.line_break(2, indent),
            Trivia::spaces(1),
        ))],
        func_keyword: Token::keyword("func").with_trailing_trivia(Trivia::spaces(1)),
        name: Token::identifier(config.cleanup.as_str()),
        signature: FunctionSignature {
            generic_clause: Vec::new(),
            parameters: Arc::new(Expression {
                elements: vec![
                    Node::Token(Token::punctuation(TokenKind::LeftParen)),
                    Node::Token(
                        Token::punctuation(TokenKind::RightParen)
                            .with_trailing_trivia(Trivia::spaces(1)),
                    ),
                ],
            }),
            effects: Vec::new(),
            output: Vec::new(),
        },
        body: Some(Arc::new(
            CodeBlock::empty().with_right_brace(
                Token::punctuation(TokenKind::RightBrace)
                    .with_leading_trivia(layout.line_break(1, indent)),
            ),
        )),
    };

    let mut members =
        trimmed_member_list(&class.members).appending(Node::Function(Arc::new(function)));
    // `class A: XCTestCase {}` gets its closing brace on a line of its own.
    if !members.right_brace.leading_trivia().contains_newline() {
        let brace = &members.right_brace;
        members = members.with_right_brace(
            brace.with_leading_trivia(layout.line_break(1, &class_indentation(class))),
        );
    }
    Some(class.with_members(members))
}

/// Gives a bodiless function an empty body and puts the first statement and
/// the closing brace of its body on lines of their own, so statements can be
/// added on lines of their own.
fn with_multiline_body(layout: &Layout, function: &FunctionDecl) -> FunctionDecl {
    let indent = layout.function_indentation(function);
    let Some(body) = &function.body else {
        let after_signature = signature_trailing_trivia(function);
        let brace_leading = if after_signature.contains_comment() {
            layout.line_break(1, &indent)
        } else if after_signature.is_empty() {
            Trivia::spaces(1)
        } else {
            Trivia::zero()
        };
        let body = CodeBlock::empty()
            .with_left_brace(
                Token::punctuation(TokenKind::LeftBrace).with_leading_trivia(brace_leading),
            )
            .with_right_brace(
                Token::punctuation(TokenKind::RightBrace)
                    .with_leading_trivia(layout.line_break(1, &indent)),
            );
        return function.with_body(body);
    };

    let first_on_own_line = body.items.first().map_or(true, starts_line);
    let brace_on_own_line = body.right_brace.leading_trivia().contains_newline();
    if first_on_own_line && brace_on_own_line {
        return function.clone();
    }

    let statement_indent = layout.statement_indentation(function, body);
    let mut block = CodeBlock::clone(body);
    if !first_on_own_line || block.items.is_empty() {
        block.left_brace = trimmed_trailing(&block.left_brace);
    }
    if let Some(first) = block.items.first_mut().filter(|_| !first_on_own_line) {
        *first = first.map_first_token(|t| {
            t.with_leading_trivia(layout.line_break(1, &statement_indent))
        });
    }
    if !brace_on_own_line {
        if let Some(last) = block.items.last_mut() {
            *last = last.map_last_token(trimmed_trailing);
        }
        block.right_brace = block
            .right_brace
            .with_leading_trivia(layout.line_break(1, &indent));
    }
    function.with_body(block)
}

/// Trailing trivia after the last token of a function's signature.
fn signature_trailing_trivia(function: &FunctionDecl) -> Trivia {
    Node::Function(Arc::new(function.clone()))
        .last_token()
        .map(|t| t.trailing_trivia().clone())
        .unwrap_or_default()
}

/// `super.<name>()`, or `try super.<name>()` for throwing functions, led by
/// `leading` trivia.
fn super_call(name: &str, throwing: bool, leading: Trivia) -> Node {
    let mut elements = Vec::new();
    let mut receiver = Token::keyword("super");
    if throwing {
        elements.push(Node::Token(Token::with_trivia(
            TokenKind::Keyword,
            "try",
            leading,
            Trivia::spaces(1),
        )));
    } else {
        receiver = receiver.with_leading_trivia(leading);
    }
    elements.push(Node::Token(receiver));
    elements.push(Node::Token(Token::punctuation(TokenKind::Period)));
    elements.push(Node::Token(Token::identifier(name)));
    elements.push(Node::Expression(Arc::new(Expression {
        elements: vec![
            Node::Token(Token::punctuation(TokenKind::LeftParen)),
            Node::Token(Token::punctuation(TokenKind::RightParen)),
        ],
    })));
    Node::Statement(Arc::new(Statement { elements }))
}

/// `<field> = nil`, led by `leading` trivia.
fn nil_assignment(field: &str, leading: Trivia) -> Node {
    Node::Statement(Arc::new(Statement {
        elements: vec![
            Node::Token(Token::with_trivia(
                TokenKind::Identifier,
                field,
                leading,
                Trivia::spaces(1),
            )),
            Node::Token(
                Token::punctuation(TokenKind::Equal).with_trailing_trivia(Trivia::spaces(1)),
            ),
            Node::Token(Token::keyword("nil")),
        ],
    }))
}

/// Rule 3: makes every lifecycle method start with a call to its `super`
/// implementation. Returns the names of the methods that were changed.
pub fn inject_super_calls(
    class: &ClassDecl,
    config: &RewriteConfig,
) -> (ClassDecl, Vec<String>) {
    let lifecycle = config.lifecycle_methods();
    let layout = Layout::of(class);
    let mut changed = Vec::new();
    let mut members = class.members.members.clone();

    for (index, function) in class.functions() {
        let name = function.name();
        if !lifecycle.contains(&name) || has_super_call(function, name) {
            continue;
        }
        let function = with_multiline_body(&layout, function);
        let Some(body) = &function.body else {
            continue;
        };
        let indent = layout.statement_indentation(&function, body);
        let call = super_call(name, function.is_throwing(), layout.line_break(1, &indent));
        members[index] = Node::Function(Arc::new(function.with_body(body.prepending(call))));
        changed.push(name.to_string());
    }

    if changed.is_empty() {
        return (class.clone(), changed);
    }
    (class.with_members(class.members.with_members(members)), changed)
}

/// Rule 5: resets every eligible field to `nil` at the end of the first
/// instance cleanup method, skipping fields it already resets. Returns the
/// names of the fields that were added.
pub fn inject_nil_assignments(
    class: &ClassDecl,
    config: &RewriteConfig,
) -> (ClassDecl, Vec<String>) {
    let fields = eligible_fields(class);
    if fields.is_empty() {
        return (class.clone(), Vec::new());
    }
    let Some((index, function)) = class
        .functions()
        .find(|(_, f)| config.is_cleanup(f.name()) && !f.is_type_scoped())
    else {
        return (class.clone(), Vec::new());
    };

    let layout = Layout::of(class);
    let function = with_multiline_body(&layout, function);
    let Some(body) = &function.body else {
        return (class.clone(), Vec::new());
    };
    let assigned = nil_assigned_fields(body);
    let missing: Vec<String> = fields
        .into_iter()
        .filter(|field| !assigned.contains(field))
        .collect();
    if missing.is_empty() {
        return (class.clone(), missing);
    }

    let indent = layout.statement_indentation(&function, body);
    let mut block = CodeBlock::clone(body);
    for field in &missing {
        block = block.appending(nil_assignment(field, layout.line_break(1, &indent)));
    }
    let mut members = class.members.members.clone();
    members[index] = Node::Function(Arc::new(function.with_body(block)));
    (class.with_members(class.members.with_members(members)), missing)
}

/// Rule 6: renames every remaining legacy base in the inheritance clause of
/// any class in the file, except the target class's own declaration.
/// Returns the names of the classes that were changed.
pub fn normalize_inheritance(
    file: &SourceFile,
    config: &RewriteConfig,
) -> (SourceFile, Vec<String>) {
    let mut renamed = Vec::new();
    let file = file.map_items(&mut |item| normalize_node(item, config, &mut renamed));
    (file, renamed)
}

fn normalize_node(node: &Node, config: &RewriteConfig, renamed: &mut Vec<String>) -> Node {
    let node = match node {
        Node::Class(class) if !is_target_class(class, config) => {
            match rename_legacy_entries(class, config) {
                Some(class) => {
                    renamed.push(class.name().to_string());
                    Node::Class(Arc::new(class))
                }
                None => node.clone(),
            }
        }
        _ => node.clone(),
    };
    node.map_children(&mut |child| normalize_node(child, config, renamed))
}

fn rename_legacy_entries(class: &ClassDecl, config: &RewriteConfig) -> Option<ClassDecl> {
    let mut clause = InheritanceClause::clone(class.inheritance.as_ref()?);
    let mut changed = false;
    for entry in clause.entries.iter_mut() {
        if entry.simple_name() == Some(config.legacy_base.as_str()) {
            *entry = Arc::new(entry.with_simple_name(&config.target_base));
            changed = true;
        }
    }
    changed.then(|| class.with_inheritance(clause))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::render::{render, render_node};

    fn class(source: &str) -> ClassDecl {
        let file = parse(source).unwrap();
        match &file.items[0] {
            Node::Class(class) => ClassDecl::clone(class),
            other => panic!("expected a class, got {other:?}"),
        }
    }

    fn text(class: ClassDecl) -> String {
        render_node(&Node::Class(Arc::new(class)))
    }

    #[test]
    fn test_substitute_base_class_keeps_trivia() {
        let config = RewriteConfig::default();
        let source = "class A:  XCTestCase /* base */, P {}";
        let rewritten = substitute_base_class(&class(source), &config).unwrap();
        assert_eq!(text(rewritten), "class A:  DDTestCase /* base */, P {}");
    }

    #[test]
    fn test_substitute_only_first_legacy_entry() {
        let config = RewriteConfig::default();
        let rewritten =
            substitute_base_class(&class("class A: XCTestCase, XCTestCase {}"), &config).unwrap();
        assert_eq!(text(rewritten), "class A: DDTestCase, XCTestCase {}");
        assert!(substitute_base_class(&class("class A: DDTestCase {}"), &config).is_none());
    }

    #[test]
    fn test_ensure_cleanup_method_uses_member_indentation() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n  var x: Int!\n}";
        let rewritten = ensure_cleanup_method(&class(source), &config).unwrap();
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\n  var x: Int!\n\n  override func tearDown() {\n  }\n}"
        );
    }

    #[test]
    fn test_ensure_cleanup_method_in_empty_class() {
        let config = RewriteConfig::default();
        let rewritten = ensure_cleanup_method(&class("class A: DDTestCase {}"), &config).unwrap();
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\n\n    override func tearDown() {\n    }\n}"
        );
    }

    #[test]
    fn test_ensure_cleanup_method_in_one_line_class() {
        let config = RewriteConfig::default();
        let rewritten =
            ensure_cleanup_method(&class("class A: DDTestCase { var x: Int! }"), &config).unwrap();
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase { var x: Int!\n\n    override func tearDown() {\n    }\n}"
        );
    }

    #[test]
    fn test_ensure_cleanup_method_keeps_crlf() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\r\n    var x: Int!\r\n}";
        let rewritten = ensure_cleanup_method(&class(source), &config).unwrap();
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\r\n    var x: Int!\r\n\r\n    override func tearDown() {\r\n    }\r\n}"
        );
    }

    #[test]
    fn test_ensure_cleanup_method_respects_existing() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n    override func tearDownWithError() throws {}\n}";
        assert!(ensure_cleanup_method(&class(source), &config).is_none());
    }

    #[test]
    fn test_inject_super_call_at_first_statement_indentation() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n    override func setUp() {\n      x = 1\n    }\n}";
        let (rewritten, changed) = inject_super_calls(&class(source), &config);
        assert_eq!(changed, vec!["setUp"]);
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\n    override func setUp() {\n      super.setUp()\n      x = 1\n    }\n}"
        );
    }

    #[test]
    fn test_inject_try_super_call_for_throwing_method() {
        let config = RewriteConfig::default();
        let source =
            "class A: DDTestCase {\n    override func setUpWithError() throws {\n    }\n}";
        let (rewritten, _) = inject_super_calls(&class(source), &config);
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\n    override func setUpWithError() throws {\n        try super.setUpWithError()\n    }\n}"
        );
    }

    #[test]
    fn test_inject_super_call_into_single_line_body() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n    override func setUp() { x = 1 }\n    override func tearDown() {}\n}";
        let (rewritten, changed) = inject_super_calls(&class(source), &config);
        assert_eq!(changed, vec!["setUp", "tearDown"]);
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\n    override func setUp() {\n        super.setUp()\n        x = 1\n    }\n    override func tearDown() {\n        super.tearDown()\n    }\n}"
        );
    }

    #[test]
    fn test_inject_super_call_before_statement_sharing_brace_line() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n    override func setUp() { x = 1\n    }\n}";
        let (rewritten, changed) = inject_super_calls(&class(source), &config);
        assert_eq!(changed, vec!["setUp"]);
        assert_eq!(
            text(rewritten.clone()),
            "class A: DDTestCase {\n    override func setUp() {\n        super.setUp()\n        x = 1\n    }\n}"
        );

        let (_, changed) = inject_super_calls(&rewritten, &config);
        assert!(changed.is_empty());
    }

    #[test]
    fn test_inject_super_call_into_one_line_class() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase { override func setUp() {} }";
        let (rewritten, _) = inject_super_calls(&class(source), &config);
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase { override func setUp() {\n        super.setUp()\n    } }"
        );
    }

    #[test]
    fn test_inject_super_call_into_bodiless_function() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n\toverride func setUp()\n}";
        let (rewritten, _) = inject_super_calls(&class(source), &config);
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\n\toverride func setUp() {\n\t\tsuper.setUp()\n\t}\n}"
        );
    }

    #[test]
    fn test_super_call_injection_is_idempotent() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n    override func setUp() {\n        try? super.setUp()\n    }\n}";
        let (rewritten, changed) = inject_super_calls(&class(source), &config);
        assert!(changed.is_empty());
        assert_eq!(text(rewritten), source);
    }

    #[test]
    fn test_inject_nil_assignments_in_declaration_order() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n    var b: Int!\n    var a: Int!\n    override func tearDown() {\n        super.tearDown()\n        self.a = nil\n    }\n}";
        let (rewritten, added) = inject_nil_assignments(&class(source), &config);
        assert_eq!(added, vec!["b"]);
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\n    var b: Int!\n    var a: Int!\n    override func tearDown() {\n        super.tearDown()\n        self.a = nil\n        b = nil\n    }\n}"
        );
    }

    #[test]
    fn test_inject_nil_assignments_skips_static_cleanup() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n    var a: Int!\n    override class func tearDown() {\n    }\n    override func tearDownWithError() throws {\n    }\n}";
        let (rewritten, added) = inject_nil_assignments(&class(source), &config);
        assert_eq!(added, vec!["a"]);
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\n    var a: Int!\n    override class func tearDown() {\n    }\n    override func tearDownWithError() throws {\n        a = nil\n    }\n}"
        );
    }

    #[test]
    fn test_inject_nil_assignments_keeps_crlf() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\r\n    var x: Int!\r\n    override func tearDown() {\r\n    }\r\n}";
        let (rewritten, _) = inject_nil_assignments(&class(source), &config);
        assert_eq!(
            text(rewritten),
            "class A: DDTestCase {\r\n    var x: Int!\r\n    override func tearDown() {\r\n        x = nil\r\n    }\r\n}"
        );
    }

    #[test]
    fn test_inject_nil_assignments_without_fields_is_noop() {
        let config = RewriteConfig::default();
        let source = "class A: DDTestCase {\n    var a: Int?\n    override func tearDown() {}\n}";
        let (rewritten, added) = inject_nil_assignments(&class(source), &config);
        assert!(added.is_empty());
        assert_eq!(text(rewritten), source);
    }

    #[test]
    fn test_normalize_inheritance_skips_target_class() {
        let config = RewriteConfig::default();
        let source = "open class DDTestCase: XCTestCase {}\nclass Helper: NSObject, XCTestCase {}\nenum E {\n    class Inner: XCTestCase {}\n}\n";
        let file = parse(source).unwrap();
        let (normalized, renamed) = normalize_inheritance(&file, &config);
        assert_eq!(renamed, vec!["Helper", "Inner"]);
        assert_eq!(
            render(&normalized),
            "open class DDTestCase: XCTestCase {}\nclass Helper: NSObject, DDTestCase {}\nenum E {\n    class Inner: DDTestCase {}\n}\n"
        );
    }
}
