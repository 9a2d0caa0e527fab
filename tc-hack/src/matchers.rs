//! Pure queries over the syntax tree. None of these allocate new nodes.

use std::collections::HashSet;

use crate::config::RewriteConfig;
use crate::syntax::{ClassDecl, CodeBlock, FunctionDecl, Node, Token, TokenKind};

/// The class is the target base class itself.
pub fn is_target_class(class: &ClassDecl, config: &RewriteConfig) -> bool {
    class.name() == config.target_base
}

/// Index of the first inheritance entry whose simple type name is `name`.
pub fn inherited_entry(class: &ClassDecl, name: &str) -> Option<usize> {
    class
        .inheritance
        .as_ref()?
        .entries
        .iter()
        .position(|entry| entry.simple_name() == Some(name))
}

pub fn inherits_from(class: &ClassDecl, name: &str) -> bool {
    inherited_entry(class, name).is_some()
}

/// Whether the rewrite pipeline applies to `class`: it is not the target
/// class, has a non-empty inheritance clause, and inherits from the target
/// base either already or once the legacy base is substituted.
pub fn qualifies(class: &ClassDecl, config: &RewriteConfig) -> bool {
    if is_target_class(class, config) {
        return false;
    }
    let has_entries = class
        .inheritance
        .as_ref()
        .is_some_and(|clause| !clause.entries.is_empty());
    has_entries
        && (inherits_from(class, &config.target_base) || inherits_from(class, &config.legacy_base))
}

/// Names of fields that must be reset in cleanup, in declaration order.
///
/// A field is eligible when it is a direct instance member declared with
/// `var`, its first binding has an implicitly-unwrapped-optional type
/// annotation, and it is stored (no accessor block other than observers).
pub fn eligible_fields(class: &ClassDecl) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for variable in class.variables() {
        if !variable.is_mutable() || variable.is_type_scoped() {
            continue;
        }
        let Some(binding) = variable.first_binding() else {
            continue;
        };
        if !binding.is_implicitly_unwrapped() || binding.is_computed() {
            continue;
        }
        if let Some(name) = binding.name() {
            if seen.insert(name.to_string()) {
                fields.push(name.to_string());
            }
        }
    }
    fields
}

/// Top-level tokens of a body item, with a leading `try`, `try?`, `try!`
/// and `await` removed.
fn without_effect_prefix(elements: &[Node]) -> &[Node] {
    let mut rest = elements;
    loop {
        match rest.first().and_then(Node::as_token) {
            Some(t) if t.is_word("try") => {
                rest = &rest[1..];
                let marker = rest.first().and_then(Node::as_token).is_some_and(|m| {
                    matches!(m.kind(), TokenKind::QuestionMark | TokenKind::ExclamationMark)
                });
                if marker {
                    rest = &rest[1..];
                }
            }
            Some(t) if t.is_word("await") => rest = &rest[1..],
            _ => return rest,
        }
    }
}

fn is_token(node: &Node, predicate: impl Fn(&Token) -> bool) -> bool {
    node.as_token().is_some_and(predicate)
}

/// Whether the body of `function` has a top-level `super.<name>(...)` call.
pub fn has_super_call(function: &FunctionDecl, name: &str) -> bool {
    let Some(body) = &function.body else {
        return false;
    };
    body.items.iter().any(|item| {
        let Node::Statement(statement) = item else {
            return false;
        };
        match without_effect_prefix(&statement.elements) {
            [receiver, dot, method, Node::Expression(arguments)] => {
                is_token(receiver, |t| t.is_word("super"))
                    && is_token(dot, |t| t.kind() == TokenKind::Period)
                    && is_token(method, |t| t.text() == name)
                    && arguments.open().map(Token::kind) == Some(TokenKind::LeftParen)
            }
            _ => false,
        }
    })
}

/// A direct member function is named cleanup or cleanup-with-error.
pub fn has_cleanup_method(class: &ClassDecl, config: &RewriteConfig) -> bool {
    class.functions().any(|(_, f)| config.is_cleanup(f.name()))
}

/// Names assigned `nil` by top-level statements of `block`, either as
/// `name = nil` or `self.name = nil`.
pub fn nil_assigned_fields(block: &CodeBlock) -> HashSet<String> {
    let is_nil = |node: &Node| is_token(node, |t| t.is_word("nil"));
    let is_equal = |node: &Node| is_token(node, |t| t.kind() == TokenKind::Equal);
    let identifier = |node: &Node| {
        node.as_token()
            .filter(|t| t.kind() == TokenKind::Identifier)
            .map(|t| t.text().to_string())
    };

    block
        .items
        .iter()
        .filter_map(|item| {
            let Node::Statement(statement) = item else {
                return None;
            };
            match statement.elements.as_slice() {
                [name, equal, value] if is_equal(equal) && is_nil(value) => identifier(name),
                [receiver, dot, name, equal, value]
                    if is_token(receiver, |t| t.is_word("self"))
                        && is_token(dot, |t| t.kind() == TokenKind::Period)
                        && is_equal(equal)
                        && is_nil(value) =>
                {
                    identifier(name)
                }
                _ => None,
            }
        })
        .collect()
}
