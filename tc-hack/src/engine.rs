//! Runs the rewrite rules over a whole file.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::RewriteConfig;
use crate::matchers::{inherits_from, qualifies};
use crate::rules;
use crate::syntax::{ClassDecl, Node, SourceFile};

/// What happened to one class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassReport {
    pub name: String,
    /// The legacy base entry was replaced by the target base.
    pub replaced_base: bool,
    /// A cleanup method was synthesized.
    pub added_cleanup: bool,
    /// Lifecycle methods that received a `super` call.
    pub super_calls: Vec<String>,
    /// Fields that received a `nil` assignment.
    pub nil_assignments: Vec<String>,
}

impl ClassReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn changed(&self) -> bool {
        self.replaced_base
            || self.added_cleanup
            || !self.super_calls.is_empty()
            || !self.nil_assignments.is_empty()
    }
}

/// Summary of a rewrite, in visiting order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    /// Classes changed by the per-class rules.
    pub classes: Vec<ClassReport>,
    /// Classes whose inheritance clause was renamed by the normalization pass.
    pub normalized: Vec<String>,
}

impl RewriteReport {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.normalized.is_empty()
    }
}

/// Applies the rewrite rules to every qualifying class of a file.
#[derive(Debug, Clone, Default)]
pub struct RewriteEngine {
    config: RewriteConfig,
}

impl RewriteEngine {
    pub fn new(config: RewriteConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, file: &SourceFile) -> SourceFile {
        self.process_with_report(file).0
    }

    /// Rewrites `file` and reports what changed.
    ///
    /// Classes are visited depth-first, parents before the classes nested in
    /// them. The inheritance normalization pass runs afterwards over the
    /// whole result.
    pub fn process_with_report(&self, file: &SourceFile) -> (SourceFile, RewriteReport) {
        let mut report = RewriteReport::default();
        let rewritten = file.map_items(&mut |item| self.visit(item, &mut report));

        let (normalized, renamed) = rules::normalize_inheritance(&rewritten, &self.config);
        for name in &renamed {
            debug!("Normalized inheritance of {}", name);
        }
        report.normalized = renamed;
        (normalized, report)
    }

    fn visit(&self, node: &Node, report: &mut RewriteReport) -> Node {
        let node = match node {
            Node::Class(class) if qualifies(class, &self.config) => {
                match self.rewrite_class(class) {
                    Some((class, class_report)) => {
                        debug!("Rewrote {}: {:?}", class_report.name, class_report);
                        report.classes.push(class_report);
                        Node::Class(Arc::new(class))
                    }
                    None => node.clone(),
                }
            }
            _ => node.clone(),
        };
        node.map_children(&mut |child| self.visit(child, report))
    }

    /// Runs rules 1 to 5 on a qualifying class. `None` when nothing changed.
    fn rewrite_class(&self, class: &ClassDecl) -> Option<(ClassDecl, ClassReport)> {
        let config = &self.config;
        let mut report = ClassReport::new(class.name());

        let mut class = match rules::substitute_base_class(class, config) {
            Some(rewritten) => {
                trace!("{}: {} -> {}", report.name, config.legacy_base, config.target_base);
                report.replaced_base = true;
                rewritten
            }
            None if inherits_from(class, &config.target_base) => class.clone(),
            None => return None,
        };

        if let Some(rewritten) = rules::ensure_cleanup_method(&class, config) {
            trace!("{}: added {}()", report.name, config.cleanup);
            report.added_cleanup = true;
            class = rewritten;
        }

        let (rewritten, super_calls) = rules::inject_super_calls(&class, config);
        for name in &super_calls {
            trace!("{}: added super.{}()", report.name, name);
        }
        report.super_calls = super_calls;
        class = rewritten;

        let (rewritten, fields) = rules::inject_nil_assignments(&class, config);
        for field in &fields {
            trace!("{}: added {} = nil", report.name, field);
        }
        report.nil_assignments = fields;
        class = rewritten;

        report.changed().then_some((class, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::render::render;

    fn process(source: &str) -> (String, RewriteReport) {
        let file = parse(source).unwrap();
        let (rewritten, report) = RewriteEngine::default().process_with_report(&file);
        (render(&rewritten), report)
    }

    #[test]
    fn test_untouched_file_is_shared() {
        let file = parse("class A {\n    var x: Int!\n}\nstruct S {}\n").unwrap();
        let rewritten = RewriteEngine::default().process(&file);
        for (before, after) in file.items.iter().zip(&rewritten.items) {
            assert!(before.ptr_eq(after));
        }
    }

    #[test]
    fn test_report_lists_changes() {
        let (_, report) = process(
            "class A: XCTestCase {\n    var x: Int!\n    override func setUp() {\n    }\n}\n",
        );
        assert_eq!(
            report.classes,
            vec![ClassReport {
                name: "A".to_string(),
                replaced_base: true,
                added_cleanup: true,
                super_calls: vec!["setUp".to_string(), "tearDown".to_string()],
                nil_assignments: vec!["x".to_string()],
            }]
        );
        assert!(report.normalized.is_empty());
    }

    #[test]
    fn test_fully_migrated_class_is_not_reported() {
        let source = "class A: DDTestCase {\n    override func tearDown() {\n        super.tearDown()\n    }\n}\n";
        let (text, report) = process(source);
        assert_eq!(text, source);
        assert!(report.is_empty());
    }

    #[test]
    fn test_nested_test_classes_are_rewritten() {
        let source = "enum Suite {\n    final class Inner: XCTestCase {\n        override func tearDown() {\n            super.tearDown()\n        }\n    }\n}\n";
        let (text, report) = process(source);
        assert_eq!(report.classes.len(), 1);
        assert_eq!(report.classes[0].name, "Inner");
        assert!(text.contains("final class Inner: DDTestCase {"));
    }

    #[test]
    fn test_class_nested_in_test_class() {
        let source = "class Outer: XCTestCase {\n    override func tearDown() {\n        super.tearDown()\n    }\n\n    class Inner: XCTestCase {\n        override func tearDown() {\n            super.tearDown()\n        }\n    }\n}\n";
        let (text, report) = process(source);
        let names: Vec<_> = report.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Outer", "Inner"]);
        assert_eq!(text.matches("DDTestCase").count(), 2);
        assert!(!text.contains("XCTestCase"));
    }

    #[test]
    fn test_alternate_names() {
        let config = RewriteConfig {
            legacy_base: "OldBase".to_string(),
            target_base: "NewBase".to_string(),
            setup: "prepare".to_string(),
            setup_with_error: "prepareOrThrow".to_string(),
            cleanup: "dispose".to_string(),
            cleanup_with_error: "disposeOrThrow".to_string(),
        };
        let file = parse("class A: OldBase {\n    var x: Int!\n}\n").unwrap();
        let rewritten = RewriteEngine::new(config).process(&file);
        assert_eq!(
            render(&rewritten),
            "class A: NewBase {\n    var x: Int!\n\n    override func dispose() {\n        super.dispose()\n        x = nil\n    }\n}\n"
        );
    }

    #[test]
    fn test_normalization_renames_remaining_legacy_entries() {
        let source = "open class DDTestCase: XCTestCase {}\nclass A: XCTestCase, XCTestCase {\n    override func tearDown() {\n        super.tearDown()\n    }\n}\n";
        let (text, report) = process(source);
        assert_eq!(report.classes.len(), 1);
        assert!(report.classes[0].replaced_base);
        assert_eq!(report.normalized, vec!["A"]);
        assert!(text.starts_with(
            "open class DDTestCase: XCTestCase {}\nclass A: DDTestCase, DDTestCase {\n"
        ));
    }
}
