#[cfg(test)]
mod scenario_tests {
    use crate::config::RewriteConfig;
    use crate::diff::generate_unified_diff;
    use crate::engine::RewriteEngine;
    use crate::parse::parse;
    use crate::render::render;
    use crate::rewrite_source;
    use std::path::Path;

    const EXAMPLE: &str = include_str!("../fixtures/ExampleTests.swift");
    const EXAMPLE_EXPECTED: &str = include_str!("../fixtures/ExampleTests.expected.swift");

    fn rewrite(source: &str) -> String {
        rewrite_source(source, &RewriteConfig::default())
            .unwrap()
            .text
    }

    #[test]
    fn test_scenario_legacy_class_is_migrated() {
        let source = r#"class FooTests: XCTestCase {
    var x: String!

    override func setUp() {
    }
}
"#;
        let expected = r#"class FooTests: DDTestCase {
    var x: String!

    override func setUp() {
        super.setUp()
    }

    override func tearDown() {
        super.tearDown()
        x = nil
    }
}
"#;
        assert_eq!(rewrite(source), expected);
    }

    #[test]
    fn test_scenario_only_missing_nil_assignment_is_added() {
        let source = r#"class BarTests: DDTestCase {
    var a: Int!
    var b: String!

    override func tearDown() {
        super.tearDown()
        a = nil
    }
}
"#;
        let expected = r#"class BarTests: DDTestCase {
    var a: Int!
    var b: String!

    override func tearDown() {
        super.tearDown()
        a = nil
        b = nil
    }
}
"#;
        assert_eq!(rewrite(source), expected);
    }

    #[test]
    fn test_scenario_existing_super_call_is_untouched() {
        let source = r#"class BazTests: DDTestCase {
    override func setUp() {
        super.setUp()
        prepare()
    }

    override func tearDown() {
        super.tearDown()
    }
}
"#;
        assert_eq!(rewrite(source), source);
    }

    #[test]
    fn test_scenario_synthesized_cleanup_without_fields() {
        let source = r#"class QuxTests: XCTestCase {
    var name: String?

    func testName() {
        XCTAssertNil(name)
    }
}
"#;
        let expected = r#"class QuxTests: DDTestCase {
    var name: String?

    func testName() {
        XCTAssertNil(name)
    }

    override func tearDown() {
        super.tearDown()
    }
}
"#;
        assert_eq!(rewrite(source), expected);
    }

    #[test]
    fn test_scenario_plain_classes_are_unchanged() {
        let source = r#"class Plain {
    var x: Int!

    func setUp() {
    }
}

class Formatter: NumberFormatter {
    var cache: [String: String]!
}
"#;
        let result = rewrite_source(source, &RewriteConfig::default()).unwrap();
        assert_eq!(result.text, source);
        assert!(result.report.is_empty());
    }

    #[test]
    fn test_example_fixture() {
        assert_eq!(rewrite(EXAMPLE), EXAMPLE_EXPECTED);
    }

    #[test]
    fn test_example_fixture_with_crlf_line_endings() {
        let source = EXAMPLE.replace('\n', "\r\n");
        let expected = EXAMPLE_EXPECTED.replace('\n', "\r\n");
        assert_eq!(rewrite(&source), expected);
    }

    #[test]
    fn test_example_fixture_round_trip() {
        let file = parse(EXAMPLE).unwrap();
        assert_eq!(render(&file), EXAMPLE);
    }

    #[test]
    fn test_example_fixture_is_idempotent() {
        let engine = RewriteEngine::default();
        let once = engine.process(&parse(EXAMPLE).unwrap());
        let twice = engine.process(&once);
        assert_eq!(render(&twice), render(&once));
    }

    #[test]
    fn test_example_fixture_report() {
        let result = rewrite_source(EXAMPLE, &RewriteConfig::default()).unwrap();
        let names: Vec<_> = result
            .report
            .classes
            .iter()
            .map(|class| class.name.as_str())
            .collect();
        assert_eq!(names, vec!["CheckoutTests", "ReceiptTests"]);

        let checkout = &result.report.classes[0];
        assert!(checkout.replaced_base);
        assert!(checkout.added_cleanup);
        assert_eq!(checkout.super_calls, vec!["setUpWithError", "tearDown"]);
        assert_eq!(checkout.nil_assignments, vec!["cart", "client"]);

        let receipt = &result.report.classes[1];
        assert!(!receipt.replaced_base);
        assert!(receipt.super_calls.is_empty());
        assert_eq!(receipt.nil_assignments, vec!["receipt"]);
    }

    #[test]
    fn test_edits_stay_local() {
        let rewritten = rewrite(EXAMPLE);
        let (diff, stats) =
            generate_unified_diff(Path::new("ExampleTests.swift"), EXAMPLE, &rewritten, 0);

        // The only line that changes is the legacy class header.
        assert_eq!(stats.lines_removed, 1);
        assert!(diff.contains("-final class CheckoutTests: XCTestCase {"));
        assert_eq!(stats.lines_added, 9);
    }

    #[test]
    fn test_comments_and_blank_lines_survive() {
        let source = "// header\n\n/* doc */ class A: XCTestCase { // open\n\n\n    // fields\n    var x: Int! // keep\n\n    override func tearDown() { // close\n        super.tearDown()\n    }\n}\n";
        let expected = "// header\n\n/* doc */ class A: DDTestCase { // open\n\n\n    // fields\n    var x: Int! // keep\n\n    override func tearDown() { // close\n        super.tearDown()\n        x = nil\n    }\n}\n";
        assert_eq!(rewrite(source), expected);
    }

    #[test]
    fn test_parse_error_aborts_rewrite() {
        let err = rewrite_source("class A: XCTestCase {\n", &RewriteConfig::default()).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
