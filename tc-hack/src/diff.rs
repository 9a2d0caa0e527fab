use std::path::Path;

use similar::{ChangeTag, TextDiff};

/// Line counts of a rewrite.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffStats {
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl DiffStats {
    pub fn is_empty(&self) -> bool {
        self.lines_added == 0 && self.lines_removed == 0
    }

    pub fn print_summary(&self) {
        println!("\nSummary:");
        println!("Lines added: {}", self.lines_added);
        println!("Lines removed: {}", self.lines_removed);
    }
}

/// Unified diff of a rewritten file, with `a/` and `b/` headers naming `path`.
///
/// Returns the diff text (empty when nothing changed) and its line counts.
pub fn generate_unified_diff(
    path: &Path,
    original: &str,
    modified: &str,
    context_lines: usize,
) -> (String, DiffStats) {
    let diff = TextDiff::from_lines(original, modified);

    let mut stats = DiffStats::default();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => stats.lines_added += 1,
            ChangeTag::Delete => stats.lines_removed += 1,
            ChangeTag::Equal => {}
        }
    }
    if stats.is_empty() {
        return (String::new(), stats);
    }

    let path = path.display();
    let output = diff
        .unified_diff()
        .context_radius(context_lines)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string();
    (output, stats)
}

/// Prints the diff of a rewrite to stdout and returns its line counts.
pub fn print_diff(path: &Path, original: &str, modified: &str) -> DiffStats {
    let (diff_output, stats) = generate_unified_diff(path, original, modified, 3);
    print!("{}", diff_output);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_generate_unified_diff() {
        let original = "class A: XCTestCase {\n    var x: Int!\n}\n";
        let modified = "class A: DDTestCase {\n    var x: Int!\n}\n";
        let path = PathBuf::from("Tests/ATests.swift");

        let (diff, stats) = generate_unified_diff(&path, original, modified, 3);

        assert!(diff.contains("--- a/Tests/ATests.swift"));
        assert!(diff.contains("+++ b/Tests/ATests.swift"));
        assert!(diff.contains("-class A: XCTestCase {"));
        assert!(diff.contains("+class A: DDTestCase {"));
        assert_eq!(stats.lines_added, 1);
        assert_eq!(stats.lines_removed, 1);
    }

    #[test]
    fn test_generate_unified_diff_no_changes() {
        let content = "class A {}\n";
        let path = PathBuf::from("A.swift");

        let (diff, stats) = generate_unified_diff(&path, content, content, 3);

        assert!(diff.is_empty());
        assert!(stats.is_empty());
    }

    #[test]
    fn test_generate_unified_diff_only_insertions() {
        let original = "func tearDown() {\n}\n";
        let modified = "func tearDown() {\n    super.tearDown()\n    x = nil\n}\n";
        let path = PathBuf::from("A.swift");

        let (diff, stats) = generate_unified_diff(&path, original, modified, 0);

        assert!(diff.contains("+    super.tearDown()"));
        assert!(diff.contains("+    x = nil"));
        assert_eq!(
            stats,
            DiffStats {
                lines_added: 2,
                lines_removed: 0
            }
        );
    }
}
