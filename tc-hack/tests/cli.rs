use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use anyhow::Result;
use tempfile::TempDir;

const LEGACY: &str = "class FooTests: XCTestCase {\n    var x: String!\n}\n";
const MIGRATED: &str = "class FooTests: DDTestCase {\n    var x: String!\n\n    override func tearDown() {\n        super.tearDown()\n        x = nil\n    }\n}\n";

fn tc_hack(args: &[&str], path: &Path) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_tc-hack"))
        .args(args)
        .arg(path)
        .env_remove("RUST_LOG")
        .output()?;
    Ok(output)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_rewrites_file_in_place() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("FooTests.swift");
    fs::write(&path, LEGACY)?;

    let output = tc_hack(&[], &path)?;

    assert!(output.status.success());
    assert!(stdout(&output).contains("✓ Modified:"));
    assert!(stdout(&output).ends_with("Success!\n"));
    assert_eq!(fs::read_to_string(&path)?, MIGRATED);
    Ok(())
}

#[test]
fn test_second_run_reports_no_changes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("FooTests.swift");
    fs::write(&path, MIGRATED)?;

    let output = tc_hack(&[], &path)?;

    assert!(output.status.success());
    assert!(stdout(&output).contains("No changes:"));
    assert_eq!(fs::read_to_string(&path)?, MIGRATED);
    Ok(())
}

#[test]
fn test_dry_run_prints_diff_without_writing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("FooTests.swift");
    fs::write(&path, LEGACY)?;

    let output = tc_hack(&["--dry-run", "--summary"], &path)?;

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("-class FooTests: XCTestCase {"));
    assert!(out.contains("+class FooTests: DDTestCase {"));
    assert!(out.contains("+        x = nil"));
    assert!(out.contains("Lines added: 6"));
    assert!(out.contains("Would modify:"));
    assert_eq!(fs::read_to_string(&path)?, LEGACY);
    Ok(())
}

#[test]
fn test_diff_format_writes_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("FooTests.swift");
    fs::write(&path, LEGACY)?;

    let output = tc_hack(&["--format", "diff"], &path)?;

    assert!(output.status.success());
    assert!(stdout(&output).contains("+class FooTests: DDTestCase {"));
    assert_eq!(fs::read_to_string(&path)?, MIGRATED);
    Ok(())
}

#[test]
fn test_json_format_reports_changes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("FooTests.swift");
    fs::write(&path, LEGACY)?;

    let output = tc_hack(&["--format", "json", "--dry-run"], &path)?;

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(json["changed"], true);
    assert_eq!(json["written"], false);
    let class = &json["report"]["classes"][0];
    assert_eq!(class["name"], "FooTests");
    assert_eq!(class["replaced_base"], true);
    assert_eq!(class["added_cleanup"], true);
    assert_eq!(class["nil_assignments"][0], "x");
    assert_eq!(fs::read_to_string(&path)?, LEGACY);
    Ok(())
}

#[test]
fn test_rejects_non_swift_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("FooTests.txt");
    fs::write(&path, LEGACY)?;

    let output = tc_hack(&[], &path)?;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failure:"));
    assert!(stderr(&output).contains("not a Swift source file"));
    assert_eq!(fs::read_to_string(&path)?, LEGACY);
    Ok(())
}

#[test]
fn test_parse_failure_leaves_file_untouched() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("Broken.swift");
    let source = "class FooTests: XCTestCase {\n    var s = \"open\n}\n";
    fs::write(&path, source)?;

    let output = tc_hack(&[], &path)?;

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unterminated string literal"));
    assert_eq!(fs::read_to_string(&path)?, source);
    Ok(())
}

#[test]
fn test_missing_file_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("Missing.swift");

    let output = tc_hack(&[], &path)?;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to read"));
    Ok(())
}
