use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tc_hack::{print_diff, rewrite_source, RewriteConfig, RewriteReport};

#[derive(Parser)]
#[command(name = "tc-hack")]
#[command(about = "Migrate a Swift test file from XCTestCase to DDTestCase")]
#[command(long_about = "Rewrites one Swift source file in place:

  • classes inheriting XCTestCase inherit DDTestCase instead
  • setUp/setUpWithError/tearDown/tearDownWithError call through to super
  • a tearDown override is added when the class has none
  • every `var x: T!` field is reset to nil in tearDown

Everything outside the edited spans (indentation, comments, blank lines)
is preserved byte for byte.")]
#[command(after_help = "Examples:
  tc-hack Tests/LoginTests.swift
  tc-hack --dry-run Tests/LoginTests.swift
  tc-hack --format json Tests/LoginTests.swift")]
#[command(version)]
struct Cli {
    /// Swift source file to rewrite
    path: PathBuf,

    /// Print the changes as a unified diff instead of writing the file
    #[arg(long)]
    dry_run: bool,

    /// Output format: "default", "diff", or "json"
    #[arg(long, default_value = "default", value_parser = ["default", "diff", "json"])]
    format: String,

    /// Show summary statistics after diff output
    #[arg(long)]
    summary: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// `--format json` output.
#[derive(Serialize)]
struct JsonOutput<'a> {
    path: String,
    changed: bool,
    written: bool,
    report: &'a RewriteReport,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        eprintln!("Failure: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let path = &cli.path;
    check_extension(path)?;

    let original = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    info!("Rewriting {}", path.display());

    let rewrite = rewrite_source(&original, &RewriteConfig::default())
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let changed = rewrite.text != original;
    let write = changed && !cli.dry_run;
    debug!(
        "{} classes rewritten, {} normalized",
        rewrite.report.classes.len(),
        rewrite.report.normalized.len()
    );

    match cli.format.as_str() {
        "json" => {
            let output = JsonOutput {
                path: path.display().to_string(),
                changed,
                written: write,
                report: &rewrite.report,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        format => {
            if format == "diff" || cli.dry_run {
                let stats = print_diff(path, &original, &rewrite.text);
                if cli.summary {
                    stats.print_summary();
                }
            }
        }
    }

    if write {
        fs::write(path, &rewrite.text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if cli.format != "json" {
        if !changed {
            println!("No changes: {}", path.display());
        } else if cli.dry_run {
            println!("Would modify: {}", path.display());
        } else {
            println!("✓ Modified: {}", path.display());
        }
        println!("Success!");
    }
    Ok(())
}

fn check_extension(path: &Path) -> Result<()> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("swift") {
        bail!(
            "{} is not a Swift source file (expected a .swift extension)",
            path.display()
        );
    }
    Ok(())
}
