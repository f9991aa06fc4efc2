use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use transformation::{Diagnostic, MacroTransformation, TransformConfig};
use xdom::syntax::Syntax;

#[derive(Debug, Deserialize)]
pub struct ExpectedDiagnostic {
    /// Substring that must appear in the diagnostic message.
    pub contains: String,

    /// If set, the diagnostic's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Target syntax as `type/version`. Defaults to `xwiki/2.0`.
    #[serde(default)]
    pub syntax: Option<String>,

    /// Wiki macro definition files, relative to the test file.
    #[serde(default)]
    pub macros: Vec<String>,

    /// Transformation settings (`max_depth`, `strict`, `priority_order`).
    #[serde(default)]
    pub transform: TransformConfig,

    /// Expected markup after transformation (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected event stream after transformation (trimmed comparison).
    #[serde(default)]
    pub expect_events: Option<String>,

    /// Expected fatal error. The error's Display string must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If true, the test expects parsing to fail.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// Expected warnings. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedDiagnostic>>,

    /// Expected macro errors (failed executions, placement). Checked like warnings.
    #[serde(default)]
    pub expect_macro_errors: Option<Vec<ExpectedDiagnostic>>,
}

/// Parse a `.test.md` file into its TOML config and markup source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    // 1. Read file
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    // 2. Parse frontmatter
    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };

    let description = config.description.clone();
    match check_test(path, &config, source) {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Run one test body. Returns `Some(reason)` on failure.
fn check_test(path: &Path, config: &TestConfig, source: &str) -> Option<String> {
    let syntax: Syntax = match config.syntax.as_deref().map(str::parse::<Syntax>).transpose() {
        Ok(syntax) => syntax.unwrap_or_default(),
        Err(e) => return Some(e.to_string()),
    };

    // Parse markup
    let parse_result = xdom::parser::Parser::new(source.to_string(), 0)
        .with_syntax(syntax.clone())
        .parse();

    if config.expect_parse_error {
        return match parse_result {
            Err(_) => None,
            Ok(_) => Some("expected parse error, but parsing succeeded".into()),
        };
    }

    let mut dom = match parse_result {
        Ok(dom) => dom,
        Err(errs) => {
            let msgs: Vec<String> = errs.iter().map(|e| e.message.clone()).collect();
            return Some(format!("unexpected parse error: {}", msgs.join("; ")));
        }
    };

    // Build the registry
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let macro_files: Vec<PathBuf> = config.macros.iter().map(|m| base_dir.join(m)).collect();
    let registry = match crate::build_registry(&macro_files) {
        Ok(registry) => registry,
        Err(e) => return Some(format!("cannot load macros: {}", e)),
    };

    // Transform
    let result = MacroTransformation::new(&registry)
        .with_config(config.transform.clone())
        .transform(&mut dom, &syntax);

    let report = match (&config.expect_error, result) {
        (Some(expected_err), Err(err)) => {
            let err_str = err.to_string();
            return if err_str.contains(expected_err.as_str()) {
                None
            } else {
                Some(format!(
                    "expected error containing \"{}\", got: {}",
                    expected_err, err_str
                ))
            };
        }
        (Some(expected_err), Ok(_)) => {
            return Some(format!(
                "expected error containing \"{}\", but transformation succeeded",
                expected_err
            ));
        }
        (None, Err(err)) => return Some(format!("unexpected transformation error: {}", err)),
        (None, Ok(report)) => report,
    };

    if let Some(expected) = &config.expect_output {
        if let Some(reason) = compare("output", expected, &dom.to_string()) {
            return Some(reason);
        }
    }

    if let Some(expected) = &config.expect_events {
        if let Some(reason) = compare("events", expected, &dom.to_events_string()) {
            return Some(reason);
        }
    }

    if let Some(expected) = &config.expect_warnings {
        let warnings: Vec<&Diagnostic> = report.warnings().collect();
        if let Some(reason) = check_diagnostics("warning", source, &warnings, expected) {
            return Some(reason);
        }
    }

    if let Some(expected) = &config.expect_macro_errors {
        let errors: Vec<&Diagnostic> = report.errors().collect();
        if let Some(reason) = check_diagnostics("macro error", source, &errors, expected) {
            return Some(reason);
        }
    }

    None
}

fn compare(what: &str, expected: &str, actual: &str) -> Option<String> {
    let expected = expected.trim();
    let actual = actual.trim();
    if expected == actual {
        None
    } else {
        Some(format!(
            "{} mismatch\n  expected:\n{}\n  actual:\n{}",
            what,
            indent(expected),
            indent(actual)
        ))
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual diagnostics match expectations. Returns `Some(reason)` on mismatch.
fn check_diagnostics(
    kind: &str,
    source: &str,
    actual: &[&Diagnostic],
    expected: &[ExpectedDiagnostic],
) -> Option<String> {
    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual.iter().map(|d| format!("  - {}", d)).collect();
        return Some(format!(
            "expected {} {}(s), got {}\n  actual:\n{}",
            expected.len(),
            kind,
            actual.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected.iter()).enumerate() {
        let msg = actual.to_string();

        if !msg.contains(&expected.contains) {
            return Some(format!(
                "{}[{}]: expected message containing \"{}\", got: {}",
                kind, i, expected.contains, msg
            ));
        }

        if let Some(expected_line) = expected.line {
            let Some(span) = &actual.span else {
                return Some(format!(
                    "{}[{}]: expected on line {}, but it has no span",
                    kind, i, expected_line
                ));
            };
            let actual_line = byte_offset_to_line(source, span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "{}[{}]: expected on line {}, but span is on line {}",
                    kind, i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(".test.md"))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

fn label_for<'a>(result: &'a TestResult) -> &'a str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("?")
    })
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let selected: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        // Single file mode ignores categories
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        select_categories(all_categories, categories)
    };

    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &selected {
        if path.is_dir() {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", bold(header, no_color));
        }

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label_for(&result));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", fail_label(no_color), label_for(&result));
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
        0
    } else {
        let failed_label = if no_color {
            "FAILED"
        } else {
            "\x1b[31mFAILED\x1b[0m"
        };
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            failed_label,
            passed,
            failed,
            passed + failed
        );
        1
    }
}

fn select_categories(
    all_categories: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all_categories;
    }

    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let prefix = format!("{}/", req);
        let mut found = false;
        for (cat, files) in &all_categories {
            if cat == req || cat.starts_with(&prefix) {
                filtered.insert(cat.clone(), files.clone());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all_categories
                    .keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SIMPLE: &str = "---\n\
description = \"code macro\"\n\
expect_events = \"\"\"\n\
beginMacroMarker: [code] [] [x]\n\
onVerbatimStandalone: [x]\n\
endMacroMarker: [code] [] [x]\n\
\"\"\"\n\
---\n\
{{code}}x{{/code}}\n";

    #[test]
    fn splits_frontmatter_from_source() {
        let (config, source) = parse_test_file(SIMPLE).unwrap();
        assert_eq!(config.description.as_deref(), Some("code macro"));
        assert_eq!(config.transform, TransformConfig::default());
        assert_eq!(source, "{{code}}x{{/code}}\n");
    }

    #[test]
    fn missing_frontmatter_is_reported() {
        assert!(parse_test_file("{{code}}x{{/code}}\n").is_err());
    }

    #[test]
    fn transform_table_is_read() {
        let (config, _) =
            parse_test_file("---\n[transform]\nmax_depth = 2\nstrict = true\n---\n").unwrap();
        assert_eq!(config.transform.max_depth, 2);
        assert!(config.transform.strict);
    }

    #[test]
    fn runs_a_directory_of_tests() {
        let dir = tempfile::tempdir().unwrap();
        let category = dir.path().join("builtin");
        fs::create_dir(&category).unwrap();
        fs::write(category.join("code.test.md"), SIMPLE).unwrap();
        fs::write(
            category.join("unknown.test.md"),
            "---\nexpect_output = \"{{nope/}}\"\n\
             expect_warnings = [{ contains = \"unknown macro 'nope'\", line = 1 }]\n---\n\
             {{nope/}}\n",
        )
        .unwrap();

        assert_eq!(run_tests(dir.path(), true, &[]), 0);
        assert_eq!(run_tests(dir.path(), true, &["other".to_string()]), 1);
    }

    #[test]
    fn shipped_suites_pass() {
        let suites = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/macros"));
        assert_eq!(run_tests(suites, true, &[]), 0);
    }

    #[test]
    fn failing_expectation_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wrong.test.md");
        fs::write(&file, "---\nexpect_output = \"nothing\"\n---\n{{code}}x{{/code}}\n").unwrap();

        assert_eq!(run_tests(&file, true, &[]), 1);
    }
}
