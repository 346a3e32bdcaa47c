//! Tests driving [`crate::run`] with in-memory streams.

use std::ffi::OsString;
use std::fs;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use insta::assert_snapshot;
use rstest::{fixture, rstest};
use serde_json::Value;
use tempfile::TempDir;

use crate::cli::{OutputFormat, ResolvedOutputFormat};
use crate::config::{ConfigLoader, OrthoConfigLoader, WeftConfig};
use crate::errors::AppError;

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|err| panic!("mkdir {parent}: {err}"));
        }
        fs::write(&path, contents).unwrap_or_else(|err| panic!("write {path}: {err}"));
        path
    }

    fn redact(&self, text: &str) -> String {
        text.replace(self.root.as_str(), "<dir>")
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap_or_else(|path| panic!("non UTF-8 temp path: {}", path.display()));
    Workspace { _dir: dir, root }
}

struct Outcome {
    code: ExitCode,
    stdout: String,
    stderr: String,
}

impl Outcome {
    fn json(&self) -> Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|err| panic!("stdout is not JSON ({err}): {}", self.stdout))
    }
}

fn invoke(args: &[&str]) -> Outcome {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let argv = std::iter::once("weft").chain(args.iter().copied()).map(Into::into);
    let code = crate::run(argv, &mut stdout, &mut stderr, false);
    Outcome {
        code,
        stdout: String::from_utf8(stdout).unwrap_or_else(|err| panic!("stdout: {err}")),
        stderr: String::from_utf8(stderr).unwrap_or_else(|err| panic!("stderr: {err}")),
    }
}

#[rstest]
#[case(OutputFormat::Auto, true, ResolvedOutputFormat::Human)]
#[case(OutputFormat::Auto, false, ResolvedOutputFormat::Json)]
#[case(OutputFormat::Human, false, ResolvedOutputFormat::Human)]
#[case(OutputFormat::Json, true, ResolvedOutputFormat::Json)]
fn output_format_resolves_against_the_terminal(
    #[case] format: OutputFormat,
    #[case] terminal: bool,
    #[case] expected: ResolvedOutputFormat,
) {
    assert_eq!(format.resolve(terminal), expected);
}

// =============================================================================
// check
// =============================================================================

#[rstest]
fn check_reports_rejected_rules_but_succeeds(workspace: Workspace) {
    let query = workspace.write(
        "highlights.scm",
        "(line_comment) @comment\n((identifier) @a (#eq? @b @a))\n",
    );
    let outcome = invoke(&["--output", "human", "check", query.as_str()]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let rendered = workspace.redact(&outcome.stdout);
    assert!(rendered.starts_with("<dir>/highlights.scm: ok (1 of 2 rules usable)\n"));
    assert!(rendered.contains("E_WEFT_UNKNOWN_CAPTURE"));
    assert!(rendered.contains("note: while compiling rule 1"));
}

#[rstest]
fn strict_check_fails_on_undefined_captures(workspace: Workspace) {
    let query = workspace.write("indents.scm", "((block) @indent (#eq? @missing \"x\"))\n");
    let outcome = invoke(&["--output", "json", "check", "--strict", query.as_str()]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    let report = outcome.json();
    assert_eq!(report["files"][0]["ok"], Value::Bool(false));
    assert_eq!(report["files"][0]["diagnostics"][0]["code"], "EWeftUnknownCapture");
}

#[rstest]
fn check_rejects_malformed_rule_files(workspace: Workspace) {
    let good = workspace.write("good.scm", "(identifier) @variable\n");
    let bad = workspace.write("bad.scm", "(string_literal\n");
    let outcome = invoke(&["--output", "json", "check", good.as_str(), bad.as_str()]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    let report = outcome.json();
    assert_eq!(report["files"][0]["ok"], Value::Bool(true));
    assert_eq!(report["files"][1]["ok"], Value::Bool(false));
    assert_eq!(report["files"][1]["diagnostics"][0]["code"], "EWeftQueryParse");
}

#[test]
fn check_reports_unreadable_files() {
    let outcome = invoke(&["check", "/nonexistent/highlights.scm"]);
    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("failed to read /nonexistent/highlights.scm"));
}

// =============================================================================
// run
// =============================================================================

#[rstest]
fn run_highlights_with_builtin_rules(workspace: Workspace) {
    let source = workspace.write("main.rs", "fn main() {}\n");
    let outcome = invoke(&["--output", "human", "run", "--feature", "highlights", source.as_str()]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_snapshot!(workspace.redact(&outcome.stdout), @r"
    <dir>/main.rs:1:1-1:3 keyword `fn`
    <dir>/main.rs:1:4-1:8 function `main`
    ");
}

#[rstest]
fn run_emits_tagged_json(workspace: Workspace) {
    let source = workspace.write("main.rs", "fn main() {}\n");
    let outcome = invoke(&["run", "--feature", "highlights", source.as_str()]);

    let report = outcome.json();
    assert_eq!(report["feature"], "highlights");
    assert_eq!(report["language"], "rust");
    assert_eq!(report["items"][1]["tag"], "function");
    assert_eq!(report["items"][1]["span"]["text"], "main");
    assert_eq!(report["items"][1]["span"]["from"]["column"], 4);
}

#[rstest]
fn run_prefers_an_explicit_rule_file(workspace: Workspace) {
    let source = workspace.write("lib.rs", "fn main() {}\n");
    let query = workspace.write("custom.scm", "(identifier) @name\n");
    let outcome = invoke(&[
        "run",
        "--language",
        "rust",
        "--feature",
        "highlights",
        "--query",
        query.as_str(),
        source.as_str(),
    ]);

    let report = outcome.json();
    let items = report["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["tag"], "name");
}

#[rstest]
fn run_uses_search_directories_before_builtin_rules(workspace: Workspace) {
    workspace.write("queries/rust/highlights.scm", "(function_item) @item\n");
    let source = workspace.write("main.rs", "fn main() {}\n");
    let queries = workspace.root.join("queries");
    let outcome = invoke(&[
        "--queries-dir",
        queries.as_str(),
        "run",
        "--feature",
        "highlights",
        source.as_str(),
    ]);

    let report = outcome.json();
    assert_eq!(report["items"][0]["tag"], "item");
    assert_eq!(report["items"][0]["span"]["text"], "fn main() {}");
}

#[rstest]
fn run_reports_injected_regions(workspace: Workspace) {
    let source = workspace.write("query.rs", "fn main() { sql!(select 1); }\n");
    let outcome = invoke(&["run", "--feature", "injections", source.as_str()]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let report = outcome.json();
    assert_eq!(report["feature"], "injections");
    assert_eq!(report["items"][0]["language"], "sql");
    assert_eq!(report["items"][0]["state"], "injected");
    assert_eq!(report["items"][0]["span"]["text"], "(select 1)");
}

#[rstest]
fn run_reports_indent_steps(workspace: Workspace) {
    let source = workspace.write("main.rs", "fn main() {\n    let x = 1;\n}\n");
    let outcome = invoke(&["--output", "human", "run", "--feature", "indents", source.as_str()]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert!(workspace.redact(&outcome.stdout).contains("<dir>/main.rs:1:11 open depth 0 @indent"));
}

#[rstest]
fn run_needs_a_language_for_unknown_extensions(workspace: Workspace) {
    let source = workspace.write("notes.txt", "hello");
    let outcome = invoke(&["run", "--feature", "highlights", source.as_str()]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("pass --language"));
}

#[rstest]
fn run_surfaces_compile_errors_in_rule_overrides(workspace: Workspace) {
    let source = workspace.write("main.rs", "fn main() {}\n");
    let query = workspace.write("broken.scm", "(identifier\n");
    let outcome = invoke(&[
        "run",
        "--feature",
        "highlights",
        "--query",
        query.as_str(),
        source.as_str(),
    ]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(workspace.redact(&outcome.stderr).starts_with("weft: <dir>/broken.scm: invalid query syntax"));
}

// =============================================================================
// brackets
// =============================================================================

#[rstest]
fn brackets_pair_markup_delimiters(workspace: Workspace) {
    let source = workspace.write("page.html", "<!-- a @* b *@ -->");
    let outcome = invoke(&["--output", "human", "brackets", source.as_str()]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_snapshot!(workspace.redact(&outcome.stdout), @r"
    <dir>/page.html:1:1 <!-- .. 1:16 -->
    <dir>/page.html:1:8 @* .. 1:13 *@
    ");
}

#[rstest]
fn brackets_fail_on_unmatched_delimiters(workspace: Workspace) {
    let source = workspace.write("open.txt", "\n  (a");
    let outcome = invoke(&["--output", "json", "brackets", source.as_str()]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    let report = outcome.json();
    assert_eq!(report["unmatched"][0]["text"], "(");
    assert_eq!(report["unmatched"][0]["from"]["line"], 2);
    assert_eq!(report["unmatched"][0]["from"]["column"], 3);
}

#[rstest]
fn brackets_read_pairs_from_rule_files(workspace: Workspace) {
    let query = workspace.write("brackets.scm", "(\"begin\" @open \"end\" @close)\n");
    let source = workspace.write("block.txt", "begin ( end");
    let outcome = invoke(&["brackets", "--query", query.as_str(), source.as_str()]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let report = outcome.json();
    assert_eq!(report["pairs"][0]["open"]["text"], "begin");
    assert_eq!(report["pairs"][0]["close"]["text"], "end");
    assert_eq!(report["unmatched"], Value::Array(Vec::new()));
}

// =============================================================================
// Usage and configuration
// =============================================================================

#[test]
fn missing_subcommand_is_a_usage_error() {
    let outcome = invoke(&[]);
    assert_eq!(outcome.code, ExitCode::from(2));
    assert!(outcome.stderr.contains("Usage"));
}

#[test]
fn unknown_features_are_usage_errors() {
    let outcome = invoke(&["run", "--feature", "folds", "main.rs"]);
    assert_eq!(outcome.code, ExitCode::from(2));
    assert!(outcome.stderr.contains("unknown feature: 'folds'"));
}

#[test]
fn help_goes_to_stdout() {
    let outcome = invoke(&["--help"]);
    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Usage: weft"));
    assert!(outcome.stderr.is_empty());
}

#[rstest]
fn invalid_configuration_fails(workspace: Workspace) {
    let config = workspace.write("weft.toml", "max_matches = \"many\"\n");
    let source = workspace.write("main.rs", "fn main() {}\n");
    let outcome = invoke(&[
        "--config-path",
        config.as_str(),
        "run",
        "--feature",
        "highlights",
        source.as_str(),
    ]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("failed to load configuration"));
}

#[rstest]
fn configuration_file_sets_the_output_format(workspace: Workspace) {
    let config = workspace.write("weft.toml", "output = \"human\"\n");
    let source = workspace.write("page.html", "<!-- a -->");
    let outcome = invoke(&[
        "--config-path",
        config.as_str(),
        "brackets",
        source.as_str(),
    ]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert!(outcome.stdout.contains("page.html:1:1 <!-- .. 1:8 -->"));
    assert!(serde_json::from_str::<Value>(&outcome.stdout).is_err());
}

#[rstest]
fn flags_override_the_configuration_file(workspace: Workspace) {
    let config = workspace.write("weft.toml", "output = \"human\"\n");
    let source = workspace.write("page.html", "<!-- a -->");
    let outcome = invoke(&[
        "--config-path",
        config.as_str(),
        "--output",
        "json",
        "brackets",
        source.as_str(),
    ]);

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert_eq!(outcome.json()["unmatched"], Value::Array(Vec::new()));
}

#[rstest]
fn configuration_file_limits_reach_the_engine(workspace: Workspace) {
    let config = workspace.write("weft.toml", "max_matches = 1\n");
    workspace.write("queries/rust/highlights.scm", "(identifier) @name\n");
    let source = workspace.write("main.rs", "fn main() { let a = b; }\n");
    let queries = workspace.root.join("queries");
    let outcome = invoke(&[
        "--config-path",
        config.as_str(),
        "--queries-dir",
        queries.as_str(),
        "run",
        "--feature",
        "highlights",
        source.as_str(),
    ]);

    let report = outcome.json();
    let items = report["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 1);
    assert_eq!(report["warnings"].as_array().map(Vec::len), Some(1));
}

/// Ignores the real arguments and loads an unparseable limit instead.
struct FailingLoader;

impl ConfigLoader for FailingLoader {
    fn load(&self, _args: &[OsString]) -> Result<WeftConfig, AppError> {
        let args = ["weft", "--max-matches", "many"].map(OsString::from);
        OrthoConfigLoader.load(&args)
    }
}

#[test]
fn loader_failures_are_reported_after_parsing() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let argv = ["weft", "brackets", "main.rs"].map(OsString::from);
    let code = crate::run_with_loader(argv, &mut stdout, &mut stderr, false, &FailingLoader);

    let stderr = String::from_utf8(stderr).unwrap_or_else(|err| panic!("stderr: {err}"));
    assert_eq!(code, ExitCode::FAILURE);
    assert!(stderr.starts_with("weft: failed to load configuration"));
    assert!(stdout.is_empty());
}

#[test]
fn usage_errors_win_over_configuration() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let argv = ["weft", "frobnicate"].map(OsString::from);
    let code = crate::run_with_loader(argv, &mut stdout, &mut stderr, false, &FailingLoader);

    assert_eq!(code, ExitCode::from(2));
}
