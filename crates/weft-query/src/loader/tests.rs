//! Unit tests for rule file discovery and the registry.

use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::error::EngineError;
use crate::query::RuleSet;
use crate::resolve::RuleSetProvider;

struct RuleDir {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl RuleDir {
    fn write(&self, language: &str, feature: Feature, text: &str) {
        let dir = self.root.join(language);
        fs::create_dir_all(&dir).unwrap_or_else(|err| panic!("create language dir: {err}"));
        fs::write(dir.join(feature.file_name()), text)
            .unwrap_or_else(|err| panic!("write rule file: {err}"));
    }
}

fn temp_rule_dir() -> RuleDir {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("temp dir: {err}"));
    let root = Utf8Path::from_path(dir.path())
        .unwrap_or_else(|| panic!("utf-8 temp path")).to_path_buf();
    RuleDir { _dir: dir, root }
}

#[fixture]
fn rule_dir() -> RuleDir {
    temp_rule_dir()
}

fn text(loader: &QueryLoader, language: &str, feature: Feature) -> Option<String> {
    loader
        .read(language, feature)
        .unwrap_or_else(|err| panic!("read rules: {err}"))
        .map(|source| source.text)
}

#[rstest]
#[case("highlights", Feature::Highlights)]
#[case(" Indents.scm ", Feature::Indents)]
#[case("textobjects", Feature::TextObjects)]
fn feature_labels_parse(#[case] input: &str, #[case] expected: Feature) {
    assert_eq!(input.parse::<Feature>(), Ok(expected));
}

#[test]
fn unknown_feature_label_is_rejected() {
    let err = "folds".parse::<Feature>().expect_err("unknown feature");
    assert_eq!(err.to_string(), "unknown feature: 'folds'");
}

#[test]
fn feature_labels_round_trip() {
    for feature in Feature::all() {
        assert_eq!(feature.as_str().parse::<Feature>(), Ok(*feature));
        assert_eq!(feature.file_name(), format!("{feature}.scm"));
    }
}

#[rstest]
fn search_dir_overrides_builtin(rule_dir: RuleDir) {
    rule_dir.write("rust", Feature::Brackets, "(\"<\" @open \">\" @close)\n");
    let loader = QueryLoader::new().with_search_dir(rule_dir.root.clone());

    let source = loader.read("rust", Feature::Brackets)
        .unwrap_or_else(|err| panic!("read: {err}"))
        .unwrap_or_else(|| panic!("present"));

    assert_eq!(source.text, "(\"<\" @open \">\" @close)\n");
    assert_eq!(source.path, Some(rule_dir.root.join("rust").join("brackets.scm")));
}

#[rstest]
fn later_search_dirs_take_priority(rule_dir: RuleDir) {
    let other = temp_rule_dir();
    rule_dir.write("rust", Feature::Highlights, "(a) @first\n");
    other.write("rust", Feature::Highlights, "(a) @second\n");
    let loader = QueryLoader::new()
        .with_search_dir(rule_dir.root.clone())
        .with_search_dir(other.root.clone());

    assert_eq!(loader.search_dirs().first(), Some(&other.root));
    assert_eq!(text(&loader, "rust", Feature::Highlights).as_deref(), Some("(a) @second\n"));
}

#[test]
fn builtin_rules_are_found() {
    let loader = QueryLoader::new();
    let source = loader.read("rust", Feature::Highlights)
        .unwrap_or_else(|err| panic!("read: {err}"))
        .unwrap_or_else(|| panic!("builtin"));

    assert!(source.path.is_none());
    assert!(source.text.contains("@function"));
}

#[rstest]
fn builtin_fallback_can_be_disabled(rule_dir: RuleDir) {
    let loader = QueryLoader::new().with_search_dir(rule_dir.root.clone()).without_builtin();

    assert_eq!(text(&loader, "rust", Feature::Highlights), None);
}

#[test]
fn missing_feature_reads_as_none() {
    assert_eq!(text(&QueryLoader::new(), "python", Feature::Injections), None);
    assert_eq!(text(&QueryLoader::new(), "cobol", Feature::Highlights), None);
}

#[rstest]
fn inherited_rules_come_first(rule_dir: RuleDir) {
    rule_dir.write("base", Feature::Highlights, "(base) @base\n");
    rule_dir.write("extra", Feature::Highlights, "(extra) @extra\n");
    rule_dir.write("child", Feature::Highlights, "; inherits: base, extra\n(child) @child\n");
    let loader = QueryLoader::new().with_search_dir(rule_dir.root.clone()).without_builtin();

    let combined = text(&loader, "child", Feature::Highlights).unwrap_or_else(|| panic!("present"));

    assert_eq!(
        combined,
        "(base) @base\n\n(extra) @extra\n\n; inherits: base, extra\n(child) @child\n"
    );
}

#[rstest]
fn inheritance_cycles_terminate(rule_dir: RuleDir) {
    rule_dir.write("a", Feature::Indents, "; inherits: b\n(a) @indent\n");
    rule_dir.write("b", Feature::Indents, "; inherits: a\n(b) @indent\n");
    let loader = QueryLoader::new().with_search_dir(rule_dir.root.clone()).without_builtin();

    let combined = text(&loader, "a", Feature::Indents).unwrap_or_else(|| panic!("present"));

    assert_eq!(combined, "; inherits: a\n(b) @indent\n\n; inherits: b\n(a) @indent\n");
}

#[test]
fn builtin_typescript_inherits_ecma() {
    let combined = text(&QueryLoader::new(), "typescript", Feature::Highlights)
        .unwrap_or_else(|| panic!("builtin"));
    let ecma = combined.find("(property_identifier) @property")
        .unwrap_or_else(|| panic!("ecma rules"));
    let own = combined.find("(predefined_type) @type.builtin")
        .unwrap_or_else(|| panic!("typescript rules"));

    assert!(ecma < own);
}

#[rstest]
fn languages_merge_dirs_and_builtin(rule_dir: RuleDir) {
    rule_dir.write("razor", Feature::Injections, "(a) @injection.content\n");
    fs::write(rule_dir.root.join("README"), "not a language")
        .unwrap_or_else(|err| panic!("write file: {err}"));
    let loader = QueryLoader::new().with_search_dir(rule_dir.root.clone());

    let languages = loader.languages().unwrap_or_else(|err| panic!("languages: {err}"));

    assert_eq!(languages, ["ecma", "python", "razor", "rust", "typescript"]);
}

#[test]
fn missing_search_dir_is_skipped() {
    let loader = QueryLoader::new().with_search_dir("/nonexistent/weft/rules");

    assert!(loader.languages()
        .unwrap_or_else(|err| panic!("languages: {err}")).contains(&String::from("rust")));
    assert!(text(&loader, "rust", Feature::Brackets).is_some());
}

#[rstest]
fn registry_degrades_only_the_failing_feature(rule_dir: RuleDir) {
    rule_dir.write("demo", Feature::Highlights, "(comment) @comment\n");
    rule_dir.write("demo", Feature::Indents, "(block\n");
    let loader = QueryLoader::new().with_search_dir(rule_dir.root.clone()).without_builtin();

    let (registry, report) = LanguageRegistry::load(&loader, &[String::from("demo")]);

    assert!(registry.get("demo", Feature::Highlights).is_ok());
    assert!(matches!(
        registry.get("demo", Feature::Indents),
        Err(EngineError::FeatureUnavailable { feature: Feature::Indents, .. })
    ));
    assert!(matches!(
        registry.get("demo", Feature::Brackets),
        Err(EngineError::NotLoaded { .. })
    ));
    let [diagnostic] = report.diagnostics() else {
        panic!("expected one diagnostic, got {report:?}");
    };
    assert_eq!(diagnostic.code(), DiagnosticCode::EWeftQueryParse);
    let uri = rule_dir.root.join("demo").join("indents.scm");
    assert_eq!(diagnostic.span().and_then(|span| span.uri()), Some(uri.as_str()));
}

#[rstest]
fn registry_reports_dropped_rules(rule_dir: RuleDir) {
    rule_dir.write(
        "demo",
        Feature::Highlights,
        "(comment) @comment\n((identifier) @a (#eq? @b \"x\"))\n",
    );
    let loader = QueryLoader::new().with_search_dir(rule_dir.root.clone()).without_builtin();

    let (registry, report) = LanguageRegistry::load(&loader, &[String::from("demo")]);

    let rules = registry.get("demo", Feature::Highlights).unwrap_or_else(|_| panic!("compiled"));
    assert_eq!(rules.len(), 1);
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.diagnostics().first().map(Diagnostic::code),
        Some(DiagnosticCode::EWeftUnknownCapture)
    );
}

#[test]
fn builtin_rules_all_compile() {
    let languages: Vec<String> = QueryLoader::new().languages()
        .unwrap_or_else(|err| panic!("languages: {err}"));
    let (registry, report) = LanguageRegistry::load(&QueryLoader::new(), &languages);

    assert!(report.is_empty(), "{report}");
    assert_eq!(registry.languages(), ["ecma", "python", "rust", "typescript"]);
    assert!(registry.get("rust", Feature::Injections).is_ok());
}

#[test]
fn inserted_rule_sets_are_shared() {
    let mut registry = LanguageRegistry::new();
    registry.insert("demo", Feature::Brackets, RuleSet::compile("(\"(\" @open \")\" @close)")
        .unwrap_or_else(|err| panic!("compile: {err}")));

    let first = registry.get("demo", Feature::Brackets).unwrap_or_else(|_| panic!("present"));
    let second = registry.rule_set("demo", Feature::Brackets).unwrap_or_else(|| panic!("present"));

    assert!(Arc::ptr_eq(&first, &second));
    assert!(matches!(registry.status("demo", Feature::Brackets), Some(RuleSetStatus::Ready(_))));
}
