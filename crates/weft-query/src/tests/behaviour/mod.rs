//! Behaviour-driven step definitions for weft-query scenarios.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{
    TEMPLATE_INJECTIONS, TemplateProvider, nested_blocks, nested_templates, rust_tree,
};
use crate::{
    BracketScan, BracketTable, CancellationToken, Engine, EngineConfig, EngineError, Feature,
    HighlightMap, IndentMarkers, InjectionLayers, InjectionMap, InjectionResolver, InjectionState,
    LanguageRegistry, MatchResult, QueryError, RuleSet, SyntaxTree,
};

// =============================================================================
// Test World
// =============================================================================

/// State shared across steps.
#[derive(Default)]
struct TestWorld {
    tree: Option<SyntaxTree>,
    rules: Option<Result<RuleSet, QueryError>>,
    results: Vec<MatchResult>,
    table: Option<BracketTable>,
    scan: Option<BracketScan>,
    layers: Option<InjectionLayers>,
    engine: Option<Engine>,
}

impl TestWorld {
    fn tree(&self) -> &SyntaxTree {
        self.tree.as_ref().unwrap_or_else(|| panic!("tree should be set"))
    }

    fn rules(&self) -> &RuleSet {
        self.rules
            .as_ref()
            .unwrap_or_else(|| panic!("rules should be set"))
            .as_ref()
            .unwrap_or_else(|err| panic!("rules should compile: {err}"))
    }

    fn result(&self) -> &MatchResult {
        self.results.first().unwrap_or_else(|| panic!("rules should have run"))
    }
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

/// Strips surrounding double quotes from a step argument.
fn strip_quotes(s: &str) -> &str {
    s.trim_matches('"')
}

// =============================================================================
// Given Steps
// =============================================================================

#[given("Rust source {code}")]
fn given_rust_source(world: &RefCell<TestWorld>, code: String) {
    world.borrow_mut().tree = Some(rust_tree(strip_quotes(&code)));
}

#[given("the nested block tree")]
fn given_nested_blocks(world: &RefCell<TestWorld>) {
    world.borrow_mut().tree = Some(nested_blocks());
}

#[given("the nested template tree")]
fn given_nested_templates(world: &RefCell<TestWorld>) {
    world.borrow_mut().tree = Some(nested_templates());
}

#[given("rules {source}")]
fn given_rules(world: &RefCell<TestWorld>, source: String) {
    world.borrow_mut().rules = Some(RuleSet::compile(strip_quotes(&source)));
}

#[given("bracket rules for {open} and {close}")]
fn given_bracket_rules(world: &RefCell<TestWorld>, open: String, close: String) {
    let source = format!(
        "(\"{}\" @open \"{}\" @close)",
        strip_quotes(&open),
        strip_quotes(&close)
    );
    let rules = RuleSet::compile(&source)
        .unwrap_or_else(|err| panic!("bracket rules compile: {err}"));
    world.borrow_mut().table = Some(BracketTable::from_rule_set(&rules));
}

#[given("the markup bracket table")]
fn given_markup_table(world: &RefCell<TestWorld>) {
    world.borrow_mut().table = Some(BracketTable::markup());
}

#[given("an engine with highlight rules {highlights} and indent rules {indents}")]
fn given_engine(world: &RefCell<TestWorld>, highlights: String, indents: String) {
    let mut engine = Engine::new(EngineConfig::default());
    engine
        .compile("demo", Feature::Highlights, strip_quotes(&highlights))
        .unwrap_or_else(|err| panic!("highlight rules compile: {err}"));
    let broken = engine.compile("demo", Feature::Indents, strip_quotes(&indents));
    assert!(broken.is_err(), "indent rules should be rejected");
    world.borrow_mut().engine = Some(engine);
}

// =============================================================================
// When Steps
// =============================================================================

#[when("the rules run over the tree")]
fn when_rules_run(world: &RefCell<TestWorld>) {
    let mut w = world.borrow_mut();
    let result = w
        .rules()
        .matches(w.tree(), &CancellationToken::new())
        .unwrap_or_else(|err| panic!("match pass: {err}"));
    w.results.push(result);
}

#[when("the rules run over the tree twice")]
fn when_rules_run_twice(world: &RefCell<TestWorld>) {
    let mut w = world.borrow_mut();
    for _ in 0..2 {
        let result = w
            .rules()
            .matches(w.tree(), &CancellationToken::new())
            .unwrap_or_else(|err| panic!("match pass: {err}"));
        w.results.push(result);
    }
}

#[when("the text {text} is scanned")]
fn when_text_scanned(world: &RefCell<TestWorld>, text: String) {
    let mut w = world.borrow_mut();
    let scan = w
        .table
        .as_ref()
        .unwrap_or_else(|| panic!("bracket table should be set"))
        .scan(strip_quotes(&text));
    w.scan = Some(scan);
}

#[when("template injections are resolved")]
fn when_injections_resolved(world: &RefCell<TestWorld>) {
    let mut registry = LanguageRegistry::new();
    registry.insert(
        "tmpl",
        Feature::Injections,
        RuleSet::compile(TEMPLATE_INJECTIONS)
            .unwrap_or_else(|err| panic!("injection rules: {err}")),
    );
    registry.insert(
        "tmpl",
        Feature::Highlights,
        RuleSet::compile("(ident) @variable")
            .unwrap_or_else(|err| panic!("highlight rules: {err}")),
    );
    let host_rules = RuleSet::compile(TEMPLATE_INJECTIONS)
        .unwrap_or_else(|err| panic!("host rules: {err}"));

    let mut w = world.borrow_mut();
    let cancel = CancellationToken::new();
    let host_result = host_rules.matches(w.tree(), &cancel)
        .unwrap_or_else(|err| panic!("host pass: {err}"));
    let host = InjectionMap::resolve(w.tree(), &host_rules, &host_result);
    let provider = TemplateProvider(registry);
    let layers = InjectionResolver::new(&provider, &EngineConfig::default())
        .resolve(w.tree(), &host, Feature::Highlights, &cancel)
        .unwrap_or_else(|err| panic!("injections: {err}"));
    w.layers = Some(layers);
}

// =============================================================================
// Then Steps
// =============================================================================

#[then("the node {text} is tagged {tag}")]
fn then_node_tagged(world: &RefCell<TestWorld>, text: String, tag: String) {
    let w = world.borrow();
    let tree = w.tree();
    let map = HighlightMap::resolve(w.result());
    let wanted = strip_quotes(&text);
    let node = tree
        .nodes()
        .find(|node| node.is_named() && node.text() == wanted && map.tag(node.id()).is_some())
        .unwrap_or_else(|| panic!("no tagged node with text {wanted}"));
    assert_eq!(map.tag(node.id()).map(|found| found.name()), Some(strip_quotes(&tag)));
}

#[then("both runs agree")]
fn then_runs_agree(world: &RefCell<TestWorld>) {
    let w = world.borrow();
    let [first, second] = w.results.as_slice() else {
        panic!("expected two runs, got {}", w.results.len());
    };
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[then("the bracket pairs are {pairs}")]
fn then_bracket_pairs(world: &RefCell<TestWorld>, pairs: String) {
    let w = world.borrow();
    let scan = w.scan.as_ref().unwrap_or_else(|| panic!("scan should have run"));
    let rendered: Vec<String> = scan
        .pairs
        .iter()
        .map(|found| format!("{}-{}", found.open.start, found.close.start))
        .collect();
    assert_eq!(rendered.join(" "), strip_quotes(&pairs));
}

#[then("no delimiter is unmatched")]
fn then_no_unmatched(world: &RefCell<TestWorld>) {
    let w = world.borrow();
    let scan = w.scan.as_ref().unwrap_or_else(|| panic!("scan should have run"));
    assert!(scan.unmatched.is_empty(), "unmatched: {:?}", scan.unmatched);
}

#[then("the indent depths are {depths}")]
fn then_indent_depths(world: &RefCell<TestWorld>, depths: String) {
    let w = world.borrow();
    let markers = IndentMarkers::resolve(w.tree(), w.result());
    let rendered: Vec<String> = markers.scan().depths().iter().map(ToString::to_string).collect();
    assert_eq!(rendered.join(","), strip_quotes(&depths));
}

#[then("{count} injection layers are reported")]
fn then_layer_count(world: &RefCell<TestWorld>, count: usize) {
    let w = world.borrow();
    assert_eq!(w.layers.as_ref().map(InjectionLayers::len), Some(count));
}

#[then("the inner layer sits inside the outer layer")]
fn then_inner_inside_outer(world: &RefCell<TestWorld>) {
    let w = world.borrow();
    let layers = w.layers.as_ref().unwrap_or_else(|| panic!("layers")).layers();
    let [outer, inner] = layers else {
        panic!("expected two layers, got {}", layers.len());
    };
    assert_eq!((outer.depth, inner.depth), (1, 2));
    assert_eq!(inner.parent, Some(0));
    assert!(outer.injection.range.start < inner.injection.range.start);
    assert!(inner.injection.range.end < outer.injection.range.end);
}

#[then("the inner layer is reparsed from its own region")]
fn then_inner_reparsed(world: &RefCell<TestWorld>) {
    let w = world.borrow();
    let layers = w.layers.as_ref().unwrap_or_else(|| panic!("layers")).layers();
    let inner = layers.get(1).unwrap_or_else(|| panic!("inner layer"));
    assert_eq!(inner.state, InjectionState::Recursed);
    let tree = inner.tree.as_deref().unwrap_or_else(|| panic!("inner layer should be reparsed"));
    assert_eq!(Some(tree.source()), w.tree().source().get(inner.injection.range.clone()));
    assert_eq!(inner.result.as_ref().map(MatchResult::len), Some(1));
}

#[then("{count} rules are usable")]
fn then_rules_usable(world: &RefCell<TestWorld>, count: usize) {
    assert_eq!(world.borrow().rules().len(), count);
}

#[then("{count} rule is rejected")]
fn then_rules_rejected(world: &RefCell<TestWorld>, count: usize) {
    assert_eq!(world.borrow().rules().rejected().len(), count);
}

#[then("compilation fails at rule {rank}")]
fn then_compilation_fails(world: &RefCell<TestWorld>, rank: usize) {
    let w = world.borrow();
    let err = w
        .rules
        .as_ref()
        .unwrap_or_else(|| panic!("rules should be set"))
        .as_ref()
        .err()
        .unwrap_or_else(|| panic!("compilation should fail"));
    let diagnostic = err.diagnostic();
    assert!(
        diagnostic.notes().contains(&format!("while compiling rule {rank}")),
        "{diagnostic}"
    );
}

#[then("highlights are available")]
fn then_highlights_available(world: &RefCell<TestWorld>) {
    let w = world.borrow();
    let engine = w.engine.as_ref().unwrap_or_else(|| panic!("engine"));
    let tree = rust_tree("// note\nfn main() {}\n");
    let map = engine
        .highlights("demo", &tree, &CancellationToken::new())
        .unwrap_or_else(|err| panic!("highlights: {err}"));
    assert_eq!(map.len(), 1);
}

#[then("indents are unavailable")]
fn then_indents_unavailable(world: &RefCell<TestWorld>) {
    let w = world.borrow();
    let engine = w.engine.as_ref().unwrap_or_else(|| panic!("engine"));
    let tree = rust_tree("fn main() {}\n");
    let outcome = engine.indents("demo", &tree, &CancellationToken::new());
    assert!(matches!(
        outcome,
        Err(EngineError::FeatureUnavailable {
            feature: Feature::Indents,
            ..
        })
    ));
}

// =============================================================================
// Scenario Bindings
// =============================================================================

#[scenario(
    path = "tests/features/weft_query.feature",
    name = "The earliest rule wins a node's highlight tag"
)]
fn earliest_rule_wins(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/weft_query.feature",
    name = "Matching the same tree twice gives the same result"
)]
fn matching_is_deterministic(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/weft_query.feature",
    name = "Brace rules pair nested braces"
)]
fn brace_rules_pair_nested_braces(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/weft_query.feature",
    name = "Multi-character markup delimiters pair up"
)]
fn markup_delimiters_pair(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/weft_query.feature",
    name = "Nested blocks scan to balanced indent depths"
)]
fn nested_blocks_indent(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/weft_query.feature",
    name = "Nested injections stay separate regions"
)]
fn nested_injections_stay_separate(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/weft_query.feature",
    name = "An undefined capture drops only its rule"
)]
fn undefined_capture_drops_rule(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/weft_query.feature",
    name = "Malformed rules reject the rule set"
)]
fn malformed_rules_rejected(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/weft_query.feature",
    name = "A broken rule file degrades only its feature"
)]
fn broken_feature_degrades_alone(world: RefCell<TestWorld>) {
    let _ = world;
}
