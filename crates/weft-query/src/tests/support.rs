//! Trees and rule text shared by the crate-level tests.

use std::sync::Arc;

use crate::{
    Feature, LanguageRegistry, Parser, RuleSet, RuleSetProvider, SupportedLanguage, SyntaxTree,
    TreeBuilder, TreeError,
};

/// Injection rules that mark every `block` as a recursive `tmpl` region.
pub(crate) const TEMPLATE_INJECTIONS: &str = r#"((block) @injection.content
  (#set! injection.language "tmpl")
  (#set! injection.include-children))"#;

pub(crate) fn rust_tree(source: &str) -> SyntaxTree {
    Parser::new(SupportedLanguage::Rust)
        .unwrap_or_else(|err| panic!("rust grammar: {err}"))
        .parse(source)
        .unwrap_or_else(|err| panic!("parse: {err}"))
}

/// `block{ if{ } }` with one `block` node per brace pair.
pub(crate) fn nested_blocks() -> SyntaxTree {
    let mut builder = TreeBuilder::new("block{ if{ } }");
    builder.start_node("program", 0);
    builder.start_node("block_statement", 0);
    builder.start_field_node("body", "block", 5);
    builder.token(5..6).unwrap_or_else(|err| panic!("open brace: {err}"));
    builder.start_node("if_statement", 7);
    builder.start_field_node("body", "block", 9);
    builder.token(9..10).unwrap_or_else(|err| panic!("open brace: {err}"));
    builder.token(11..12).unwrap_or_else(|err| panic!("close brace: {err}"));
    builder.finish_node(12).unwrap_or_else(|err| panic!("inner block: {err}"));
    builder.finish_node(12).unwrap_or_else(|err| panic!("if: {err}"));
    builder.token(13..14).unwrap_or_else(|err| panic!("close brace: {err}"));
    builder.finish_node(14).unwrap_or_else(|err| panic!("outer block: {err}"));
    builder.finish_node(14).unwrap_or_else(|err| panic!("statement: {err}"));
    builder.finish_node(14).unwrap_or_else(|err| panic!("program: {err}"));
    builder.build().unwrap_or_else(|err| panic!("tree: {err}"))
}

/// Parses `{{ ... }}` template text: each brace pair is a `block` and each
/// run of letters an `ident`, all under one `document`.
pub(crate) fn template_tree(text: &str) -> Result<SyntaxTree, TreeError> {
    let mut builder = TreeBuilder::new(text);
    builder.start_node("document", 0);
    let mut at = 0;
    while let Some(rest) = text.get(at..).filter(|rest| !rest.is_empty()) {
        if rest.starts_with("{{") {
            builder.start_node("block", at);
            at += 2;
        } else if rest.starts_with("}}") {
            at += 2;
            builder.finish_node(at)?;
        } else if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let len = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or_else(|| rest.len());
            builder.leaf("ident", at..at + len)?;
            at += len;
        } else {
            at += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    builder.finish_node(text.len())?;
    builder.build()
}

/// `{{ x {{ y }} }}`: ids 0 document, 1 block, 2 x, 3 block, 4 y.
pub(crate) fn nested_templates() -> SyntaxTree {
    template_tree("{{ x {{ y }} }}").unwrap_or_else(|err| panic!("template: {err}"))
}

/// Registry rules plus a grammar for `tmpl` regions.
pub(crate) struct TemplateProvider(pub(crate) LanguageRegistry);

impl RuleSetProvider for TemplateProvider {
    fn rule_set(&self, language: &str, feature: Feature) -> Option<Arc<RuleSet>> {
        self.0.rule_set(language, feature)
    }

    fn parse_region(&self, language: &str, text: &str) -> Option<Result<SyntaxTree, TreeError>> {
        (language == "tmpl").then(|| template_tree(text))
    }
}

/// A Rust source long enough to keep a match pass busy.
pub(crate) fn large_rust_source(functions: usize) -> String {
    (0..functions)
        .map(|index| format!("fn f{index}(a: u32) -> u32 {{ let b = a + {index}; b * 2 }}\n"))
        .collect()
}
