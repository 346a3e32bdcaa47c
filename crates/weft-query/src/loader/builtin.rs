//! Rule files compiled into the crate.

use super::Feature;

const LANGUAGES: &[&str] = &["ecma", "python", "rust", "typescript"];

/// Returns the labels with built-in rule files, sorted.
pub(crate) const fn languages() -> &'static [&'static str] {
    LANGUAGES
}

/// Returns the built-in rule text for `language` and `feature`.
pub(crate) fn rules(language: &str, feature: Feature) -> Option<&'static str> {
    let text = match (language, feature) {
        ("ecma", Feature::Highlights) => include_str!("../../queries/ecma/highlights.scm"),
        ("ecma", Feature::Brackets) => include_str!("../../queries/ecma/brackets.scm"),
        ("python", Feature::Highlights) => include_str!("../../queries/python/highlights.scm"),
        ("python", Feature::Indents) => include_str!("../../queries/python/indents.scm"),
        ("python", Feature::Brackets) => include_str!("../../queries/python/brackets.scm"),
        ("python", Feature::TextObjects) => include_str!("../../queries/python/textobjects.scm"),
        ("rust", Feature::Highlights) => include_str!("../../queries/rust/highlights.scm"),
        ("rust", Feature::Indents) => include_str!("../../queries/rust/indents.scm"),
        ("rust", Feature::Injections) => include_str!("../../queries/rust/injections.scm"),
        ("rust", Feature::Brackets) => include_str!("../../queries/rust/brackets.scm"),
        ("rust", Feature::TextObjects) => include_str!("../../queries/rust/textobjects.scm"),
        ("typescript", Feature::Highlights) => include_str!("../../queries/typescript/highlights.scm"),
        ("typescript", Feature::Indents) => include_str!("../../queries/typescript/indents.scm"),
        ("typescript", Feature::Brackets) => include_str!("../../queries/typescript/brackets.scm"),
        _ => return None,
    };
    Some(text)
}
