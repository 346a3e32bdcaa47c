//! Import of tree-sitter trees into the arena representation.

use super::{SyntaxTree, TreeBuilder, Validation};
use crate::error::TreeError;

impl SyntaxTree {
    /// Copies a tree-sitter tree into an arena tree over `source`.
    ///
    /// Kinds, named flags, field names, spans and the error/missing flags are
    /// preserved. Span violations mark nodes as malformed rather than failing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cursor walk is structurally unbalanced,
    /// which indicates a tree that does not belong to `source`.
    pub fn from_tree_sitter(tree: &tree_sitter::Tree, source: &str) -> Result<Self, TreeError> {
        let mut builder = TreeBuilder::new(source).validation(Validation::Lenient);
        let mut cursor = tree.walk();

        'walk: loop {
            let node = cursor.node();
            let id = builder.open(node.kind(), node.is_named(), cursor.field_name(), node.start_byte());
            if node.is_error() {
                builder.mark_error(id);
            }
            if node.is_missing() {
                builder.mark_missing(id);
            }
            if cursor.goto_first_child() {
                continue;
            }
            builder.finish_node(node.end_byte())?;

            loop {
                if cursor.goto_next_sibling() {
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
                builder.finish_node(cursor.node().end_byte())?;
            }
        }

        builder.build()
    }
}
