use termtree::Tree;
use tracing::instrument;

use crate::domain::hierarchy::{Hierarchy, NodeId};
use crate::util::naming::quote_name;

/// Renders a hierarchy (or part of it) as a terminal tree.
pub trait TreeNodeConvert {
    fn to_tree_string(&self, root: NodeId) -> Tree<String>;
}

impl TreeNodeConvert for Hierarchy {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, root: NodeId) -> Tree<String> {
        fn label(hierarchy: &Hierarchy, id: NodeId) -> String {
            match hierarchy.node(id) {
                Some(node) => format!("{} ({})", quote_name(node.name()), node.model().name()),
                None => format!("<missing {}>", id),
            }
        }

        fn build_tree(hierarchy: &Hierarchy, node_idx: NodeId, parent_tree: &mut Tree<String>) {
            if let Some(node) = hierarchy.node(node_idx) {
                for &child_idx in node.children() {
                    let mut child_tree = Tree::new(label(hierarchy, child_idx));
                    build_tree(hierarchy, child_idx, &mut child_tree);
                    parent_tree.push(child_tree);
                }
            }
        }

        let mut tree = Tree::new(label(self, root));
        build_tree(self, root, &mut tree);
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Child, ModelType, ModelTypeBuilder};

    #[test]
    fn test_to_tree_string_lists_children() {
        let entity = ModelType::entity();
        let model = ModelTypeBuilder::new("Model")
            .child("_hidden", Child::new(&entity, "Hidden"))
            .child("leaf", Child::new(&entity, "Leaf").with_parent("_hidden"))
            .build()
            .unwrap();
        let mut h = Hierarchy::new();
        let m = h.instantiate(&model, "TestModel").unwrap();

        let rendered = h.to_tree_string(m).to_string();
        assert!(rendered.starts_with("'TestModel' (Model)"));
        assert!(rendered.contains("'Hidden' (Entity)"));
        assert!(rendered.contains("'Leaf' (Entity)"));
        assert_eq!(rendered.lines().count(), 3);
    }
}
