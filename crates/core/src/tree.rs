//! Helpers for self-referencing trees (species and games).

use std::collections::{HashMap, VecDeque};

use crate::error::CoreError;
use crate::types::DbId;

/// Upper bound on the depth walked by recursive tree queries.
pub const MAX_TREE_DEPTH: i32 = 64;

/// Reject moving a node under itself or one of its own descendants.
///
/// `subtree` holds the ids of the node and every descendant.
pub fn validate_reparent(
    field: &'static str,
    new_parent_id: DbId,
    subtree: &[DbId],
) -> Result<(), CoreError> {
    if subtree.contains(&new_parent_id) {
        return Err(CoreError::InvalidField {
            field,
            message: "A node cannot be moved under itself or one of its descendants.".into(),
        });
    }
    Ok(())
}

/// A template node as read from the species table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateNode {
    pub id: DbId,
    pub parent_id: Option<DbId>,
}

/// Order the subtree rooted at `root_id` so that every node comes after its
/// parent (breadth-first, siblings in input order).
///
/// Nodes that are not reachable from `root_id` are dropped. The root itself
/// is not part of the result.
pub fn descendants_top_down(root_id: DbId, nodes: &[TemplateNode]) -> Vec<TemplateNode> {
    let mut by_parent: HashMap<DbId, Vec<TemplateNode>> = HashMap::new();
    for node in nodes {
        if let Some(parent_id) = node.parent_id {
            by_parent.entry(parent_id).or_default().push(*node);
        }
    }

    let mut ordered = Vec::new();
    let mut queue = VecDeque::from([root_id]);
    while let Some(id) = queue.pop_front() {
        if let Some(children) = by_parent.get(&id) {
            for child in children {
                ordered.push(*child);
                queue.push_back(child.id);
            }
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn node(id: DbId, parent_id: Option<DbId>) -> TemplateNode {
        TemplateNode { id, parent_id }
    }

    #[test]
    fn reparent_under_unrelated_node_is_allowed() {
        assert!(validate_reparent("parent_species_id", 9, &[1, 2, 3]).is_ok());
    }

    #[test]
    fn reparent_under_self_is_rejected() {
        assert_matches!(
            validate_reparent("parent_species_id", 1, &[1, 2, 3]),
            Err(CoreError::InvalidField { field: "parent_species_id", .. })
        );
    }

    #[test]
    fn reparent_under_descendant_is_rejected() {
        assert!(validate_reparent("parent_game_id", 3, &[1, 2, 3]).is_err());
    }

    #[test]
    fn parents_precede_children() {
        let nodes = [
            node(4, Some(2)),
            node(1, None),
            node(3, Some(1)),
            node(2, Some(1)),
        ];
        let ordered: Vec<DbId> = descendants_top_down(1, &nodes).iter().map(|n| n.id).collect();
        assert_eq!(ordered, vec![3, 2, 4]);
    }

    #[test]
    fn unreachable_nodes_are_dropped() {
        let nodes = [node(2, Some(1)), node(7, Some(6)), node(6, None)];
        let ordered = descendants_top_down(1, &nodes);
        assert_eq!(ordered, vec![node(2, Some(1))]);
    }

    #[test]
    fn leaf_root_has_no_descendants() {
        assert!(descendants_top_down(5, &[node(5, None)]).is_empty());
    }
}
