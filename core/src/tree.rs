use crate::error::TreeError;
use crate::flatten;
use crate::node::{AnimationContext, FlatTree, NestedNode, Node, NodeId};
use std::collections::HashMap;

/// An id-keyed node tree.
///
/// This is the renderer's authoritative tree, and also the logic process's memory of what it
/// last sent. Parent/child relationships are id references into the map, so every traversal is an
/// explicit loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub(crate) root: NodeId,
    pub(crate) nodes: HashMap<NodeId, Node>,
}

impl Tree {
    /// Builds a tree from a flat node list.
    ///
    /// Nodes that are not reachable from the root are dropped.
    pub fn from_flat(flat: FlatTree) -> Result<Tree, TreeError> {
        let mut pool = HashMap::with_capacity(flat.nodes.len());
        for node in flat.nodes {
            let id = node.id.clone();
            if pool.insert(id.clone(), node).is_some() {
                return Err(TreeError::DuplicateNode(id));
            }
        }

        let root = flat.root_id;
        if !pool.contains_key(&root) {
            return Err(TreeError::MissingRoot(root));
        }

        let mut nodes = HashMap::with_capacity(pool.len());
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            let node = pool.remove(&id).ok_or_else(|| {
                if nodes.contains_key(&id) {
                    TreeError::DuplicateNode(id.clone())
                } else {
                    TreeError::MissingNode(id.clone())
                }
            })?;
            stack.extend(node.owned().cloned());
            nodes.insert(id, node);
        }

        if !pool.is_empty() {
            tracing::debug!("dropping {} unreachable nodes", pool.len());
        }

        Ok(Tree { root, nodes })
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    pub fn root(&self) -> &Node {
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child ids of a node; empty if the node does not exist or has no children.
    pub fn children(&self, id: &NodeId) -> &[NodeId] {
        self.nodes.get(id).map(Node::children).unwrap_or(&[])
    }

    /// Iterates over all nodes in depth-first pre-order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            tree: self,
            stack: vec![&self.root],
        }
    }

    /// Iterates over a node and everything it owns, in pre-order.
    pub fn iter_from<'a>(&'a self, id: &'a NodeId) -> Iter<'a> {
        Iter {
            tree: self,
            stack: vec![id],
        }
    }

    /// Copies out a node and everything it owns, subtree root first.
    pub fn subtree(&self, id: &NodeId) -> Vec<Node> {
        self.iter_from(id).cloned().collect()
    }

    /// The flat wire form of this tree.
    pub fn to_flat(&self) -> FlatTree {
        FlatTree {
            root_id: self.root.clone(),
            nodes: self.iter().cloned().collect(),
        }
    }

    /// The nested form of this tree.
    pub fn to_nested(&self) -> Result<NestedNode, TreeError> {
        flatten::nest(&self.root, |id| self.nodes.get(id))
    }

    /// The animation context in effect at a node: its own, or the nearest ancestor's.
    pub fn animation_for(&self, id: &NodeId) -> Option<&AnimationContext> {
        let mut current = Some(id.clone());
        while let Some(id) = current {
            if let Some(animation) = self.nodes.get(&id).and_then(|n| n.animation.as_ref()) {
                return Some(animation);
            }
            current = id.parent();
        }
        None
    }

    /// Removes a node and everything it owns from the map, without touching its parent.
    pub(crate) fn drop_subtree(&mut self, id: &NodeId) -> usize {
        let mut removed = 0;
        let mut stack = vec![id.clone()];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.owned().cloned());
                removed += 1;
            }
        }
        removed
    }
}

/// Pre-order iterator over a [`Tree`].
pub struct Iter<'a> {
    tree: &'a Tree,
    stack: Vec<&'a NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        loop {
            let id = self.stack.pop()?;
            // references to missing nodes are skipped
            if let Some(node) = self.tree.nodes.get(id) {
                let owned: Vec<_> = node.owned().collect();
                self.stack.extend(owned.into_iter().rev());
                return Some(node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;

    fn tree() -> Tree {
        let root = NestedNode::new("column")
            .animation(AnimationContext {
                curve: "ease".into(),
                duration_ms: 200,
            })
            .child(NestedNode::new("text"))
            .child(
                NestedNode::new("row")
                    .child(NestedNode::new("button"))
                    .animation(AnimationContext {
                        curve: "spring".into(),
                        duration_ms: 300,
                    }),
            );
        Tree::from_flat(flatten(&root).unwrap()).unwrap()
    }

    #[test]
    fn flat_round_trip() {
        let tree = tree();
        let flat = tree.to_flat();
        assert_eq!(flat, flatten(&tree.to_nested().unwrap()).unwrap());
        assert_eq!(Tree::from_flat(flat).unwrap(), tree);
    }

    #[test]
    fn inherits_nearest_animation() {
        let tree = tree();
        assert_eq!(tree.animation_for(&"root.0".into()).unwrap().curve, "ease");
        assert_eq!(tree.animation_for(&"root.1.0".into()).unwrap().curve, "spring");
        assert_eq!(tree.animation_for(&"root.1".into()).unwrap().duration_ms, 300);
    }

    #[test]
    fn unreachable_nodes_are_dropped() {
        let mut flat = tree().to_flat();
        flat.nodes.push(Node::new("root.9".into(), "stray"));
        let tree = Tree::from_flat(flat).unwrap();
        assert_eq!(tree.len(), 4);
        assert!(!tree.contains(&"root.9".into()));
    }

    #[test]
    fn drop_subtree_removes_descendants() {
        let mut tree = tree();
        assert_eq!(tree.drop_subtree(&"root.1".into()), 2);
        assert_eq!(tree.len(), 2);
    }
}
