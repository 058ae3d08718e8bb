//! Conversion between nested trees and flat node lists.
//!
//! Both directions walk an explicit work stack instead of recursing, since trees may come close to
//! the depth limit and the limit must not be policed by a stack overflow.

use crate::error::{BuildError, TreeError};
use crate::node::{AnimationContext, FlatTree, Modifier, NestedNode, Node, NodeId, Props};
use std::collections::{HashMap, HashSet};

/// Maximum number of id segments a node may have.
pub const DEFAULT_DEPTH_LIMIT: usize = 100;

/// A nested tree that can be flattened.
///
/// Implemented by [`NestedNode`] and by richer descriptions that carry more than wire data (such as
/// event handlers), so that both get their ids from the same walk.
pub trait FlattenSource: Sized {
    fn kind(&self) -> &str;
    fn props(&self) -> &Props;
    fn modifiers(&self) -> &[Modifier];
    fn children(&self) -> Option<&[Self]>;
    fn background(&self) -> Option<&Self>;
    fn overlay(&self) -> Option<&Self>;
    fn animation(&self) -> Option<&AnimationContext>;
}

impl FlattenSource for NestedNode {
    fn kind(&self) -> &str {
        &self.kind
    }
    fn props(&self) -> &Props {
        &self.props
    }
    fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }
    fn children(&self) -> Option<&[Self]> {
        self.children.as_deref()
    }
    fn background(&self) -> Option<&Self> {
        self.background.as_deref()
    }
    fn overlay(&self) -> Option<&Self> {
        self.overlay.as_deref()
    }
    fn animation(&self) -> Option<&AnimationContext> {
        self.animation.as_ref()
    }
}

/// Flattens a tree with the default depth limit.
pub fn flatten<T: FlattenSource>(root: &T) -> Result<FlatTree, BuildError> {
    flatten_with(root, DEFAULT_DEPTH_LIMIT, |_, _| {})
}

/// Flattens a tree, assigning ids by position in a depth-first pre-order walk.
///
/// `visit` is called once per node with its assigned id. If any node is deeper than `limit` the
/// whole build fails; callers must discard whatever `visit` collected in that case.
pub fn flatten_with<T, F>(root: &T, limit: usize, mut visit: F) -> Result<FlatTree, BuildError>
where
    T: FlattenSource,
    F: FnMut(&NodeId, &T),
{
    let root_id = NodeId::root();
    let mut nodes = Vec::new();
    let mut stack = vec![(root, root_id.clone())];

    while let Some((source, id)) = stack.pop() {
        if id.depth() > limit {
            return Err(BuildError::DepthExceeded { id, limit });
        }

        let mut node = Node::new(id.clone(), source.kind());
        node.props = source.props().clone();
        node.modifiers = source.modifiers().to_vec();
        node.animation = source.animation().cloned();

        // pushed in reverse so they pop as children, background, overlay
        if let Some(overlay) = source.overlay() {
            let overlay_id = id.overlay();
            node.overlay_ref = Some(overlay_id.clone());
            stack.push((overlay, overlay_id));
        }
        if let Some(background) = source.background() {
            let background_id = id.background();
            node.background_ref = Some(background_id.clone());
            stack.push((background, background_id));
        }
        if let Some(children) = source.children() {
            let ids: Vec<_> = (0..children.len()).map(|i| id.child(i)).collect();
            for (child, child_id) in children.iter().zip(&ids).rev() {
                stack.push((child, child_id.clone()));
            }
            node.children = Some(ids);
        }

        visit(&id, source);
        nodes.push(node);
    }

    Ok(FlatTree { root_id, nodes })
}

/// Rebuilds the nested form of a flat node list.
pub fn unflatten(flat: &FlatTree) -> Result<NestedNode, TreeError> {
    let mut index = HashMap::with_capacity(flat.nodes.len());
    for node in &flat.nodes {
        if index.insert(&node.id, node).is_some() {
            return Err(TreeError::DuplicateNode(node.id.clone()));
        }
    }
    nest(&flat.root_id, |id| index.get(id).copied())
}

/// Builds a nested tree from any id lookup.
pub(crate) fn nest<'a, F>(root_id: &NodeId, lookup: F) -> Result<NestedNode, TreeError>
where
    F: Fn(&NodeId) -> Option<&'a Node>,
{
    let root = lookup(root_id).ok_or_else(|| TreeError::MissingRoot(root_id.clone()))?;

    // collect reachable nodes in pre-order, then assemble them in reverse so that every node's
    // descendants are finished before the node itself
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !seen.insert(&node.id) {
            return Err(TreeError::DuplicateNode(node.id.clone()));
        }
        order.push(node);
        let owned: Vec<_> = node.owned().collect();
        for id in owned.into_iter().rev() {
            stack.push(lookup(id).ok_or_else(|| TreeError::MissingNode(id.clone()))?);
        }
    }

    let mut built: HashMap<NodeId, NestedNode> = HashMap::with_capacity(order.len());
    for node in order.into_iter().rev() {
        let mut take = |id: &NodeId| {
            built
                .remove(id)
                .ok_or_else(|| TreeError::MissingNode(id.clone()))
        };
        let children = match &node.children {
            Some(ids) => Some(ids.iter().map(&mut take).collect::<Result<Vec<_>, _>>()?),
            None => None,
        };
        let background = node.background_ref.as_ref().map(&mut take).transpose()?;
        let overlay = node.overlay_ref.as_ref().map(&mut take).transpose()?;

        built.insert(
            node.id.clone(),
            NestedNode {
                id: node.id.clone(),
                kind: node.kind.clone(),
                props: node.props.clone(),
                modifiers: node.modifiers.clone(),
                children,
                background: background.map(Box::new),
                overlay: overlay.map(Box::new),
                animation: node.animation.clone(),
            },
        );
    }

    built
        .remove(root_id)
        .ok_or_else(|| TreeError::MissingRoot(root_id.clone()))
}
