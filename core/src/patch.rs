//! Targeted edits against a live [`Tree`].
//!
//! Application is best-effort: a patch whose target is gone is a stale edit from an earlier
//! generation and is skipped, never an error.

use crate::node::{Modifier, Node, NodeId, Props};
use crate::registry::KindRegistry;
use crate::tree::Tree;
use rmpv::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One edit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Patch {
    /// Swaps the target's subtree for `nodes` (subtree root first).
    Replace { target_id: NodeId, nodes: Vec<Node> },
    /// Merges properties into the target; `nil` values clear a key.
    Props { target_id: NodeId, props: Props },
    /// Replaces the target's modifier list.
    Modifiers {
        target_id: NodeId,
        modifiers: Vec<Modifier>,
    },
    /// Splices a new subtree into the parent of `target_id` at `index`.
    Insert {
        target_id: NodeId,
        index: usize,
        nodes: Vec<Node>,
    },
    /// Removes the target and everything it owns.
    Remove { target_id: NodeId },
}

impl Patch {
    /// An insert whose index comes from the subtree root's id suffix.
    ///
    /// Non-numeric suffixes (backgrounds, overlays) get an index past the end.
    pub fn insert(nodes: Vec<Node>) -> Option<Patch> {
        let target_id = nodes.first()?.id.clone();
        let index = target_id.index().unwrap_or(usize::MAX);
        Some(Patch::Insert {
            target_id,
            index,
            nodes,
        })
    }

    pub fn target_id(&self) -> &NodeId {
        match self {
            Patch::Replace { target_id, .. }
            | Patch::Props { target_id, .. }
            | Patch::Modifiers { target_id, .. }
            | Patch::Insert { target_id, .. }
            | Patch::Remove { target_id } => target_id,
        }
    }
}

impl Tree {
    /// Applies a patch in place. Returns false if the patch did not match anything.
    pub fn apply(&mut self, patch: &Patch, registry: &KindRegistry) -> bool {
        let applied = match patch {
            Patch::Replace { target_id, nodes } => self.replace(target_id, nodes),
            Patch::Props { target_id, props } => self.merge_props(target_id, props, registry),
            Patch::Modifiers {
                target_id,
                modifiers,
            } => match self.nodes.get_mut(target_id) {
                Some(node) => {
                    node.modifiers = modifiers.clone();
                    true
                }
                None => false,
            },
            Patch::Insert {
                target_id,
                index,
                nodes,
            } => self.insert(target_id, *index, nodes, registry),
            Patch::Remove { target_id } => self.remove(target_id),
        };

        if !applied {
            tracing::debug!("skipping stale patch for {}", patch.target_id());
        }
        applied
    }

    /// Applies a patch and returns the tree.
    pub fn patched(mut self, patch: &Patch, registry: &KindRegistry) -> Tree {
        self.apply(patch, registry);
        self
    }

    fn replace(&mut self, target: &NodeId, nodes: &[Node]) -> bool {
        let new_root = match nodes.first() {
            Some(node) => node.id.clone(),
            None => {
                tracing::warn!("replace patch for {} carries no nodes", target);
                return false;
            }
        };
        if !self.nodes.contains_key(target) {
            return false;
        }
        if !is_subtree(&new_root, nodes) {
            tracing::warn!("rejecting replace of {}: nodes do not form a subtree", target);
            return false;
        }
        // everything under the target goes away, anything else must not be overwritten
        if let Some(id) = nodes
            .iter()
            .map(|node| &node.id)
            .find(|id| !id.is_within(target) && self.nodes.contains_key(*id))
        {
            tracing::warn!("rejecting replace of {}: {} is already live", target, id);
            return false;
        }

        self.drop_subtree(target);
        self.nodes
            .extend(nodes.iter().map(|node| (node.id.clone(), node.clone())));

        if new_root != *target {
            if self.root == *target {
                self.root = new_root;
            } else {
                self.repoint(target, Some(new_root));
            }
        }
        true
    }

    fn merge_props(&mut self, target: &NodeId, props: &Props, registry: &KindRegistry) -> bool {
        let node = match self.nodes.get_mut(target) {
            Some(node) => node,
            None => return false,
        };
        let kind = registry.resolve(&node.kind);
        for (key, value) in props {
            if !kind.accepts_prop(key) {
                tracing::debug!("ignoring unknown property `{}` on {} ({})", key, target, node.kind);
                continue;
            }
            if value.is_nil() {
                node.props.remove(key);
            } else {
                node.props.insert(key.clone(), value.clone());
            }
        }
        true
    }

    fn insert(
        &mut self,
        target: &NodeId,
        index: usize,
        nodes: &[Node],
        registry: &KindRegistry,
    ) -> bool {
        let parent_id = match target.parent() {
            Some(id) => id,
            None => {
                tracing::warn!("cannot insert {}: it has no parent", target);
                return false;
            }
        };
        let new_root = match nodes.first() {
            Some(node) => node.id.clone(),
            None => {
                tracing::warn!("insert patch for {} carries no nodes", target);
                return false;
            }
        };
        if new_root != *target || !is_subtree(&new_root, nodes) {
            tracing::warn!("rejecting insert of {}: nodes do not form its subtree", target);
            return false;
        }
        let parent = match self.nodes.get(&parent_id) {
            Some(parent) => parent,
            None => return false,
        };
        let is_child = !target.is_background() && !target.is_overlay();
        if is_child && !registry.resolve(&parent.kind).is_container() {
            tracing::warn!("rejecting insert of {}: {} cannot hold children", target, parent.kind);
            return false;
        }

        // an id that is still present belongs to a stale subtree
        if self.nodes.contains_key(target) {
            self.repoint(target, None);
            self.drop_subtree(target);
        }
        self.nodes
            .extend(nodes.iter().map(|node| (node.id.clone(), node.clone())));

        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            if target.is_background() {
                parent.background_ref = Some(new_root);
            } else if target.is_overlay() {
                parent.overlay_ref = Some(new_root);
            } else {
                let children = parent.children.get_or_insert_with(Vec::new);
                let index = index.min(children.len());
                children.insert(index, new_root);
            }
        }
        true
    }

    fn remove(&mut self, target: &NodeId) -> bool {
        if *target == self.root {
            tracing::warn!("ignoring removal of the root node");
            return false;
        }
        if !self.nodes.contains_key(target) {
            return false;
        }
        self.repoint(target, None);
        self.drop_subtree(target);
        true
    }

    /// Replaces or clears the parent's reference to `id`.
    fn repoint(&mut self, id: &NodeId, to: Option<NodeId>) {
        let parent = match id.parent().and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent) => parent,
            None => return,
        };

        for slot in [&mut parent.background_ref, &mut parent.overlay_ref] {
            if slot.as_ref() == Some(id) {
                *slot = to.clone();
                return;
            }
        }

        if let Some(children) = parent.children.as_mut() {
            match to {
                Some(to) => {
                    for child in children.iter_mut().filter(|child| *child == id) {
                        *child = to.clone();
                    }
                }
                None => children.retain(|child| child != id),
            }
        }
    }
}

/// Whether `nodes` describe a subtree under `root`: unique ids, none outside `root`, and every
/// reference pointing exactly one level down. The last rule also rules out cycles.
fn is_subtree(root: &NodeId, nodes: &[Node]) -> bool {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes.iter().all(|node| {
        node.id.is_within(root)
            && seen.insert(&node.id)
            && node
                .owned()
                .all(|owned| owned.parent().as_ref() == Some(&node.id))
    })
}

/// Computes the patches that turn `old` into `new`.
///
/// Nodes are matched by id. A node whose kind, animation, or auxiliary slots changed is replaced
/// wholesale; otherwise its properties and modifiers are diffed and its child list is trimmed or
/// extended at the tail.
pub fn diff(old: &Tree, new: &Tree) -> Vec<Patch> {
    let mut patches = Vec::new();

    if old.root != new.root {
        patches.push(Patch::Replace {
            target_id: old.root.clone(),
            nodes: new.subtree(&new.root),
        });
        return patches;
    }

    let mut stack = vec![new.root.clone()];
    while let Some(id) = stack.pop() {
        let (before, after) = match (old.get(&id), new.get(&id)) {
            (Some(before), Some(after)) => (before, after),
            _ => continue,
        };

        if needs_replace(before, after) {
            patches.push(Patch::Replace {
                target_id: id.clone(),
                nodes: new.subtree(&id),
            });
            continue;
        }

        let props = diff_props(&before.props, &after.props);
        if !props.is_empty() {
            patches.push(Patch::Props {
                target_id: id.clone(),
                props,
            });
        }
        if before.modifiers != after.modifiers {
            patches.push(Patch::Modifiers {
                target_id: id.clone(),
                modifiers: after.modifiers.clone(),
            });
        }

        let (old_children, new_children) = (before.children(), after.children());
        let common = old_children.len().min(new_children.len());

        for stale in old_children[common..].iter().rev() {
            patches.push(Patch::Remove {
                target_id: stale.clone(),
            });
        }
        for added in &new_children[common..] {
            patches.extend(Patch::insert(new.subtree(added)));
        }

        let mut next = Vec::new();
        for (was, is) in old_children[..common].iter().zip(&new_children[..common]) {
            if was == is {
                next.push(is.clone());
            } else {
                patches.push(Patch::Replace {
                    target_id: was.clone(),
                    nodes: new.subtree(is),
                });
            }
        }
        next.extend(after.background_ref.iter().cloned());
        next.extend(after.overlay_ref.iter().cloned());
        stack.extend(next.into_iter().rev());
    }

    patches
}

fn needs_replace(before: &Node, after: &Node) -> bool {
    before.kind != after.kind
        || before.animation != after.animation
        || before.children.is_some() != after.children.is_some()
        || before.background_ref != after.background_ref
        || before.overlay_ref != after.overlay_ref
}

fn diff_props(before: &Props, after: &Props) -> Props {
    let mut delta = Props::new();
    for (key, value) in after {
        if before.get(key) != Some(value) {
            delta.insert(key.clone(), value.clone());
        }
    }
    for key in before.keys() {
        if !after.contains_key(key) {
            delta.insert(key.clone(), Value::Nil);
        }
    }
    delta
}
