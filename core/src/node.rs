//! Nodes and node ids.

use rmpv::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property and argument maps.
pub type Props = BTreeMap<String, Value>;

/// A hierarchical node id.
///
/// The root is always [`NodeId::ROOT`]; child `k` of `P` is `P.k`. Background and overlay nodes
/// hang off their owner as `P.bg` and `P.ov`, so they never shift the child indices.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub const ROOT: &'static str = "root";
    const BACKGROUND: &'static str = "bg";
    const OVERLAY: &'static str = "ov";

    pub fn root() -> NodeId {
        NodeId(Self::ROOT.to_string())
    }

    pub fn child(&self, index: usize) -> NodeId {
        NodeId(format!("{}.{}", self.0, index))
    }

    pub fn background(&self) -> NodeId {
        NodeId(format!("{}.{}", self.0, Self::BACKGROUND))
    }

    pub fn overlay(&self) -> NodeId {
        NodeId(format!("{}.{}", self.0, Self::OVERLAY))
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    /// The id with its last path segment stripped, or None for single-segment ids.
    pub fn parent(&self) -> Option<NodeId> {
        self.0.rfind('.').map(|pos| NodeId(self.0[..pos].to_string()))
    }

    /// The last path segment.
    pub fn last_segment(&self) -> &str {
        match self.0.rfind('.') {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    /// The child index encoded in the last segment, if it is one.
    pub fn index(&self) -> Option<usize> {
        if self.parent().is_none() {
            return None;
        }
        self.last_segment().parse().ok()
    }

    pub fn is_background(&self) -> bool {
        self.parent().is_some() && self.last_segment() == Self::BACKGROUND
    }

    pub fn is_overlay(&self) -> bool {
        self.parent().is_some() && self.last_segment() == Self::OVERLAY
    }

    /// Whether this id is `ancestor` or lies somewhere below it.
    pub fn is_within(&self, ancestor: &NodeId) -> bool {
        match self.0.strip_prefix(ancestor.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }

    /// Number of path segments; the root has depth 1.
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> NodeId {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> NodeId {
        NodeId(id)
    }
}

/// A styling instruction; applied in list order by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub kind: String,
    #[serde(default)]
    pub args: Props,
}

impl Modifier {
    pub fn new(kind: impl Into<String>) -> Modifier {
        Modifier {
            kind: kind.into(),
            args: Props::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Modifier {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// Animation parameters for changes under a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationContext {
    pub curve: String,
    pub duration_ms: u32,
}

/// One flattened UI element, as held in a tree and sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// The native widget class tag.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub props: Props,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_ref: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_ref: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationContext>,
}

impl Node {
    pub fn new(id: NodeId, kind: impl Into<String>) -> Node {
        Node {
            id,
            kind: kind.into(),
            props: Props::new(),
            modifiers: Vec::new(),
            children: None,
            background_ref: None,
            overlay_ref: None,
            animation: None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Ids of every node directly owned by this one: children, then background, then overlay.
    pub fn owned(&self) -> impl Iterator<Item = &NodeId> {
        self.children()
            .iter()
            .chain(self.background_ref.iter())
            .chain(self.overlay_ref.iter())
    }
}

/// A tree in its flat wire form: pre-order node list plus the root id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatTree {
    pub root_id: NodeId,
    pub nodes: Vec<Node>,
}

/// A tree in nested form.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedNode {
    pub id: NodeId,
    pub kind: String,
    pub props: Props,
    pub modifiers: Vec<Modifier>,
    /// `None` for leaf widgets that cannot hold children.
    pub children: Option<Vec<NestedNode>>,
    pub background: Option<Box<NestedNode>>,
    pub overlay: Option<Box<NestedNode>>,
    pub animation: Option<AnimationContext>,
}

impl NestedNode {
    /// A childless node; its id is assigned when the tree is flattened.
    pub fn new(kind: impl Into<String>) -> NestedNode {
        NestedNode {
            id: NodeId::root(),
            kind: kind.into(),
            props: Props::new(),
            modifiers: Vec::new(),
            children: None,
            background: None,
            overlay: None,
            animation: None,
        }
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> NestedNode {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn modifier(mut self, modifier: Modifier) -> NestedNode {
        self.modifiers.push(modifier);
        self
    }

    pub fn child(mut self, child: NestedNode) -> NestedNode {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn background(mut self, node: NestedNode) -> NestedNode {
        self.background = Some(Box::new(node));
        self
    }

    pub fn overlay(mut self, node: NestedNode) -> NestedNode {
        self.overlay = Some(Box::new(node));
        self
    }

    pub fn animation(mut self, animation: AnimationContext) -> NestedNode {
        self.animation = Some(animation);
        self
    }
}
