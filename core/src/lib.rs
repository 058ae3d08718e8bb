//! Protocol core.
//!
//! # Conceptual overview
//! A logic process describes its user interface as a tree of nodes; a separate renderer process
//! holds a live copy of that tree and presents it natively. This crate contains everything both
//! sides agree on, plus the renderer's half of the protocol.
//!
//! ## Nodes and ids
//! A node is a type tag, a property map, an ordered modifier list, and references to the nodes it
//! owns: its children, and optionally one background and one overlay node. Node ids are paths that
//! encode tree position: the root is `root`, child `k` of `P` is `P.k`, and the background and
//! overlay of `P` are `P.bg` and `P.ov`. Ids are recomputed on every build, so a node keeps its
//! identity across builds only as long as the tree shape above it stays the same.
//!
//! Trees are handled in two forms. The nested form ([`NestedNode`], or anything implementing
//! [`FlattenSource`]) is what builders produce; the flat form ([`FlatTree`]) is a pre-order node
//! list and is what travels over the wire. [`Tree`] is an id-keyed arena built from the flat form,
//! and is what the renderer mutates. None of the conversions recurse, since trees may be up to
//! [`DEFAULT_DEPTH_LIMIT`] levels deep.
//!
//! ## Patches
//! Instead of a full tree, the logic process may send [`Patch`]es: replace a subtree, merge
//! properties, replace modifiers, insert a subtree, or remove one. Patches are applied on a best
//! effort basis: a patch for a node that no longer exists is skipped, since it can only be a stale
//! edit that raced a newer build.
//!
//! ## Wire format
//! Messages are `{type, payload}` maps encoded as MessagePack, each preceded by a 4-byte
//! big-endian length. See [`frame`] and [`Message`]. Message types other than `render`, `patch`,
//! `event` and `quit` are carried without being interpreted.
//!
//! ## Events
//! The renderer reports interactions as a node id and a `"kind:value"` string, e.g. `change:42`
//! or `drop:/a,/b`. How the value is parsed depends on the handler the logic process registered
//! for that node.

mod backend;
mod config;
mod error;
mod event;
mod flatten;
pub mod frame;
mod message;
mod node;
mod patch;
mod registry;
mod renderer;
mod transport;
mod tree;

pub use backend::Backend;
pub use config::{TransportConfig, SOCKET_ENV};
pub use error::{BuildError, DecodeError, EventError, TransportError, TreeError};
pub use event::{EventKind, EventMessage};
pub use flatten::{flatten, flatten_with, unflatten, FlattenSource, DEFAULT_DEPTH_LIMIT};
pub use message::{
    Hotkey, MenuItem, Message, PatchPayload, RenderPayload, SceneConfig, WindowConfig,
};
pub use node::{AnimationContext, FlatTree, Modifier, NestedNode, Node, NodeId, Props};
pub use patch::{diff, Patch};
pub use registry::{Kind, KindRegistry, KindSpec};
pub use renderer::{EventEmitter, Renderer};
pub use rmpv::Value;
pub use transport::{
    MessageSink, PendingTransport, Transport, TransportReceiver, TransportSender,
};
pub use tree::{Iter, Tree};
