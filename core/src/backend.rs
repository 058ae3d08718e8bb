//! Traits for backends.

use crate::message::SceneConfig;
use crate::patch::Patch;
use crate::tree::Tree;
use rmpv::Value;

/// The native presentation layer a [`Renderer`](crate::Renderer) keeps up to date.
///
/// The renderer owns the authoritative tree; a backend only observes it after each change.
pub trait Backend {
    /// The tree was replaced wholesale by a full render.
    fn tree_replaced(&mut self, tree: &Tree, scene: &SceneConfig);

    /// Patches were applied to the tree.
    ///
    /// `patches` holds only the patches that matched a node, in application order.
    fn tree_patched(&mut self, tree: &Tree, patches: &[Patch]) {
        let _ = (tree, patches);
    }

    /// A message type the core does not interpret (clipboard, notifications, dialogs, ...).
    fn message(&mut self, kind: &str, payload: &Value) {
        let _ = payload;
        tracing::debug!("backend ignores `{}` message", kind);
    }

    /// The logic process asked the renderer to shut down.
    fn quit(&mut self) {}
}
