//! The renderer side of the protocol.

use crate::backend::Backend;
use crate::error::TransportError;
use crate::event::{EventKind, EventMessage};
use crate::message::{Message, SceneConfig};
use crate::node::NodeId;
use crate::registry::KindRegistry;
use crate::transport::{MessageSink, TransportReceiver};
use crate::tree::Tree;
use rmpv::Value;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Holds the authoritative tree and keeps a [`Backend`] in sync with the logic process.
pub struct Renderer<B> {
    tree: Option<Tree>,
    scene: SceneConfig,
    registry: KindRegistry,
    backend: B,
}

impl<B: Backend> Renderer<B> {
    pub fn new(backend: B, registry: KindRegistry) -> Renderer<B> {
        Renderer {
            tree: None,
            scene: SceneConfig::default(),
            registry,
            backend,
        }
    }

    /// The current tree; `None` until the first full render arrives.
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    pub fn scene(&self) -> &SceneConfig {
        &self.scene
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Handles one inbound message. Breaks on `quit`.
    pub fn handle(&mut self, message: Message) -> ControlFlow<()> {
        match message {
            Message::Render(payload) => {
                let (flat, scene) = payload.into_parts();
                match Tree::from_flat(flat) {
                    Ok(tree) => {
                        tracing::trace!("rendering {} nodes", tree.len());
                        self.scene = scene;
                        let tree = self.tree.insert(tree);
                        self.backend.tree_replaced(tree, &self.scene);
                    }
                    // the previous tree stays authoritative
                    Err(err) => tracing::warn!("rejecting malformed render: {}", err),
                }
            }
            Message::Patch(payload) => {
                let tree = match self.tree.as_mut() {
                    Some(tree) => tree,
                    None => {
                        tracing::debug!("dropping patch received before the first render");
                        return ControlFlow::Continue(());
                    }
                };
                let registry = &self.registry;
                let applied: Vec<_> = payload
                    .patches
                    .into_iter()
                    .filter(|patch| tree.apply(patch, registry))
                    .collect();
                if !applied.is_empty() {
                    self.backend.tree_patched(tree, &applied);
                }
            }
            Message::Event(event) => {
                tracing::warn!("renderer received an event for {}; ignoring", event.node_id);
            }
            Message::Quit => {
                self.backend.quit();
                return ControlFlow::Break(());
            }
            Message::Other { kind, payload } => self.backend.message(&kind, &payload),
        }
        ControlFlow::Continue(())
    }

    /// Processes inbound messages until `quit` (`Ok`) or a connection failure (`Err`).
    pub fn run(&mut self, receiver: &mut TransportReceiver) -> Result<(), TransportError> {
        loop {
            if self.handle(receiver.recv()?).is_break() {
                return Ok(());
            }
        }
    }
}

/// Sends interaction events and opaque messages from the renderer to the logic process.
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn MessageSink>,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn MessageSink>) -> EventEmitter {
        EventEmitter { sink }
    }

    pub fn emit(
        &self,
        node_id: NodeId,
        kind: EventKind,
        value: Option<&str>,
    ) -> Result<(), TransportError> {
        self.sink
            .send(&Message::Event(EventMessage::new(node_id, kind, value)))
    }

    /// Sends a raw `"kind:value"` event string.
    pub fn emit_raw(&self, node_id: NodeId, event: impl Into<String>) -> Result<(), TransportError> {
        self.sink.send(&Message::Event(EventMessage {
            node_id,
            event: event.into(),
        }))
    }

    pub fn forward(&self, kind: impl Into<String>, payload: Value) -> Result<(), TransportError> {
        self.sink.send(&Message::other(kind, payload))
    }
}
