//! Routing inbound events to handlers.

use crate::context::Context;
use crate::events::Handler;
use parking_lot::Mutex;
use perch_core::{EventKind, EventMessage, NodeId};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

type HandlerId = (NodeId, EventKind);

/// Handlers of one build, keyed by node and event kind.
#[derive(Debug, Default)]
pub(crate) struct Handlers {
    map: BTreeMap<HandlerId, Handler>,
}

impl Handlers {
    pub(crate) fn new() -> Handlers {
        Handlers {
            map: BTreeMap::new(),
        }
    }

    pub(crate) fn add(&mut self, node: NodeId, kind: EventKind, handler: Handler) {
        if self.map.insert((node, kind), handler).is_some() {
            tracing::debug!("replacing duplicate {} handler", kind);
        }
    }

    pub(crate) fn get(&self, node: &NodeId, kind: EventKind) -> Option<&Handler> {
        self.map.get(&(node.clone(), kind))
    }

    /// Every event kind with a handler on `node`.
    pub(crate) fn kinds(&self, node: &NodeId) -> Vec<EventKind> {
        self.map
            .range((node.clone(), EventKind::MIN)..=(node.clone(), EventKind::MAX))
            .map(|((_, kind), _)| *kind)
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Looks up and invokes the handler for each inbound event.
///
/// The handler set is swapped wholesale after every successful build, so an event always reaches
/// the handler of the most recently transmitted tree. Events for ids or kinds without a handler,
/// and events whose value does not fit the handler, are logged and dropped.
#[derive(Debug, Default)]
pub struct EventRouter {
    handlers: Mutex<Handlers>,
}

impl EventRouter {
    pub fn new() -> EventRouter {
        EventRouter::default()
    }

    /// Replaces all handlers with those of a new build.
    pub(crate) fn install(&self, handlers: Handlers) {
        *self.handlers.lock() = handlers;
    }

    /// Number of installed handlers.
    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }

    /// Event kinds currently handled for `node`.
    pub fn kinds(&self, node: &NodeId) -> Vec<EventKind> {
        self.handlers.lock().kinds(node)
    }

    /// Delivers one event. Returns whether a handler ran.
    pub fn dispatch(&self, cx: &Context, event: &EventMessage) -> bool {
        let (kind, value) = match event.parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("dropping event for {}: {}", event.node_id, err);
                return false;
            }
        };

        // the map lock is released before user code runs, so a handler may trigger a rebuild
        let handler = match self.handlers.lock().get(&event.node_id, kind) {
            Some(handler) => handler.clone(),
            None => {
                tracing::debug!("no {} handler for {}; dropping", kind, event.node_id);
                return false;
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(cx, kind, value))) {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                tracing::warn!("dropping {} event for {}: {}", kind, event.node_id, err);
                false
            }
            Err(_) => {
                tracing::error!("{} handler for {} panicked", kind, event.node_id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn event(id: &str, event: &str) -> EventMessage {
        EventMessage {
            node_id: id.into(),
            event: event.into(),
        }
    }

    fn counting(count: &Arc<Mutex<Vec<f64>>>) -> Handler {
        let count = Arc::clone(count);
        Handler::slide(move |_, value| count.lock().push(value))
    }

    #[test]
    fn dispatches_to_the_registered_handler() {
        let cx = Context::detached();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let router = EventRouter::new();
        let mut handlers = Handlers::new();
        handlers.add("root.2".into(), EventKind::Slide, counting(&seen));
        router.install(handlers);

        assert!(router.dispatch(&cx, &event("root.2", "slide:0.75")));
        assert!(!router.dispatch(&cx, &event("root.2", "tap")));
        assert!(!router.dispatch(&cx, &event("root.3", "slide:1")));
        assert!(!router.dispatch(&cx, &event("root.2", "slide:loud")));
        assert!(!router.dispatch(&cx, &event("root.2", "wiggle:1")));
        assert_eq!(*seen.lock(), [0.75]);
    }

    #[test]
    fn install_replaces_previous_handlers() {
        let cx = Context::detached();
        let old = Arc::new(Mutex::new(Vec::new()));
        let new = Arc::new(Mutex::new(Vec::new()));
        let router = EventRouter::new();

        let mut handlers = Handlers::new();
        handlers.add("root.0".into(), EventKind::Slide, counting(&old));
        handlers.add("root.1".into(), EventKind::Slide, counting(&old));
        router.install(handlers);

        let mut handlers = Handlers::new();
        handlers.add("root.0".into(), EventKind::Slide, counting(&new));
        router.install(handlers);

        assert!(router.dispatch(&cx, &event("root.0", "slide:1")));
        assert!(!router.dispatch(&cx, &event("root.1", "slide:2")));
        assert!(old.lock().is_empty());
        assert_eq!(*new.lock(), [1.0]);
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn kinds_are_scoped_to_one_node() {
        let mut handlers = Handlers::new();
        handlers.add("root.1".into(), EventKind::Hover, Handler::pointer(|_, _| {}));
        handlers.add("root.1".into(), EventKind::Tap, Handler::tap(|_| {}));
        handlers.add("root.10".into(), EventKind::Tap, Handler::tap(|_| {}));
        handlers.add("root.1.0".into(), EventKind::Drop, Handler::drop(|_, _| {}));
        assert_eq!(handlers.kinds(&"root.1".into()), [EventKind::Tap, EventKind::Hover]);
    }

    #[test]
    fn panicking_handlers_are_contained() {
        let cx = Context::detached();
        let router = EventRouter::new();
        let mut handlers = Handlers::new();
        handlers.add("root".into(), EventKind::Tap, Handler::tap(|_| panic!("boom")));
        router.install(handlers);

        assert!(!router.dispatch(&cx, &event("root", "tap")));
        // the handler is still usable afterwards
        assert!(!router.dispatch(&cx, &event("root", "tap")));
    }
}
