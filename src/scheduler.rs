//! Render scheduling.
//!
//! Render requests set a single-slot flag; the scheduler thread waits on it, clears it, builds the
//! view once, and transmits the result. Requests made while a build is in progress set the flag
//! again and cause exactly one more build, so no request is lost and none causes more than one
//! build. After each transmission the scheduler pauses for the configured interval, which caps the
//! render rate during bursts.

use crate::config::{HostConfig, Strategy};
use crate::router::EventRouter;
use crate::view::{build, Build, View};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use crossbeam::select;
use perch_core::{
    diff, FlatTree, Message, MessageSink, PatchPayload, RenderPayload, SceneConfig,
    TransportError, Tree,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// The sending side of the render flag.
#[derive(Clone, Debug)]
pub struct RenderSignal {
    wake: Sender<()>,
}

impl RenderSignal {
    /// A signal and the receiver the scheduler waits on.
    pub fn new() -> (RenderSignal, Receiver<()>) {
        let (wake, waiting) = channel::bounded(1);
        (RenderSignal { wake }, waiting)
    }

    /// Sets the flag. Never blocks.
    pub fn request(&self) {
        match self.wake.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => (),
            Err(TrySendError::Disconnected(())) => {
                tracing::trace!("render requested after the scheduler stopped")
            }
        }
    }
}

/// Builds the view and transmits it whenever the render flag is set.
pub struct RenderScheduler<V> {
    view: V,
    wake: Receiver<()>,
    stop: Receiver<()>,
    sink: Arc<dyn MessageSink>,
    router: Arc<EventRouter>,
    interval: Duration,
    depth_limit: usize,
    strategy: Strategy,
    /// The last transmitted tree, for diffing.
    last: Option<(Tree, SceneConfig)>,
}

impl<V: View> RenderScheduler<V> {
    pub fn new(
        view: V,
        wake: Receiver<()>,
        stop: Receiver<()>,
        sink: Arc<dyn MessageSink>,
        router: Arc<EventRouter>,
        config: &HostConfig,
    ) -> RenderScheduler<V> {
        RenderScheduler {
            view,
            wake,
            stop,
            sink,
            router,
            interval: config.render_interval,
            depth_limit: config.depth_limit,
            strategy: config.strategy,
            last: None,
        }
    }

    /// Runs until stopped (`Ok`) or until a transmission fails (`Err`).
    pub fn run(mut self) -> Result<(), TransportError> {
        loop {
            select! {
                recv(self.wake) -> woke => {
                    if woke.is_err() {
                        return Ok(());
                    }
                }
                recv(self.stop) -> _ => {
                    tracing::debug!("render loop stopped");
                    return Ok(());
                }
            }
            // select picks at random when both are ready
            if self.stopping() {
                tracing::debug!("render loop stopped");
                return Ok(());
            }

            self.render()?;
            if !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }
    }

    /// Builds once if the flag is set, without waiting. Returns whether a build ran.
    pub fn poll(&mut self) -> Result<bool, TransportError> {
        match self.wake.try_recv() {
            Ok(()) => {
                self.render()?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Builds the view and transmits it.
    ///
    /// A build that fails is logged and discarded: nothing is sent, and the handlers and tree of
    /// the previous build stay in effect.
    pub fn render(&mut self) -> Result<(), TransportError> {
        let Build {
            tree,
            scene,
            handlers,
        } = match build(&self.view, self.depth_limit) {
            Ok(build) => build,
            Err(err) => {
                tracing::error!("discarding build: {}", err);
                return Ok(());
            }
        };
        tracing::trace!("built {} nodes, {} handlers", tree.nodes.len(), handlers.len());

        let message = self.transmission(tree, scene);
        // installed first so that no event for the new tree can find the old handlers
        self.router.install(handlers);
        if self.stopping() {
            tracing::debug!("not sending a build made while stopping");
            return Ok(());
        }
        match message {
            Some(message) => self.sink.send(&message),
            None => Ok(()),
        }
    }

    /// Whether a stop is pending. Leaves it pending for `run` to observe.
    fn stopping(&self) -> bool {
        !self.stop.is_empty()
    }

    fn transmission(&mut self, flat: FlatTree, scene: SceneConfig) -> Option<Message> {
        if self.strategy == Strategy::Full {
            return Some(Message::Render(RenderPayload::new(flat, scene)));
        }

        let tree = match Tree::from_flat(flat.clone()) {
            Ok(tree) => tree,
            Err(err) => {
                tracing::warn!("cannot diff build, sending it whole: {}", err);
                self.last = None;
                return Some(Message::Render(RenderPayload::new(flat, scene)));
            }
        };

        let message = match &self.last {
            Some((last, last_scene))
                if *last_scene == scene && last.root_id() == tree.root_id() =>
            {
                let patches = diff(last, &tree);
                if patches.is_empty() {
                    tracing::trace!("build unchanged");
                    None
                } else {
                    Some(Message::Patch(PatchPayload { patches }))
                }
            }
            _ => Some(Message::Render(RenderPayload::new(flat, scene.clone()))),
        };
        self.last = Some((tree, scene));
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::element::Element;
    use crate::view::Scene;
    use parking_lot::Mutex;
    use perch_core::{EventKind, EventMessage, NodeId, Patch, Value};

    #[derive(Clone, Default)]
    struct Model {
        depth: usize,
        label: String,
        title: String,
    }

    struct Chain(Arc<Mutex<Model>>);

    impl View for Chain {
        fn body(&self) -> Element {
            let model = self.0.lock();
            let mut element = Element::new("text")
                .prop("text", model.label.as_str())
                .on_tap(|_| {});
            for _ in 1..model.depth.max(1) {
                element = Element::container("stack").child(element);
            }
            element
        }

        fn scene(&self) -> Scene {
            Scene::new().title(self.0.lock().title.clone())
        }
    }

    struct Harness {
        model: Arc<Mutex<Model>>,
        signal: RenderSignal,
        router: Arc<EventRouter>,
        sent: Receiver<Message>,
        _stop: Sender<()>,
        scheduler: RenderScheduler<Chain>,
    }

    fn harness(strategy: Strategy, depth: usize) -> Harness {
        let model = Arc::new(Mutex::new(Model {
            depth,
            label: "a".into(),
            title: "t".into(),
        }));
        let (signal, wake) = RenderSignal::new();
        let (stop_tx, stop) = channel::bounded(1);
        let (sink, sent) = channel::unbounded();
        let router = Arc::new(EventRouter::new());
        let config = HostConfig::testing().with_strategy(strategy);
        let scheduler = RenderScheduler::new(
            Chain(Arc::clone(&model)),
            wake,
            stop,
            Arc::new(sink),
            Arc::clone(&router),
            &config,
        );
        Harness {
            model,
            signal,
            router,
            sent,
            _stop: stop_tx,
            scheduler,
        }
    }

    fn deepest(depth: usize) -> NodeId {
        let mut id = NodeId::root();
        for _ in 1..depth {
            id = id.child(0);
        }
        id
    }

    #[test]
    fn requests_coalesce() {
        let mut h = harness(Strategy::Full, 1);
        h.signal.request();
        h.signal.request();
        h.signal.request();
        assert!(h.scheduler.poll().unwrap());
        assert!(!h.scheduler.poll().unwrap());
        assert_eq!(h.sent.try_iter().count(), 1);

        // a request that arrives after the flag was cleared is not lost
        h.signal.request();
        assert!(h.scheduler.poll().unwrap());
        assert_eq!(h.sent.try_iter().count(), 1);
    }

    #[test]
    fn too_deep_builds_send_nothing() {
        let mut h = harness(Strategy::Full, 5);
        h.scheduler.render().unwrap();
        assert_eq!(h.sent.try_iter().count(), 1);
        assert_eq!(h.router.kinds(&deepest(5)), [EventKind::Tap]);

        h.model.lock().depth = 101;
        h.scheduler.render().unwrap();
        assert_eq!(h.sent.try_iter().count(), 0);
        // the previous build's handlers are still installed
        assert_eq!(h.router.kinds(&deepest(5)), [EventKind::Tap]);
        assert!(h.router.kinds(&deepest(101)).is_empty());

        h.model.lock().depth = 100;
        h.scheduler.render().unwrap();
        match h.sent.try_recv().unwrap() {
            Message::Render(payload) => assert_eq!(payload.nodes.len(), 100),
            other => panic!("expected a render, got {:?}", other),
        }
        assert_eq!(h.router.kinds(&deepest(100)), [EventKind::Tap]);
    }

    #[test]
    fn handlers_follow_the_latest_build() {
        let mut h = harness(Strategy::Full, 2);
        h.scheduler.render().unwrap();
        h.model.lock().depth = 3;
        h.scheduler.render().unwrap();

        let cx = Context::detached();
        let tap = |id: NodeId| EventMessage::new(id, EventKind::Tap, None);
        assert!(!h.router.dispatch(&cx, &tap(deepest(2))));
        assert!(h.router.dispatch(&cx, &tap(deepest(3))));
    }

    #[test]
    fn full_strategy_always_renders() {
        let mut h = harness(Strategy::Full, 2);
        h.scheduler.render().unwrap();
        h.scheduler.render().unwrap();
        let sent: Vec<_> = h.sent.try_iter().collect();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| matches!(m, Message::Render(_))));
    }

    #[test]
    fn patch_strategy_sends_differences() {
        let mut h = harness(Strategy::Patch, 2);
        h.scheduler.render().unwrap();
        assert!(matches!(h.sent.try_recv(), Ok(Message::Render(_))));

        // unchanged
        h.scheduler.render().unwrap();
        assert!(h.sent.try_recv().is_err());

        h.model.lock().label = "b".into();
        h.scheduler.render().unwrap();
        match h.sent.try_recv().unwrap() {
            Message::Patch(payload) => assert_eq!(
                payload.patches,
                [Patch::Props {
                    target_id: "root.0".into(),
                    props: [("text".to_string(), Value::from("b"))].into_iter().collect(),
                }]
            ),
            other => panic!("expected a patch, got {:?}", other),
        }

        // scene changes need a full render
        h.model.lock().title = "u".into();
        h.scheduler.render().unwrap();
        match h.sent.try_recv().unwrap() {
            Message::Render(payload) => assert_eq!(payload.window.title, "u"),
            other => panic!("expected a render, got {:?}", other),
        }
    }

    #[test]
    fn run_stops_on_signal() {
        let h = harness(Strategy::Full, 1);
        let (stop_tx, stop) = channel::bounded(1);
        let mut scheduler = h.scheduler;
        scheduler.stop = stop;
        let thread = thread::spawn(move || scheduler.run());

        h.signal.request();
        let first = h.sent.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(first, Message::Render(_)));
        stop_tx.send(()).unwrap();
        assert!(thread.join().unwrap().is_ok());
    }

    #[test]
    fn stop_wins_over_a_pending_request() {
        for _ in 0..20 {
            let h = harness(Strategy::Full, 1);
            let (stop_tx, stop) = channel::bounded(1);
            let mut scheduler = h.scheduler;
            scheduler.stop = stop;

            h.signal.request();
            stop_tx.send(()).unwrap();
            assert!(scheduler.run().is_ok());
            assert!(h.sent.try_recv().is_err());
        }
    }

    #[test]
    fn builds_finished_after_a_stop_are_not_sent() {
        let mut h = harness(Strategy::Full, 1);
        let (stop_tx, stop) = channel::bounded(1);
        h.scheduler.stop = stop;
        stop_tx.send(()).unwrap();

        h.scheduler.render().unwrap();
        assert!(h.sent.try_recv().is_err());
        // the handlers of the build are still current
        assert_eq!(h.router.kinds(&NodeId::root()), [EventKind::Tap]);
    }

    #[test]
    fn send_failure_is_terminal() {
        let mut h = harness(Strategy::Full, 1);
        drop(h.sent);
        h.signal.request();
        assert!(matches!(h.scheduler.poll(), Err(TransportError::Closed)));
    }
}
