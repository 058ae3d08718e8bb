use crate::scheduler::RenderSignal;
use crossbeam::channel::Sender;
use perch_core::{Message, MessageSink, TransportError, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle to one renderer connection, passed to every event handler.
///
/// Cheap to clone; all clones refer to the same connection.
#[derive(Clone)]
pub struct Context {
    signal: RenderSignal,
    sink: Arc<dyn MessageSink>,
    stop: Sender<()>,
    quitting: Arc<AtomicBool>,
}

impl Context {
    pub(crate) fn new(signal: RenderSignal, sink: Arc<dyn MessageSink>, stop: Sender<()>) -> Context {
        Context {
            signal,
            sink,
            stop,
            quitting: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Asks for the view to be rebuilt and sent.
    ///
    /// Never blocks. Any number of requests made before the scheduler gets to them result in one
    /// build.
    pub fn request_render(&self) {
        self.signal.request();
    }

    /// Sends a message the protocol does not interpret to the renderer.
    pub fn send(&self, kind: impl Into<String>, payload: Value) -> Result<(), TransportError> {
        self.sink.send(&Message::other(kind, payload))
    }

    /// Tells the renderer to exit and stops rendering.
    pub fn quit(&self) -> Result<(), TransportError> {
        if self.quitting.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::debug!("quitting");
        let _ = self.stop.try_send(());
        self.sink.send(&Message::Quit)
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    /// Stops the scheduler without telling the renderer.
    pub(crate) fn stop(&self) {
        let _ = self.stop.try_send(());
    }

    /// A context whose messages go nowhere.
    #[cfg(test)]
    pub(crate) fn detached() -> Context {
        let (signal, _) = RenderSignal::new();
        let (sink, _) = crossbeam::channel::unbounded::<Message>();
        let (stop, _) = crossbeam::channel::bounded(1);
        Context::new(signal, Arc::new(sink), stop)
    }
}
