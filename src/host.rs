use crate::config::HostConfig;
use crate::context::Context;
use crate::error::{HostError, Result};
use crate::router::EventRouter;
use crate::scheduler::{RenderScheduler, RenderSignal};
use crate::view::View;
use crossbeam::channel;
use perch_core::{Message, MessageSink, Transport, TransportError, TransportSender, Value};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Connects a view to a renderer.
///
/// A host runs two threads: the scheduler, which rebuilds and transmits the view whenever a render
/// is requested, and the dispatcher, which hands inbound events to their handlers one at a time in
/// arrival order. Handlers therefore never run concurrently with each other, but may run while a
/// build is in progress.
pub struct Host {
    context: Context,
    router: Arc<EventRouter>,
    sender: TransportSender,
    scheduler: JoinHandle<std::result::Result<(), TransportError>>,
    dispatcher: JoinHandle<std::result::Result<(), TransportError>>,
}

impl Host {
    /// Starts serving `view` over `transport`.
    ///
    /// The first render is requested immediately.
    pub fn new<V: View>(transport: Transport, view: V, config: HostConfig) -> Result<Host> {
        Host::with_messages(transport, view, config, |_, kind, _| {
            tracing::debug!("ignoring {} message", kind)
        })
    }

    /// Like `new`, but message types the protocol does not interpret are passed to `on_message`.
    pub fn with_messages<V, F>(
        transport: Transport,
        view: V,
        config: HostConfig,
        mut on_message: F,
    ) -> Result<Host>
    where
        V: View,
        F: FnMut(&Context, &str, &Value) + Send + 'static,
    {
        let (sender, receiver) = transport.split()?;
        let (signal, wake) = RenderSignal::new();
        let (stop_tx, stop_rx) = channel::bounded(1);
        let sink: Arc<dyn MessageSink> = Arc::new(sender.clone());
        let context = Context::new(signal, Arc::clone(&sink), stop_tx);
        let router = Arc::new(EventRouter::new());

        let scheduler = RenderScheduler::new(view, wake, stop_rx, sink, Arc::clone(&router), &config);
        let scheduler = thread::Builder::new()
            .name("perch-render".to_string())
            .spawn(move || scheduler.run())?;

        let dispatcher = {
            let cx = context.clone();
            let router = Arc::clone(&router);
            receiver.on_message(move |message| {
                match message {
                    Message::Event(event) => {
                        router.dispatch(&cx, &event);
                    }
                    Message::Other { kind, payload } => on_message(&cx, &kind, &payload),
                    other => tracing::warn!("unexpected {} message from the renderer", other.kind()),
                }
                ControlFlow::Continue(())
            })
        };
        let dispatcher = match dispatcher {
            Ok(dispatcher) => dispatcher,
            Err(err) => {
                context.stop();
                sender.close();
                return Err(err.into());
            }
        };

        context.request_render();
        Ok(Host {
            context,
            router,
            sender,
            scheduler,
            dispatcher,
        })
    }

    /// Connects to a renderer listening at the configured socket path.
    pub fn connect<V: View>(view: V, config: HostConfig) -> Result<Host> {
        let transport = Transport::connect(&config.transport)?;
        Host::new(transport, view, config)
    }

    /// Waits for a renderer to connect at the configured socket path.
    pub fn listen<V: View>(view: V, config: HostConfig) -> Result<Host> {
        let transport = Transport::listen(&config.transport)?;
        Host::new(transport, view, config)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Sends `quit` to the renderer and stops rendering.
    pub fn quit(&self) -> Result<()> {
        self.context.quit().map_err(HostError::from)
    }

    /// Tears the connection down without telling the renderer.
    pub fn close(&self) {
        self.context.stop();
        self.sender.close();
    }

    /// Blocks until the connection ends.
    ///
    /// Returns `Ok` if the connection ended after [`Context::quit`], and otherwise the error that
    /// ended it.
    pub fn run(self) -> Result<()> {
        let received = join(self.dispatcher, "dispatch")?;
        // nothing can be delivered any more
        self.context.stop();
        let rendered = join(self.scheduler, "render")?;

        if self.context.is_quitting() {
            tracing::debug!("connection closed after quit");
            return Ok(());
        }
        // a failed send closes the socket, so the dispatcher's error is only a consequence
        rendered?;
        received?;
        Ok(())
    }
}

fn join<T>(handle: JoinHandle<T>, name: &'static str) -> Result<T> {
    handle.join().map_err(|_| HostError::Panicked(name))
}
