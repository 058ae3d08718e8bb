//! The logic-process side of perch.
//!
//! A [`View`] describes the UI as a tree of [`Element`]s with handlers attached. A [`Host`] keeps a
//! renderer process in sync with it: every call to [`Context::request_render`] schedules one
//! rebuild, the result is flattened, and either the whole tree or its difference to the previous
//! one is sent. Events coming back from the renderer are routed to the handlers of the most recent
//! build.
//!
//! ```no_run
//! use perch::{Element, Host, HostConfig};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let count = Arc::new(AtomicUsize::new(0));
//! let view = move || {
//!     let count = Arc::clone(&count);
//!     let label = format!("clicked {} times", count.load(Ordering::SeqCst));
//!     Element::container("column")
//!         .child(Element::new("text").prop("text", label))
//!         .child(Element::new("button").prop("title", "+1").on_tap(move |cx| {
//!             count.fetch_add(1, Ordering::SeqCst);
//!             cx.request_render();
//!         }))
//! };
//!
//! let host = Host::connect(view, HostConfig::standard()).unwrap();
//! host.run().unwrap();
//! ```
//!
//! The protocol itself, and the renderer side of it, live in [`perch_core`].

mod config;
mod context;
mod element;
mod error;
pub mod events;
mod host;
mod router;
mod scheduler;
mod view;

pub use config::{HostConfig, Strategy};
pub use context::Context;
pub use element::Element;
pub use error::{HostError, Result};
pub use events::Handler;
pub use host::Host;
pub use perch_core;
pub use perch_core::{EventKind, Modifier, NodeId, Value};
pub use router::EventRouter;
pub use scheduler::{RenderScheduler, RenderSignal};
pub use view::{Menu, Scene, View};
