//! Declarative UI descriptions.

use crate::context::Context;
use crate::events::Handler;
use cgmath::Point2;
use core::fmt;
use perch_core::{AnimationContext, EventKind, FlattenSource, Modifier, Props, Value};
use std::path::PathBuf;

/// One node of a view body, with the handlers attached to it.
///
/// Elements are plain values: a body is built from scratch on every render, and ids are assigned
/// by position when it is flattened.
#[derive(Clone)]
pub struct Element {
    kind: String,
    props: Props,
    modifiers: Vec<Modifier>,
    children: Option<Vec<Element>>,
    background: Option<Box<Element>>,
    overlay: Option<Box<Element>>,
    animation: Option<AnimationContext>,
    handlers: Vec<(EventKind, Handler)>,
}

impl Element {
    /// A leaf element.
    pub fn new(kind: impl Into<String>) -> Element {
        Element {
            kind: kind.into(),
            props: Props::new(),
            modifiers: Vec::new(),
            children: None,
            background: None,
            overlay: None,
            animation: None,
            handlers: Vec::new(),
        }
    }

    /// An element that can have children, starting out with none.
    pub fn container(kind: impl Into<String>) -> Element {
        let mut element = Element::new(kind);
        element.children = Some(Vec::new());
        element
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Element {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn modifier(mut self, modifier: Modifier) -> Element {
        self.modifiers.push(modifier);
        self
    }

    /// Appends a child, turning a leaf into a container if necessary.
    pub fn child(mut self, child: Element) -> Element {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Element {
        self.children.get_or_insert_with(Vec::new).extend(children);
        self
    }

    pub fn background(mut self, element: Element) -> Element {
        self.background = Some(Box::new(element));
        self
    }

    pub fn overlay(mut self, element: Element) -> Element {
        self.overlay = Some(Box::new(element));
        self
    }

    /// Animates changes to this element and its descendants.
    pub fn animation(mut self, curve: impl Into<String>, duration_ms: u32) -> Element {
        self.animation = Some(AnimationContext {
            curve: curve.into(),
            duration_ms,
        });
        self
    }

    /// Attaches a handler, replacing any earlier one for the same kind.
    pub fn on(mut self, kind: EventKind, handler: Handler) -> Element {
        self.handlers.retain(|(k, _)| *k != kind);
        self.handlers.push((kind, handler));
        self
    }

    pub fn on_tap<F: 'static + FnMut(&Context) + Send>(self, f: F) -> Element {
        self.on(EventKind::Tap, Handler::tap(f))
    }

    pub fn on_long_press<F: 'static + FnMut(&Context) + Send>(self, f: F) -> Element {
        self.on(EventKind::LongPress, Handler::tap(f))
    }

    pub fn on_change<F: 'static + FnMut(&Context, String) + Send>(self, f: F) -> Element {
        self.on(EventKind::Change, Handler::text(f))
    }

    pub fn on_submit<F: 'static + FnMut(&Context, String) + Send>(self, f: F) -> Element {
        self.on(EventKind::Submit, Handler::text(f))
    }

    pub fn on_toggle<F: 'static + FnMut(&Context, bool) + Send>(self, f: F) -> Element {
        self.on(EventKind::Toggle, Handler::toggle(f))
    }

    pub fn on_slide<F: 'static + FnMut(&Context, f64) + Send>(self, f: F) -> Element {
        self.on(EventKind::Slide, Handler::slide(f))
    }

    pub fn on_drop<F: 'static + FnMut(&Context, Vec<PathBuf>) + Send>(self, f: F) -> Element {
        self.on(EventKind::Drop, Handler::drop(f))
    }

    pub fn on_drag<F: 'static + FnMut(&Context, Point2<f64>) + Send>(self, f: F) -> Element {
        self.on(EventKind::Drag, Handler::pointer(f))
    }

    pub fn on_hover<F: 'static + FnMut(&Context, Point2<f64>) + Send>(self, f: F) -> Element {
        self.on(EventKind::Hover, Handler::pointer(f))
    }

    pub fn handlers(&self) -> &[(EventKind, Handler)] {
        &self.handlers
    }
}

impl FlattenSource for Element {
    fn kind(&self) -> &str {
        &self.kind
    }
    fn props(&self) -> &Props {
        &self.props
    }
    fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }
    fn children(&self) -> Option<&[Self]> {
        self.children.as_deref()
    }
    fn background(&self) -> Option<&Self> {
        self.background.as_deref()
    }
    fn overlay(&self) -> Option<&Self> {
        self.overlay.as_deref()
    }
    fn animation(&self) -> Option<&AnimationContext> {
        self.animation.as_ref()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kinds: Vec<_> = self.handlers.iter().map(|(kind, _)| *kind).collect();
        f.debug_struct("Element")
            .field("kind", &self.kind)
            .field("props", &self.props)
            .field("modifiers", &self.modifiers)
            .field("children", &self.children)
            .field("background", &self.background)
            .field("overlay", &self.overlay)
            .field("animation", &self.animation)
            .field("handlers", &kinds)
            .finish()
    }
}
