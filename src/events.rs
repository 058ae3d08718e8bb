//! Event handlers.
//!
//! The renderer reports every interaction as a `"kind:value"` string. What the value means depends
//! on the handler that was registered: a text field's `change` carries a string, a slider's
//! `slide` a number, a drop target's `drop` a comma-separated path list, and so on. A [`Handler`]
//! knows its signature and parses the value before calling into user code; a value that does not
//! fit is an error and the user callback is never reached.

use crate::context::Context;
use cgmath::Point2;
use core::fmt;
use parking_lot::Mutex;
use perch_core::{EventError, EventKind};
use std::path::PathBuf;
use std::sync::Arc;

/// A shared callback taking an argument of type `T`.
pub struct EventHandler<T>(Arc<Mutex<dyn FnMut(&Context, T) + Send>>);

impl<T> Clone for EventHandler<T> {
    fn clone(&self) -> Self {
        EventHandler(Arc::clone(&self.0))
    }
}

impl<T> EventHandler<T> {
    pub fn new<F: 'static + FnMut(&Context, T) + Send>(handler: F) -> Self {
        EventHandler(Arc::new(Mutex::new(handler)))
    }

    fn call(&self, cx: &Context, arg: T) {
        let mut handler = self.0.lock();
        (*handler)(cx, arg)
    }
}

/// An event handler together with the argument its value is parsed into.
#[derive(Clone)]
pub enum Handler {
    /// No argument; any value is ignored.
    Tap(EventHandler<()>),
    /// The raw value, e.g. a text field's contents.
    Text(EventHandler<String>),
    /// `true`/`false` (or `1`/`0`).
    Toggle(EventHandler<bool>),
    /// A decimal number.
    Slide(EventHandler<f64>),
    /// Comma-separated file paths.
    Drop(EventHandler<Vec<PathBuf>>),
    /// An `x,y` location.
    Pointer(EventHandler<Point2<f64>>),
}

impl Handler {
    pub fn tap<F: 'static + FnMut(&Context) + Send>(mut f: F) -> Handler {
        Handler::Tap(EventHandler::new(move |cx: &Context, ()| f(cx)))
    }

    pub fn text<F: 'static + FnMut(&Context, String) + Send>(f: F) -> Handler {
        Handler::Text(EventHandler::new(f))
    }

    pub fn toggle<F: 'static + FnMut(&Context, bool) + Send>(f: F) -> Handler {
        Handler::Toggle(EventHandler::new(f))
    }

    pub fn slide<F: 'static + FnMut(&Context, f64) + Send>(f: F) -> Handler {
        Handler::Slide(EventHandler::new(f))
    }

    pub fn drop<F: 'static + FnMut(&Context, Vec<PathBuf>) + Send>(f: F) -> Handler {
        Handler::Drop(EventHandler::new(f))
    }

    pub fn pointer<F: 'static + FnMut(&Context, Point2<f64>) + Send>(f: F) -> Handler {
        Handler::Pointer(EventHandler::new(f))
    }

    /// Parses `value` for this handler's signature and calls it.
    ///
    /// The callback runs only if parsing succeeded.
    pub fn invoke(&self, cx: &Context, kind: EventKind, value: Option<&str>) -> Result<(), EventError> {
        match self {
            Handler::Tap(handler) => handler.call(cx, ()),
            Handler::Text(handler) => handler.call(cx, required(kind, value)?.to_string()),
            Handler::Toggle(handler) => {
                let value = required(kind, value)?;
                let on = match value {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    _ => return Err(invalid(kind, value)),
                };
                handler.call(cx, on);
            }
            Handler::Slide(handler) => {
                let value = required(kind, value)?;
                let number = value.trim().parse().map_err(|_| invalid(kind, value))?;
                handler.call(cx, number);
            }
            Handler::Drop(handler) => {
                let paths = required(kind, value)?
                    .split(',')
                    .filter(|path| !path.is_empty())
                    .map(PathBuf::from)
                    .collect();
                handler.call(cx, paths);
            }
            Handler::Pointer(handler) => {
                let value = required(kind, value)?;
                let point = parse_point(value).ok_or_else(|| invalid(kind, value))?;
                handler.call(cx, point);
            }
        }
        Ok(())
    }

    fn signature(&self) -> &'static str {
        match self {
            Handler::Tap(_) => "()",
            Handler::Text(_) => "String",
            Handler::Toggle(_) => "bool",
            Handler::Slide(_) => "f64",
            Handler::Drop(_) => "Vec<PathBuf>",
            Handler::Pointer(_) => "Point2<f64>",
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handler<{}>", self.signature())
    }
}

fn required(kind: EventKind, value: Option<&str>) -> Result<&str, EventError> {
    value.ok_or_else(|| EventError::MissingValue(kind.to_string()))
}

fn invalid(kind: EventKind, value: &str) -> EventError {
    EventError::InvalidValue {
        kind: kind.to_string(),
        value: value.to_string(),
    }
}

fn parse_point(value: &str) -> Option<Point2<f64>> {
    let (x, y) = value.split_once(',')?;
    Some(Point2::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn recorded<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl FnMut(&Context, T) + Send) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |_: &Context, value| sink.lock().push(value))
    }

    #[test]
    fn tap_ignores_its_value() {
        let cx = Context::detached();
        let count = Arc::new(Mutex::new(0));
        let handler = Handler::tap({
            let count = Arc::clone(&count);
            move |_| *count.lock() += 1
        });
        handler.invoke(&cx, EventKind::Tap, None).unwrap();
        handler.invoke(&cx, EventKind::Tap, Some("junk")).unwrap();
        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn parses_typed_values() {
        let cx = Context::detached();

        let (texts, f) = recorded::<String>();
        Handler::text(f)
            .invoke(&cx, EventKind::Change, Some("a:b"))
            .unwrap();
        assert_eq!(*texts.lock(), ["a:b"]);

        let (toggles, f) = recorded::<bool>();
        let toggle = Handler::toggle(f);
        toggle.invoke(&cx, EventKind::Toggle, Some("true")).unwrap();
        toggle.invoke(&cx, EventKind::Toggle, Some("0")).unwrap();
        assert_eq!(*toggles.lock(), [true, false]);

        let (slides, f) = recorded::<f64>();
        Handler::slide(f)
            .invoke(&cx, EventKind::Slide, Some("0.5"))
            .unwrap();
        assert_eq!(*slides.lock(), [0.5]);

        let (drops, f) = recorded::<Vec<PathBuf>>();
        Handler::drop(f)
            .invoke(&cx, EventKind::Drop, Some("/a/b.txt,/c"))
            .unwrap();
        assert_eq!(
            *drops.lock(),
            [vec![PathBuf::from("/a/b.txt"), PathBuf::from("/c")]]
        );

        let (points, f) = recorded::<Point2<f64>>();
        Handler::pointer(f)
            .invoke(&cx, EventKind::Drag, Some("12.5, -3"))
            .unwrap();
        assert_eq!(*points.lock(), [Point2::new(12.5, -3.0)]);
    }

    #[test]
    fn malformed_values_never_reach_the_callback() {
        let cx = Context::detached();
        let (slides, f) = recorded::<f64>();
        let slide = Handler::slide(f);
        assert_eq!(
            slide.invoke(&cx, EventKind::Slide, Some("abc")),
            Err(EventError::InvalidValue {
                kind: "slide".into(),
                value: "abc".into(),
            })
        );
        assert_eq!(
            slide.invoke(&cx, EventKind::Slide, None),
            Err(EventError::MissingValue("slide".into()))
        );
        assert!(slides.lock().is_empty());

        let (toggles, f) = recorded::<bool>();
        assert!(Handler::toggle(f)
            .invoke(&cx, EventKind::Toggle, Some("maybe"))
            .is_err());
        assert!(toggles.lock().is_empty());

        let (points, f) = recorded::<Point2<f64>>();
        assert!(Handler::pointer(f)
            .invoke(&cx, EventKind::Hover, Some("1"))
            .is_err());
        assert!(points.lock().is_empty());
    }
}
