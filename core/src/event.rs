//! Interaction events as they travel from the renderer to the logic process.
//!
//! On the wire an event is just a node id and a `"kind:value"` string; what the value means is
//! decided by the handler registered on the logic side.

use crate::error::EventError;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of interaction events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Tap,
    LongPress,
    Change,
    Submit,
    Toggle,
    Slide,
    Drop,
    Drag,
    Hover,
}

impl EventKind {
    // smallest and largest values in Ord
    pub const MIN: Self = EventKind::Tap;
    pub const MAX: Self = EventKind::Hover;

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Tap => "tap",
            EventKind::LongPress => "long_press",
            EventKind::Change => "change",
            EventKind::Submit => "submit",
            EventKind::Toggle => "toggle",
            EventKind::Slide => "slide",
            EventKind::Drop => "drop",
            EventKind::Drag => "drag",
            EventKind::Hover => "hover",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<EventKind, EventError> {
        Ok(match s {
            "tap" => EventKind::Tap,
            "long_press" => EventKind::LongPress,
            "change" => EventKind::Change,
            "submit" => EventKind::Submit,
            "toggle" => EventKind::Toggle,
            "slide" => EventKind::Slide,
            "drop" => EventKind::Drop,
            "drag" => EventKind::Drag,
            "hover" => EventKind::Hover,
            other => return Err(EventError::UnknownKind(other.to_string())),
        })
    }
}

/// The payload of an `event` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    pub node_id: NodeId,
    pub event: String,
}

impl EventMessage {
    pub fn new(node_id: NodeId, kind: EventKind, value: Option<&str>) -> EventMessage {
        let event = match value {
            Some(value) => format!("{}:{}", kind, value),
            None => kind.to_string(),
        };
        EventMessage { node_id, event }
    }

    /// Splits the event string into its kind and raw value.
    ///
    /// Only the first `:` separates; the value may contain more of them.
    pub fn parse(&self) -> Result<(EventKind, Option<&str>), EventError> {
        match self.event.split_once(':') {
            Some((kind, value)) => Ok((kind.parse()?, Some(value))),
            None => Ok((self.event.parse()?, None)),
        }
    }
}
