//! Messages exchanged between the logic process and the renderer.
//!
//! Every message is a `{type, payload}` map. The core understands `render`, `patch`, `event` and
//! `quit`; any other type is carried through untouched as [`Message::Other`].

use crate::error::DecodeError;
use crate::event::EventMessage;
use crate::node::{FlatTree, Node, NodeId};
use crate::patch::Patch;
use rmpv::{ext, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A complete tree (logic → renderer).
    Render(RenderPayload),
    /// Ordered edits against the renderer's tree (logic → renderer).
    Patch(PatchPayload),
    /// A user interaction (renderer → logic).
    Event(EventMessage),
    /// Shut the renderer down (logic → renderer).
    Quit,
    /// Any other message type; the payload is not inspected.
    Other { kind: String, payload: Value },
}

impl Message {
    pub fn other(kind: impl Into<String>, payload: Value) -> Message {
        Message::Other {
            kind: kind.into(),
            payload,
        }
    }

    /// The envelope `type` string.
    pub fn kind(&self) -> &str {
        match self {
            Message::Render(_) => "render",
            Message::Patch(_) => "patch",
            Message::Event(_) => "event",
            Message::Quit => "quit",
            Message::Other { kind, .. } => kind,
        }
    }

    /// Serializes the message as a named (map-based) MessagePack envelope.
    pub fn encode(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        let known = match self {
            Message::Render(payload) => KnownRef::Render(payload),
            Message::Patch(payload) => KnownRef::Patch(payload),
            Message::Event(payload) => KnownRef::Event(payload),
            Message::Quit => KnownRef::Quit(Empty {}),
            Message::Other { kind, payload } => {
                return rmp_serde::to_vec_named(&RawEnvelopeRef { kind, payload });
            }
        };
        rmp_serde::to_vec_named(&known)
    }

    /// Decodes one envelope.
    ///
    /// Bytes that are not a `{type, payload}` map fail with [`DecodeError::Envelope`]. A payload
    /// that does not fit a known type fails with [`DecodeError::Payload`], which leaves the stream
    /// usable. Patch records that do not parse are skipped one by one.
    pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
        let RawEnvelope { kind, payload } = rmp_serde::from_slice(bytes)?;
        let message = match kind.as_str() {
            "render" => Message::Render(payload_as(&kind, payload)?),
            "patch" => Message::Patch(patches(&kind, payload)?),
            "event" => Message::Event(payload_as(&kind, payload)?),
            // quit carries nothing worth checking
            "quit" => Message::Quit,
            _ => Message::Other { kind, payload },
        };
        Ok(message)
    }
}

fn payload_as<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, DecodeError> {
    ext::from_value(payload).map_err(|source| DecodeError::Payload {
        kind: kind.to_string(),
        source,
    })
}

fn patches(kind: &str, payload: Value) -> Result<PatchPayload, DecodeError> {
    let RawPatches { patches } = payload_as(kind, payload)?;
    let patches = patches
        .into_iter()
        .filter_map(|record| match ext::from_value::<Patch>(record) {
            Ok(patch) => Some(patch),
            Err(err) => {
                tracing::debug!("skipping patch record: {}", err);
                None
            }
        })
        .collect();
    Ok(PatchPayload { patches })
}

#[derive(Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
enum KnownRef<'a> {
    Render(&'a RenderPayload),
    Patch(&'a PatchPayload),
    Event(&'a EventMessage),
    Quit(Empty),
}

#[derive(Serialize)]
struct Empty {}

#[derive(Serialize)]
struct RawEnvelopeRef<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    payload: &'a Value,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "nil")]
    payload: Value,
}

fn nil() -> Value {
    Value::Nil
}

#[derive(Deserialize)]
struct RawPatches {
    patches: Vec<Value>,
}

/// Payload of a `render` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPayload {
    pub root_id: NodeId,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub menu: Vec<MenuItem>,
    #[serde(default)]
    pub hotkeys: Vec<Hotkey>,
}

impl RenderPayload {
    pub fn new(tree: FlatTree, scene: SceneConfig) -> RenderPayload {
        RenderPayload {
            root_id: tree.root_id,
            nodes: tree.nodes,
            window: scene.window,
            menu: scene.menu,
            hotkeys: scene.hotkeys,
        }
    }

    pub fn into_parts(self) -> (FlatTree, SceneConfig) {
        (
            FlatTree {
                root_id: self.root_id,
                nodes: self.nodes,
            },
            SceneConfig {
                window: self.window,
                menu: self.menu,
                hotkeys: self.hotkeys,
            },
        )
    }
}

/// Payload of a `patch` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchPayload {
    pub patches: Vec<Patch>,
}

/// Window, menu and hotkey configuration sent with every full render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub menu: Vec<MenuItem>,
    pub hotkeys: Vec<Hotkey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

/// A menu entry. Activations arrive as `tap` events addressed to `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: NodeId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MenuItem>,
}

/// A global key combination. Activations arrive as `tap` events addressed to `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotkey {
    pub id: NodeId,
    pub keys: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::flatten::flatten;
    use crate::node::{Modifier, NestedNode};

    fn round_trip(message: &Message) -> Message {
        Message::decode(&message.encode().unwrap()).unwrap()
    }

    #[test]
    fn render_round_trip() {
        let tree = NestedNode::new("column")
            .child(
                NestedNode::new("text")
                    .prop("text", "hi")
                    .prop("size", 14)
                    .modifier(Modifier::new("padding").arg("all", 4.5)),
            )
            .overlay(NestedNode::new("badge").prop("count", -3));
        let scene = SceneConfig {
            window: WindowConfig {
                title: "demo".into(),
                ..WindowConfig::default()
            },
            menu: vec![MenuItem {
                id: "menu.file".into(),
                title: "File".into(),
                shortcut: None,
                items: vec![MenuItem {
                    id: "menu.file.quit".into(),
                    title: "Quit".into(),
                    shortcut: Some("cmd+q".into()),
                    items: Vec::new(),
                }],
            }],
            hotkeys: vec![Hotkey {
                id: "hotkey.reload".into(),
                keys: "cmd+r".into(),
            }],
        };
        let message = Message::Render(RenderPayload::new(flatten(&tree).unwrap(), scene));
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn patch_and_event_round_trip() {
        let mut props = crate::node::Props::new();
        props.insert("text".into(), Value::Nil);
        let message = Message::Patch(PatchPayload {
            patches: vec![
                Patch::Props {
                    target_id: "root.0".into(),
                    props,
                },
                Patch::Remove {
                    target_id: "root.1".into(),
                },
            ],
        });
        assert_eq!(round_trip(&message), message);

        let event = Message::Event(EventMessage::new(
            "root.2".into(),
            EventKind::Drop,
            Some("/a,/b"),
        ));
        assert_eq!(round_trip(&event), event);
        assert_eq!(round_trip(&Message::Quit), Message::Quit);
    }

    #[test]
    fn envelope_is_a_named_map() {
        let bytes = Message::Event(EventMessage::new("root".into(), EventKind::Tap, None))
            .encode()
            .unwrap();
        let value: Value = rmp_serde::from_slice(&bytes).unwrap();
        let map = value.as_map().expect("envelope should be a map");
        let keys: Vec<_> = map.iter().filter_map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["type", "payload"]);
        assert_eq!(map[0].1.as_str(), Some("event"));
    }

    fn envelope(entries: Vec<(&str, Value)>) -> Vec<u8> {
        let map = entries
            .into_iter()
            .map(|(key, value)| (Value::from(key), value))
            .collect();
        rmp_serde::to_vec(&Value::Map(map)).unwrap()
    }

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (Value::from(key), value))
                .collect(),
        )
    }

    #[test]
    fn payload_may_be_omitted() {
        let quit = envelope(vec![("type", Value::from("quit"))]);
        assert_eq!(Message::decode(&quit).unwrap(), Message::Quit);

        let ping = envelope(vec![("type", Value::from("ping"))]);
        assert_eq!(Message::decode(&ping).unwrap(), Message::other("ping", Value::Nil));
    }

    #[test]
    fn bad_payloads_are_recoverable() {
        let event = envelope(vec![
            ("type", Value::from("event")),
            (
                "payload",
                map(vec![("node_id", Value::from("root.1")), ("event", Value::from(42))]),
            ),
        ]);
        assert!(matches!(
            Message::decode(&event),
            Err(DecodeError::Payload { ref kind, .. }) if kind == "event"
        ));

        let render = envelope(vec![("type", Value::from("render")), ("payload", Value::from(7))]);
        assert!(matches!(
            Message::decode(&render),
            Err(DecodeError::Payload { .. })
        ));
    }

    #[test]
    fn missing_type_is_an_envelope_error() {
        let bytes = envelope(vec![("payload", Value::Nil)]);
        assert!(matches!(
            Message::decode(&bytes),
            Err(DecodeError::Envelope(_))
        ));
        assert!(matches!(
            Message::decode(&[0xc1]),
            Err(DecodeError::Envelope(_))
        ));
    }

    #[test]
    fn unparsable_patch_records_are_skipped() {
        let records = Value::Array(vec![
            map(vec![("op", Value::from("remove")), ("target_id", Value::from("root.1"))]),
            map(vec![("op", Value::from("move"))]),
            map(vec![("op", Value::from("props")), ("target_id", Value::from(3))]),
            Value::from("remove"),
        ]);
        let bytes = envelope(vec![
            ("type", Value::from("patch")),
            ("payload", map(vec![("patches", records)])),
        ]);
        assert_eq!(
            Message::decode(&bytes).unwrap(),
            Message::Patch(PatchPayload {
                patches: vec![Patch::Remove {
                    target_id: "root.1".into()
                }],
            })
        );
    }

    #[test]
    fn unknown_types_pass_through() {
        let payload = Value::Map(vec![(
            Value::from("text"),
            Value::Array(vec![Value::from(1), Value::from("two")]),
        )]);
        let message = Message::other("clipboard", payload);
        assert_eq!(message.kind(), "clipboard");
        assert_eq!(round_trip(&message), message);
    }
}
