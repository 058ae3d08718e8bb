//! Error types.

use crate::node::NodeId;
use std::io;
use thiserror::Error;

/// A tree build was rejected before anything was transmitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("node {id} is deeper than the depth limit of {limit}")]
    DepthExceeded { id: NodeId, limit: usize },
}

/// A flat node list that does not describe a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("root node {0} is missing")]
    MissingRoot(NodeId),

    #[error("node {0} is referenced but missing")]
    MissingNode(NodeId),

    #[error("node {0} is reachable more than once")]
    DuplicateNode(NodeId),
}

/// Connection failures. Every variant is terminal for the connection.
///
/// Messages whose payload does not decode are dropped by the reader instead; see
/// [`DecodeError::Payload`].
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("received a zero-length frame")]
    EmptyFrame,

    #[error("frame of {len} bytes exceeds the maximum of {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("stream ended inside a frame")]
    Truncated,

    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("connection closed")]
    Closed,
}

/// A frame body that could not be decoded into a message.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Not a `{type, payload}` map. Terminal for the connection.
    #[error("malformed envelope: {0}")]
    Envelope(#[from] rmp_serde::decode::Error),

    /// The payload does not fit its message type. The message is dropped.
    #[error("malformed {kind} payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: rmpv::ext::Error,
    },
}

/// An event string that could not be parsed for its handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("unknown event kind `{0}`")]
    UnknownKind(String),

    #[error("event `{0}` requires a value")]
    MissingValue(String),

    #[error("invalid value `{value}` for event `{kind}`")]
    InvalidValue { kind: String, value: String },
}
