//! The private channel between the logic process and the renderer.
//!
//! A Unix domain socket with exactly one peer on each end. Messages go out through a clonable
//! [`TransportSender`] and come in through a single [`TransportReceiver`]; any error on either
//! half shuts the socket down in both directions so that the peer sees the teardown too.

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::frame::{FrameReader, FrameWriter};
use crate::message::Message;
use crossbeam::channel;
use parking_lot::Mutex;
use std::fs;
use std::net::Shutdown;
use std::ops::ControlFlow;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Anything outbound messages can be written to.
pub trait MessageSink: Send + Sync {
    fn send(&self, message: &Message) -> Result<(), TransportError>;
}

impl MessageSink for channel::Sender<Message> {
    fn send(&self, message: &Message) -> Result<(), TransportError> {
        channel::Sender::send(self, message.clone()).map_err(|_| TransportError::Closed)
    }
}

/// A connected socket, not yet split into halves.
pub struct Transport {
    stream: UnixStream,
    config: TransportConfig,
}

impl Transport {
    pub fn new(stream: UnixStream, config: TransportConfig) -> Transport {
        Transport { stream, config }
    }

    /// Connects to a listening peer at the configured socket path.
    pub fn connect(config: &TransportConfig) -> Result<Transport, TransportError> {
        let path = config
            .socket_path
            .clone()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no socket path"))?;
        let stream = UnixStream::connect(&path)?;
        tracing::debug!("connected to {}", path.display());
        Ok(Transport::new(stream, config.clone()))
    }

    /// Binds the socket; the peer can connect once this returns.
    pub fn bind(config: &TransportConfig) -> Result<PendingTransport, TransportError> {
        let path = config.socket_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // a leftover socket file from a dead process would make bind fail
        let _ = fs::remove_file(&path);

        let listener = UnixListener::bind(&path)?;
        tracing::info!("listening on {}", path.display());
        Ok(PendingTransport {
            listener,
            path,
            config: config.clone(),
        })
    }

    /// Binds and blocks until exactly one peer has connected.
    pub fn listen(config: &TransportConfig) -> Result<Transport, TransportError> {
        Transport::bind(config)?.accept()
    }

    /// A connected pair within one process.
    pub fn pair(config: &TransportConfig) -> Result<(Transport, Transport), TransportError> {
        let (a, b) = UnixStream::pair()?;
        Ok((
            Transport::new(a, config.clone()),
            Transport::new(b, config.clone()),
        ))
    }

    pub fn split(self) -> Result<(TransportSender, TransportReceiver), TransportError> {
        let max_len = self.config.max_frame_len;
        let writer = self.stream.try_clone()?;
        let control = self.stream.try_clone()?;
        let closed = Arc::new(AtomicBool::new(false));

        let sender = TransportSender {
            inner: Arc::new(SenderInner {
                writer: Mutex::new(FrameWriter::with_max_len(writer, max_len)),
                control: control.try_clone()?,
                closed: Arc::clone(&closed),
            }),
        };
        let receiver = TransportReceiver {
            reader: FrameReader::with_max_len(self.stream, max_len),
            control,
            closed,
        };
        Ok((sender, receiver))
    }
}

/// A bound socket waiting for its single peer.
pub struct PendingTransport {
    listener: UnixListener,
    path: PathBuf,
    config: TransportConfig,
}

impl PendingTransport {
    /// The path the peer should connect to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts exactly one peer and removes the socket file so nobody else can connect.
    pub fn accept(self) -> Result<Transport, TransportError> {
        let accepted = self.listener.accept();
        let _ = fs::remove_file(&self.path);
        let (stream, _) = accepted?;
        tracing::info!("peer connected");
        Ok(Transport::new(stream, self.config))
    }
}

/// The outbound half. Clones share the same socket and closed state.
#[derive(Clone)]
pub struct TransportSender {
    inner: Arc<SenderInner>,
}

struct SenderInner {
    writer: Mutex<FrameWriter<UnixStream>>,
    control: UnixStream,
    closed: Arc<AtomicBool>,
}

impl TransportSender {
    pub fn send(&self, message: &Message) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let result = self.inner.writer.lock().write_message(message);
        if let Err(ref err) = result {
            tracing::error!("failed to send {} message: {}", message.kind(), err);
            self.close();
        }
        result
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Tears the connection down in both directions.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            let _ = self.inner.control.shutdown(Shutdown::Both);
        }
    }
}

impl MessageSink for TransportSender {
    fn send(&self, message: &Message) -> Result<(), TransportError> {
        TransportSender::send(self, message)
    }
}

/// The inbound half.
pub struct TransportReceiver {
    reader: FrameReader<UnixStream>,
    control: UnixStream,
    closed: Arc<AtomicBool>,
}

impl TransportReceiver {
    /// Blocks until the next message arrives.
    ///
    /// A clean end of stream is reported as [`TransportError::Closed`].
    pub fn recv(&mut self) -> Result<Message, TransportError> {
        let result = match self.reader.read_message() {
            Ok(Some(message)) => return Ok(message),
            Ok(None) => Err(TransportError::Closed),
            Err(err) => Err(err),
        };
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.control.shutdown(Shutdown::Both);
        }
        result
    }

    /// Spawns a thread that hands each inbound message to `handler`, one at a time, in arrival
    /// order.
    ///
    /// The thread ends when the handler breaks (`Ok`) or the connection fails (`Err`).
    pub fn on_message<F>(
        mut self,
        mut handler: F,
    ) -> Result<JoinHandle<Result<(), TransportError>>, TransportError>
    where
        F: FnMut(Message) -> ControlFlow<()> + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("perch-recv".to_string())
            .spawn(move || -> Result<(), TransportError> {
                loop {
                    let message = self.recv()?;
                    tracing::trace!("received {} message", message.kind());
                    if handler(message).is_break() {
                        return Ok(());
                    }
                }
            })?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, EventMessage};
    use crate::message::PatchPayload;
    use crate::patch::Patch;
    use rmpv::Value;
    use std::io::Write;

    fn tap(id: &str) -> Message {
        Message::Event(EventMessage::new(id.into(), EventKind::Tap, None))
    }

    #[test]
    fn delivers_in_send_order() {
        let (a, b) = Transport::pair(&TransportConfig::default()).unwrap();
        let (sender, _a_rx) = a.split().unwrap();
        let (_b_tx, mut receiver) = b.split().unwrap();

        for i in 0..20 {
            sender.send(&tap(&format!("root.{}", i))).unwrap();
        }
        for i in 0..20 {
            assert_eq!(receiver.recv().unwrap(), tap(&format!("root.{}", i)));
        }
    }

    #[test]
    fn on_message_runs_until_break() {
        let (a, b) = Transport::pair(&TransportConfig::default()).unwrap();
        let (sender, _a_rx) = a.split().unwrap();
        let (_b_tx, receiver) = b.split().unwrap();

        let (seen_tx, seen_rx) = channel::unbounded();
        let handle = receiver
            .on_message(move |message| {
                let quit = message == Message::Quit;
                seen_tx.send(message).unwrap();
                if quit {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();

        sender.send(&tap("root")).unwrap();
        sender.send(&Message::Quit).unwrap();
        assert!(handle.join().unwrap().is_ok());
        assert_eq!(seen_rx.try_iter().collect::<Vec<_>>(), [tap("root"), Message::Quit]);
    }

    #[test]
    fn corrupt_header_tears_down_both_sides() {
        let (mut raw, b) = UnixStream::pair().unwrap();
        let (b_tx, mut receiver) = Transport::new(b, TransportConfig::default()).split().unwrap();

        raw.write_all(&[0, 0, 0, 0]).unwrap();
        assert!(matches!(receiver.recv(), Err(TransportError::EmptyFrame)));
        assert!(b_tx.is_closed());
        assert!(matches!(b_tx.send(&Message::Quit), Err(TransportError::Closed)));

        // the peer observes end of stream
        let mut peer = FrameReader::new(raw);
        assert!(peer.read_message().unwrap().is_none());
    }

    fn write_raw(stream: &mut UnixStream, entries: Vec<(&str, Value)>) {
        let envelope = Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (Value::from(key), value))
                .collect(),
        );
        let body = rmp_serde::to_vec(&envelope).unwrap();
        stream.write_all(&(body.len() as u32).to_be_bytes()).unwrap();
        stream.write_all(&body).unwrap();
    }

    #[test]
    fn bad_payloads_keep_the_connection_open() {
        let (mut raw, b) = UnixStream::pair().unwrap();
        let (b_tx, mut receiver) = Transport::new(b, TransportConfig::default()).split().unwrap();

        let record = |op: &str| {
            Value::Map(vec![
                (Value::from("op"), Value::from(op)),
                (Value::from("target_id"), Value::from("root.1")),
            ])
        };
        write_raw(
            &mut raw,
            vec![
                ("type", Value::from("event")),
                (
                    "payload",
                    Value::Map(vec![
                        (Value::from("node_id"), Value::from("root.1")),
                        (Value::from("event"), Value::from(42)),
                    ]),
                ),
            ],
        );
        write_raw(
            &mut raw,
            vec![
                ("type", Value::from("patch")),
                (
                    "payload",
                    Value::Map(vec![(
                        Value::from("patches"),
                        Value::Array(vec![record("remove"), record("move")]),
                    )]),
                ),
            ],
        );
        write_raw(&mut raw, vec![("type", Value::from("quit"))]);

        assert_eq!(
            receiver.recv().unwrap(),
            Message::Patch(PatchPayload {
                patches: vec![Patch::Remove {
                    target_id: "root.1".into()
                }],
            })
        );
        assert_eq!(receiver.recv().unwrap(), Message::Quit);
        assert!(!b_tx.is_closed());
    }

    #[test]
    fn peer_disconnect_is_terminal() {
        let (a, b) = Transport::pair(&TransportConfig::default()).unwrap();
        let (_b_tx, mut receiver) = b.split().unwrap();
        drop(a);
        assert!(matches!(receiver.recv(), Err(TransportError::Closed)));
    }

    #[test]
    fn bind_accepts_one_peer() {
        let dir = std::env::temp_dir().join(format!("perch-test-{}", uuid::Uuid::new_v4().simple()));
        let config = TransportConfig::new("test").with_socket_path(dir.join("s.sock"));
        let pending = Transport::bind(&config).unwrap();
        let path = pending.path().to_path_buf();

        let client = thread::spawn({
            let config = config.clone();
            move || Transport::connect(&config).unwrap()
        });
        let server = pending.accept().unwrap();
        let client = client.join().unwrap();
        assert!(!path.exists());

        let (tx, _rx) = client.split().unwrap();
        let (_tx, mut rx) = server.split().unwrap();
        tx.send(&Message::Quit).unwrap();
        assert_eq!(rx.recv().unwrap(), Message::Quit);
        let _ = fs::remove_dir_all(dir);
    }
}
