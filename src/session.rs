//! Per-connection state and the capability surface exposed to handlers.
//!
//! `Session` holds the request, the output sink, and the negotiated
//! subprotocol; `ServerHandle` is a cheaply-cloned `Arc<Session>` wrapper
//! handed to handler callbacks, mirroring a single mutex-guarded sink
//! shared by a read loop and arbitrary handler-initiated writes.

use crate::handler::MessageType;
use crate::request::Request;
use crate::writer::Writer;
use std::sync::Mutex as SyncMutex;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

/// The host's output transport, type-erased so this crate stays agnostic
/// to TLS, plaintext TCP, or anything else the host terminates and owns.
pub type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

struct SinkState {
    writer: Writer<BoxedSink>,
    closing: bool,
}

/// Per-connection structure binding the request, output sink, mutex,
/// negotiated protocols, and closing flag.
pub struct Session {
    request: Request,
    offered_protocols: Vec<String>,
    negotiated_protocol: SyncMutex<Option<String>>,
    response_headers: SyncMutex<Vec<(String, String)>>,
    sink: Mutex<SinkState>,
}

impl Session {
    pub fn new(request: Request, offered_protocols: Vec<String>, sink: BoxedSink) -> Arc<Self> {
        Arc::new(Self {
            request,
            offered_protocols,
            negotiated_protocol: SyncMutex::new(None),
            response_headers: SyncMutex::new(Vec::new()),
            sink: Mutex::new(SinkState {
                writer: Writer::new(sink),
                closing: false,
            }),
        })
    }

    /// The headers the handler set via `header_set`, for the host to
    /// fold into the 101 response.
    pub fn response_headers(&self) -> Vec<(String, String)> {
        self.response_headers.lock().unwrap().clone()
    }

    /// The subprotocol the 101 response should carry, if any — the
    /// handler's `protocol_set` override, or the pre-selected default.
    pub fn negotiated_protocol(&self) -> Option<String> {
        self.negotiated_protocol.lock().unwrap().clone()
    }

    pub(crate) fn set_default_protocol(&self, protocol: Option<String>) {
        *self.negotiated_protocol.lock().unwrap() = protocol;
    }

    async fn is_closing(&self) -> bool {
        self.sink.lock().await.closing
    }
}

/// The capability surface handed to handler callbacks.
/// Cheap to clone: it's just an `Arc<Session>`.
#[derive(Clone)]
pub struct ServerHandle {
    session: Arc<Session>,
}

impl ServerHandle {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Opaque request handle for reading headers beyond the helpers below.
    pub fn request(&self) -> &Request {
        &self.session.request
    }

    pub fn header_get(&self, name: &str) -> Option<&str> {
        self.session.request.header(name)
    }

    /// Sets an outbound response header. Only meaningful before the 101
    /// is sent — the host reads `response_headers()` once, at that point.
    pub fn header_set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.session
            .response_headers
            .lock()
            .unwrap()
            .push((name.into(), value.into()));
    }

    pub fn protocol_count(&self) -> usize {
        self.session.offered_protocols.len()
    }

    pub fn protocol_index(&self, index: usize) -> Option<&str> {
        self.session.offered_protocols.get(index).map(String::as_str)
    }

    pub fn protocol_set(&self, name: impl Into<String>) {
        self.session.set_default_protocol(Some(name.into()));
    }

    /// The headers a handler set via `header_set`, read by the host once
    /// while building the 101 response.
    pub fn response_headers(&self) -> Vec<(String, String)> {
        self.session.response_headers()
    }

    /// The subprotocol the 101 response should carry, if any.
    pub fn negotiated_protocol(&self) -> Option<String> {
        self.session.negotiated_protocol()
    }

    /// Writes one frame. Returns bytes written; `0` means the session was
    /// already closing, or the write/flush failed.
    pub async fn send(&self, kind: MessageType, payload: &[u8]) -> usize {
        let opcode = message_type_to_opcode(kind);
        let mut guard = self.session.sink.lock().await;
        if guard.closing {
            return 0;
        }
        match guard.writer.write_frame(opcode, payload).await {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    /// Sends a CLOSE frame with an empty payload and marks the session
    /// closing. A no-op if a CLOSE has already gone out.
    pub async fn close(&self) {
        let mut guard = self.session.sink.lock().await;
        if guard.closing {
            return;
        }
        let _ = guard.writer.write_frame(crate::frame::OpCode::Close, &[]).await;
        guard.closing = true;
    }
}

fn message_type_to_opcode(kind: MessageType) -> crate::frame::OpCode {
    use crate::frame::OpCode;
    match kind {
        MessageType::Text => OpCode::Text,
        MessageType::Binary => OpCode::Binary,
        MessageType::Ping => OpCode::Ping,
        MessageType::Pong => OpCode::Pong,
        MessageType::Close => OpCode::Close,
    }
}
