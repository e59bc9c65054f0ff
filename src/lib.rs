//! A server-side WebSocket connection core: opening-handshake validation,
//! the framed binary protocol (RFC 6455), and dispatch to a pluggable
//! handler.
//!
//! This crate does not own a socket, parse HTTP, load configuration, or
//! pick a handler by path — the host does all of that and hands this
//! crate an already-parsed [`Request`](request::Request) plus a reader
//! and writer pair once it has decided this connection is a WebSocket
//! upgrade. [`accept`] validates the handshake and runs `on_connect`;
//! once the host has written its own 101 response using the result,
//! [`EstablishedSession::run`] hands the socket to the read/dispatch loop
//! for the lifetime of the connection.

pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod handler;
pub mod handshake;
pub mod request;
pub mod session;
pub mod writer;

use config::WebSocketConfig;
use handler::{HandlerDescriptor, Private, UnsupportedHandlerVersion};
use handshake::{DeclineReason, HandshakeOutcome};
use request::Request;
use session::{ServerHandle, Session};
use tokio::io::{AsyncRead, AsyncWrite};

/// Why a connection never reached the read/dispatch loop.
#[derive(Debug, thiserror::Error)]
pub enum Rejected {
    #[error("handshake declined: {0:?}")]
    Declined(DeclineReason),
    #[error(transparent)]
    UnsupportedHandler(#[from] UnsupportedHandlerVersion),
    #[error("handler refused the connection in on_connect")]
    HandlerRefused,
}

/// Validates the handshake and runs the handler's `on_connect`. On success,
/// the returned [`EstablishedSession`] carries everything the host needs to
/// write its own 101 response before handing off to
/// [`EstablishedSession::run`].
pub async fn accept<W>(
    request: Request,
    writer: W,
    config: &WebSocketConfig,
    descriptor: &HandlerDescriptor,
) -> Result<EstablishedSession, Rejected>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    descriptor.validate()?;

    let accepted = match handshake::validate(&request, &config.version_token) {
        HandshakeOutcome::Accepted(accepted) => accepted,
        HandshakeOutcome::Declined(reason) => return Err(Rejected::Declined(reason)),
    };

    let session = Session::new(request, accepted.offered_protocols, Box::new(writer));
    session.set_default_protocol(accepted.default_protocol);
    let handle = ServerHandle::new(session);

    match descriptor.handler.on_connect(&handle).await {
        Some(private) => Ok(EstablishedSession {
            handle,
            accept_key: accepted.accept_key,
            private,
        }),
        None => Err(Rejected::HandlerRefused),
    }
}

/// A connection that passed the handshake and `on_connect`, waiting for
/// the host to write the 101 response and start the read loop.
pub struct EstablishedSession {
    handle: ServerHandle,
    accept_key: String,
    private: Private,
}

impl EstablishedSession {
    /// `Sec-WebSocket-Accept` value for the 101 response.
    pub fn accept_key(&self) -> &str {
        &self.accept_key
    }

    /// Extra headers the handler set via `ServerHandle::header_set`.
    pub fn response_headers(&self) -> Vec<(String, String)> {
        self.handle.response_headers()
    }

    /// `Sec-WebSocket-Protocol` value for the 101 response, if any.
    pub fn negotiated_protocol(&self) -> Option<String> {
        self.handle.negotiated_protocol()
    }

    /// Hands `reader` to the read/dispatch loop. Call only once the host
    /// has written the 101 response; this drives the connection until it
    /// closes, calling `on_message` for each assembled message and
    /// `on_disconnect` exactly once before returning.
    pub async fn run<R>(self, reader: &mut R, descriptor: &HandlerDescriptor, config: &WebSocketConfig)
    where
        R: AsyncRead + Unpin,
    {
        dispatch::run(reader, self.handle, descriptor, self.private, config.payload_limit).await;
    }
}
