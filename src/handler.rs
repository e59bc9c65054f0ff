//! The handler plug-in interface: a versioned, registered callback set
//! (`on_connect`, `on_message`, `on_disconnect`) bound once per host path,
//! expressed as a trait object (`Arc<dyn Handler>`) rather than a loaded
//! struct of function pointers — `Drop` stands in for an explicit
//! `destroy` callback.

use crate::session::ServerHandle;
use async_trait::async_trait;
use std::any::Any;

/// The type of an application message or outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Binary,
    Ping,
    Pong,
    Close,
}

/// Opaque per-connection state owned by the handler between `on_connect`
/// and `on_disconnect`. Never locked because only the read/dispatch loop
/// ever touches it.
pub type Private = Box<dyn Any + Send>;

/// User-supplied code bound to a URL path by the host.
///
/// Methods are `async` (via `async-trait`) so the trait stays object-safe
/// while letting implementors call `ServerHandle::send`/`close` directly
/// from `on_connect`, rather than hand-rolling a second, blocking send
/// path for that one callback.
///
/// `on_connect` and `on_disconnect` have defaults so a handler that only
/// cares about messages doesn't have to implement them — a missing
/// `on_connect` behaves as if it returned a non-null private value.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Called once the Session exists but before the 101 response is
    /// sent. Returning `None` aborts the handshake: the host closes
    /// without ever sending 101, and `on_disconnect` is never invoked.
    async fn on_connect(&self, _server: &ServerHandle) -> Option<Private> {
        Some(Box::new(()))
    }

    /// Invoked once per assembled message. The return value is advisory;
    /// the core does not interpret it.
    async fn on_message(
        &self,
        private: &mut Private,
        server: &ServerHandle,
        kind: MessageType,
        payload: &[u8],
    ) -> usize;

    /// Invoked exactly once after the read loop terminates, iff
    /// `on_connect` returned `Some`.
    async fn on_disconnect(&self, _private: Private, _server: &ServerHandle) {}
}

/// Current handler ABI version. A future version would add a new
/// constant and gate on it in `validate`; adding trait methods with
/// defaults already extends this trait without breaking implementors,
/// so there is no struct-size half of this gate to maintain (see
/// DESIGN.md).
pub const HANDLER_ABI_VERSION: u32 = 1;

/// A registered handler plus the ABI version it was built against.
pub struct HandlerDescriptor {
    pub version: u32,
    pub handler: std::sync::Arc<dyn Handler>,
}

impl HandlerDescriptor {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self {
            version: HANDLER_ABI_VERSION,
            handler: std::sync::Arc::new(handler),
        }
    }

    /// Refuses a handler whose declared version this core doesn't
    /// understand.
    pub fn validate(&self) -> Result<(), UnsupportedHandlerVersion> {
        if self.version != HANDLER_ABI_VERSION {
            return Err(UnsupportedHandlerVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported handler ABI version: {0}")]
pub struct UnsupportedHandlerVersion(pub u32);
