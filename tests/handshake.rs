//! Handshake + handler-registration behavior exercised through the
//! public `accept` entry point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use ws_handler_core::config::WebSocketConfig;
use ws_handler_core::handler::{Handler, HandlerDescriptor, MessageType, Private};
use ws_handler_core::request::Request;
use ws_handler_core::session::ServerHandle;
use ws_handler_core::Rejected;

fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn upgrade_request(extra: &[(&str, &str)]) -> Request {
    let mut pairs = vec![
        ("Host", "server.example.com"),
        ("Upgrade", "websocket"),
        ("Connection", "Upgrade"),
        ("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="),
        ("Sec-WebSocket-Version", "13"),
    ];
    pairs.extend_from_slice(extra);
    Request::new("GET", "/chat", headers(&pairs))
}

struct ProtocolPicking {
    pick: Option<&'static str>,
}

#[async_trait::async_trait]
impl Handler for ProtocolPicking {
    async fn on_connect(&self, server: &ServerHandle) -> Option<Private> {
        if let Some(name) = self.pick {
            server.protocol_set(name);
        }
        Some(Box::new(()))
    }

    async fn on_message(&self, _private: &mut Private, _server: &ServerHandle, _kind: MessageType, payload: &[u8]) -> usize {
        payload.len()
    }
}

struct Refusing {
    disconnected: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl Handler for Refusing {
    async fn on_connect(&self, _server: &ServerHandle) -> Option<Private> {
        None
    }
    async fn on_message(&self, _private: &mut Private, _server: &ServerHandle, _kind: MessageType, _payload: &[u8]) -> usize {
        0
    }
    async fn on_disconnect(&self, _private: Private, _server: &ServerHandle) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn accept_key_is_computed_for_the_rfc_6455_fixture() {
    // Through the full `accept` path rather than the bare helper.
    let request = upgrade_request(&[]);
    let config = WebSocketConfig::default();
    let descriptor = HandlerDescriptor::new(ProtocolPicking { pick: None });

    let established = ws_handler_core::accept(request, Vec::new(), &config, &descriptor)
        .await
        .expect("valid upgrade request must be accepted");

    assert_eq!(established.accept_key(), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
}

#[tokio::test]
async fn handler_can_override_the_default_subprotocol() {
    let request = upgrade_request(&[("Sec-WebSocket-Protocol", "a, b , c")]);
    let config = WebSocketConfig::default();
    let descriptor = HandlerDescriptor::new(ProtocolPicking { pick: Some("b") });

    let established = ws_handler_core::accept(request, Vec::new(), &config, &descriptor)
        .await
        .expect("valid upgrade request must be accepted");

    assert_eq!(established.negotiated_protocol(), Some("b".to_string()));
}

#[tokio::test]
async fn default_subprotocol_is_the_first_offered_one() {
    let request = upgrade_request(&[("Sec-WebSocket-Protocol", "a, b , c")]);
    let config = WebSocketConfig::default();
    let descriptor = HandlerDescriptor::new(ProtocolPicking { pick: None });

    let established = ws_handler_core::accept(request, Vec::new(), &config, &descriptor)
        .await
        .expect("valid upgrade request must be accepted");

    assert_eq!(established.negotiated_protocol(), Some("a".to_string()));
}

#[tokio::test]
async fn handler_refusal_aborts_before_any_101_is_prepared() {
    // No `EstablishedSession` is produced, and `on_disconnect` is never
    // called since `on_connect` never produced a private value.
    let request = upgrade_request(&[]);
    let config = WebSocketConfig::default();
    let disconnected = Arc::new(AtomicBool::new(false));
    let descriptor = HandlerDescriptor::new(Refusing {
        disconnected: disconnected.clone(),
    });

    let result = ws_handler_core::accept(request, Vec::new(), &config, &descriptor).await;

    assert!(matches!(result, Err(Rejected::HandlerRefused)));
    assert!(!disconnected.load(Ordering::SeqCst));
}

#[tokio::test]
async fn a_declined_handshake_never_reaches_the_handler() {
    let request = Request::new("POST", "/chat", headers(&[("Host", "server.example.com")]));
    let config = WebSocketConfig::default();
    let descriptor = HandlerDescriptor::new(ProtocolPicking { pick: None });

    let result = ws_handler_core::accept(request, Vec::new(), &config, &descriptor).await;
    assert!(matches!(
        result,
        Err(Rejected::Declined(ws_handler_core::handshake::DeclineReason::WrongMethod))
    ));
}
