//! Opening-handshake validation and accept-key computation, per the
//! WebSockets RFC (RFC 6455 §4, §11.3.1).

use crate::frame::GUID;
use crate::request::Request;
use base64::prelude::*;
use sha1::{Digest, Sha1};

/// Result of validating an upgrade request. Declining is policy, not an
/// error: the host is free to try another handler or answer with 400/404.
pub enum HandshakeOutcome {
    Accepted(Accepted),
    Declined(DeclineReason),
}

pub struct Accepted {
    pub accept_key: String,
    /// Subprotocols offered by the client, in the order they appeared.
    pub offered_protocols: Vec<String>,
    /// The default accepted subprotocol — the first offered one — before
    /// the handler gets a chance to override it.
    pub default_protocol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    WrongMethod,
    MissingOrWrongUpgradeHeader,
    MissingOrWrongConnectionHeader,
    MissingHost,
    MissingSecWebSocketKey,
    UnsupportedVersion,
}

/// Validates an upgrade request and, on success, computes the accept key
/// and pre-negotiates the subprotocol. `version_token` is the single
/// accepted value of `Sec-WebSocket-Version`.
pub fn validate(request: &Request, version_token: &str) -> HandshakeOutcome {
    if !request.method.eq_ignore_ascii_case("GET") {
        return HandshakeOutcome::Declined(DeclineReason::WrongMethod);
    }
    match request.header("Upgrade") {
        Some(value) if value.eq_ignore_ascii_case("websocket") => {}
        _ => return HandshakeOutcome::Declined(DeclineReason::MissingOrWrongUpgradeHeader),
    }
    if !request.header_contains_token("Connection", "Upgrade") {
        return HandshakeOutcome::Declined(DeclineReason::MissingOrWrongConnectionHeader);
    }
    if request.header("Host").is_none() {
        return HandshakeOutcome::Declined(DeclineReason::MissingHost);
    }
    let Some(key) = request.header("Sec-WebSocket-Key") else {
        return HandshakeOutcome::Declined(DeclineReason::MissingSecWebSocketKey);
    };
    match request.header("Sec-WebSocket-Version") {
        Some(value) if value == version_token => {}
        _ => return HandshakeOutcome::Declined(DeclineReason::UnsupportedVersion),
    }

    let accept_key = compute_accept_key(key);
    let offered_protocols = request
        .header("Sec-WebSocket-Protocol")
        .map(parse_subprotocols)
        .unwrap_or_default();
    let default_protocol = offered_protocols.first().cloned();

    HandshakeOutcome::Accepted(Accepted {
        accept_key,
        offered_protocols,
        default_protocol,
    })
}

/// `base64(SHA1(key ++ GUID))`, the RFC 6455 accept-key derivation.
pub fn compute_accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(GUID.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

/// Splits `Sec-WebSocket-Protocol` on commas, trimming ASCII whitespace and
/// tabs, preserving client order.
fn parse_subprotocols(header_value: &str) -> Vec<String> {
    header_value
        .split(',')
        .map(|s| s.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\t'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
