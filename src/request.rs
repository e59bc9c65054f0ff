//! The inbound-request view the handshake and handler need.
//!
//! Raw HTTP parsing is the host's job; by the time this crate sees a
//! request, the host has already split it into a method, a URI, and a
//! header map.

use std::collections::HashMap;

/// A validated, already-parsed HTTP upgrade request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub uri: String,
    headers: HashMap<String, String>,
}

impl Request {
    pub fn new(method: impl Into<String>, uri: impl Into<String>, headers: HashMap<String, String>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self {
            method: method.into(),
            uri: uri.into(),
            headers,
        }
    }

    /// Case-insensitive header lookup (header names are case-insensitive per RFC 7230).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// True if `header(name)` contains `token` as one of its comma-separated,
    /// whitespace-trimmed values, matched case-insensitively. Used for the
    /// `Connection: Upgrade` check, which must tolerate `Connection: keep-alive, Upgrade`.
    pub fn header_contains_token(&self, name: &str, token: &str) -> bool {
        match self.header(name) {
            Some(value) => value
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case(token)),
            None => false,
        }
    }
}
