use crate::frame::DEFAULT_PAYLOAD_LIMIT;

/// Tunables for the handshake validator and the frame decoder.
///
/// `version_token` is the only accepted value of `Sec-WebSocket-Version`.
/// Early WebSocket protocol drafts used lower numbers, but RFC 6455
/// settled on `"13"`, which is what production deployments want. Frame
/// format and accept-key computation are unaffected by the choice.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub payload_limit: usize,
    pub version_token: String,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig {
            payload_limit: DEFAULT_PAYLOAD_LIMIT,
            version_token: "13".to_string(),
        }
    }
}
