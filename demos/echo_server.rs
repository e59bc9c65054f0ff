//! A bare TCP listener that performs the WebSocket upgrade itself and
//! hands each accepted connection to `ws_handler_core::accept`/
//! `EstablishedSession::run`. The request-line/header reader below is a
//! toy line reader for demo purposes only — everything this crate's
//! scope leaves to the host (HTTP parsing, the listener loop, writing
//! the 101 response) is stood up here by hand, the way a real host's own
//! HTTP server would.

use log::*;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use ws_handler_core::config::WebSocketConfig;
use ws_handler_core::handler::{Handler, HandlerDescriptor, MessageType, Private};
use ws_handler_core::handshake::{self, HandshakeOutcome};
use ws_handler_core::request::Request;
use ws_handler_core::session::ServerHandle;

struct Echo;

#[async_trait::async_trait]
impl Handler for Echo {
    async fn on_message(
        &self,
        _private: &mut Private,
        server: &ServerHandle,
        kind: MessageType,
        payload: &[u8],
    ) -> usize {
        server.send(kind, payload).await
    }
}

async fn read_upgrade_request<R: tokio::io::AsyncBufRead + Unpin>(
    reader: &mut R,
) -> std::io::Result<Request> {
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let uri = parts.next().unwrap_or("/").to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(Request::new(method, uri, headers))
}

async fn handle_connection(peer: SocketAddr, stream: TcpStream) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = match read_upgrade_request(&mut reader).await {
        Ok(request) => request,
        Err(err) => {
            error!("failed to read the upgrade request from {peer}: {err}");
            return;
        }
    };

    let config = WebSocketConfig::default();

    // Validated up front so the 101 response can go out before any frame
    // data does. A host that wants `on_connect` to override headers or the
    // negotiated subprotocol would instead buffer this write until after
    // `accept()` returns and read it back off `EstablishedSession`.
    let accepted = match handshake::validate(&request, &config.version_token) {
        HandshakeOutcome::Accepted(accepted) => accepted,
        HandshakeOutcome::Declined(reason) => {
            warn!("rejecting upgrade from {peer}: {reason:?}");
            let _ = write_half.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
            return;
        }
    };

    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accepted.accept_key
    );
    if let Err(err) = write_half.write_all(response.as_bytes()).await {
        error!("failed to write the 101 response to {peer}: {err}");
        return;
    }

    let descriptor = HandlerDescriptor::new(Echo);
    let established = match ws_handler_core::accept(request, write_half, &config, &descriptor).await {
        Ok(established) => established,
        Err(err) => {
            error!("connection to {peer} refused after the 101 was already sent: {err}");
            return;
        }
    };

    info!("{peer} upgraded to a WebSocket connection");
    established.run(&mut reader, &descriptor, &config).await;
    info!("{peer} disconnected");
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let addr = "127.0.0.1:9002";
    let listener = TcpListener::bind(addr).await.expect("can't listen");
    info!("listening on {addr}");

    while let Ok((stream, peer)) = listener.accept().await {
        tokio::spawn(handle_connection(peer, stream));
    }
}
