//! The read/dispatch loop: drives the decoder, assembles fragmented
//! messages, answers PING/CLOSE inline, and calls into the handler for
//! each fully assembled message.

use crate::decoder::decode_frame;
use crate::error::Error;
use crate::frame::OpCode;
use crate::handler::{HandlerDescriptor, MessageType, Private};
use crate::session::ServerHandle;
use tokio::io::AsyncRead;

/// Runs the loop until the peer closes, disconnects, or violates the
/// protocol. Always calls `on_disconnect` exactly once before returning,
/// and always leaves a CLOSE frame sent (best effort — `ServerHandle::close`
/// swallows write errors, since the peer may already be gone).
pub async fn run<R: AsyncRead + Unpin>(
    reader: &mut R,
    handle: ServerHandle,
    descriptor: &HandlerDescriptor,
    mut private: Private,
    payload_limit: usize,
) {
    let mut in_progress: Option<(OpCode, Vec<u8>)> = None;

    loop {
        match decode_frame(reader, payload_limit).await {
            Ok(frame) if frame.opcode.is_control() => match frame.opcode {
                OpCode::Ping => {
                    // Testable property #7: answered inline, pending
                    // reassembly (`in_progress`) is untouched.
                    handle.send(MessageType::Pong, &frame.payload).await;
                }
                OpCode::Pong => {}
                OpCode::Close => {
                    handle.close().await;
                    break;
                }
                _ => unreachable!("is_control() only admits Ping/Pong/Close"),
            },
            Ok(frame) => match frame.opcode {
                OpCode::Continuation => {
                    let Some((_, buf)) = in_progress.as_mut() else {
                        log_and_abort(&handle, Error::UnexpectedContinuation).await;
                        break;
                    };
                    buf.extend_from_slice(&frame.payload);
                    if frame.fin {
                        let (opcode, buf) = in_progress.take().unwrap();
                        dispatch_message(descriptor, &mut private, &handle, opcode, &buf).await;
                    }
                }
                OpCode::Text | OpCode::Binary => {
                    if in_progress.is_some() {
                        log_and_abort(&handle, Error::MessageAlreadyInProgress).await;
                        break;
                    }
                    if frame.fin {
                        dispatch_message(descriptor, &mut private, &handle, frame.opcode, &frame.payload)
                            .await;
                    } else {
                        in_progress = Some((frame.opcode, frame.payload));
                    }
                }
                _ => unreachable!("control opcodes are handled above"),
            },
            Err(Error::Io { ref source }) if source.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(err) => {
                log::warn!("closing connection after protocol violation: {err}");
                handle.close().await;
                break;
            }
        }
    }

    handle.close().await;
    descriptor.handler.on_disconnect(private, &handle).await;
}

async fn log_and_abort(handle: &ServerHandle, err: Error) {
    log::warn!("closing connection after protocol violation: {err}");
    handle.close().await;
}

async fn dispatch_message(
    descriptor: &HandlerDescriptor,
    private: &mut Private,
    handle: &ServerHandle,
    opcode: OpCode,
    payload: &[u8],
) {
    let kind = match opcode {
        OpCode::Text => MessageType::Text,
        OpCode::Binary => MessageType::Binary,
        _ => unreachable!("only Text/Binary messages reach dispatch_message"),
    };
    descriptor.handler.on_message(private, handle, kind, payload).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::request::Request;
    use crate::session::Session;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::io::{split, AsyncWriteExt};

    struct Recording {
        messages: Arc<Mutex<Vec<(MessageType, Vec<u8>)>>>,
        disconnected: Arc<Mutex<bool>>,
    }

    #[async_trait::async_trait]
    impl Handler for Recording {
        async fn on_message(
            &self,
            _private: &mut Private,
            _server: &ServerHandle,
            kind: MessageType,
            payload: &[u8],
        ) -> usize {
            self.messages.lock().unwrap().push((kind, payload.to_vec()));
            payload.len()
        }

        async fn on_disconnect(&self, _private: Private, _server: &ServerHandle) {
            *self.disconnected.lock().unwrap() = true;
        }
    }

    fn masked_frame(fin: bool, opcode: u8, payload: &[u8]) -> Vec<u8> {
        let mask = [0u8; 4]; // all-zero mask: equivalent to unmasked payload bytes
        let mut out = vec![(fin as u8) << 7 | opcode, 0x80 | payload.len() as u8];
        out.extend_from_slice(&mask);
        out.extend_from_slice(payload);
        out
    }

    fn make_session_and_reader() -> (Arc<Session>, impl AsyncRead + Unpin, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = split(server);
        let request = Request::new("GET", "/chat", HashMap::new());
        let session = Session::new(request, Vec::new(), Box::new(server_write));
        (session, server_read, client)
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong_without_invoking_the_handler() {
        let (session, mut reader, mut client) = make_session_and_reader();
        let handle = ServerHandle::new(session);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let disconnected = Arc::new(Mutex::new(false));
        let descriptor = HandlerDescriptor::new(Recording {
            messages: messages.clone(),
            disconnected: disconnected.clone(),
        });

        client.write_all(&masked_frame(true, 0x9, b"ping-body")).await.unwrap();
        client.write_all(&masked_frame(true, 0x8, b"")).await.unwrap(); // CLOSE
        client.shutdown().await.unwrap();

        run(&mut reader, handle, &descriptor, Box::new(()), 1 << 20).await;

        assert!(messages.lock().unwrap().is_empty());
        assert!(*disconnected.lock().unwrap());

        let mut out = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut out).await.unwrap();
        assert_eq!(&out[..2], &[0x8A, 0x09]); // PONG, 9-byte payload
        assert_eq!(&out[2..11], b"ping-body");
        assert_eq!(&out[11..], &[0x88, 0x00]); // server's own CLOSE echo
    }

    #[tokio::test]
    async fn fragmented_text_message_is_assembled_before_dispatch() {
        let (session, mut reader, mut client) = make_session_and_reader();
        let handle = ServerHandle::new(session);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let disconnected = Arc::new(Mutex::new(false));
        let descriptor = HandlerDescriptor::new(Recording {
            messages: messages.clone(),
            disconnected,
        });

        client.write_all(&masked_frame(false, 0x1, b"hel")).await.unwrap();
        client.write_all(&masked_frame(true, 0x0, b"lo")).await.unwrap();
        client.shutdown().await.unwrap();

        run(&mut reader, handle, &descriptor, Box::new(()), 1 << 20).await;

        let recorded = messages.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0], (MessageType::Text, b"hello".to_vec()));
    }

    #[tokio::test]
    async fn continuation_without_a_leading_frame_is_rejected() {
        let (session, mut reader, mut client) = make_session_and_reader();
        let handle = ServerHandle::new(session);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let descriptor = HandlerDescriptor::new(Recording {
            messages: messages.clone(),
            disconnected: Arc::new(Mutex::new(false)),
        });

        client.write_all(&masked_frame(true, 0x0, b"orphan")).await.unwrap();
        client.shutdown().await.unwrap();

        run(&mut reader, handle, &descriptor, Box::new(()), 1 << 20).await;

        assert!(messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_second_data_frame_mid_message_is_rejected() {
        let (session, mut reader, mut client) = make_session_and_reader();
        let handle = ServerHandle::new(session);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let descriptor = HandlerDescriptor::new(Recording {
            messages: messages.clone(),
            disconnected: Arc::new(Mutex::new(false)),
        });

        client.write_all(&masked_frame(false, 0x1, b"hel")).await.unwrap();
        client.write_all(&masked_frame(true, 0x2, b"lo")).await.unwrap(); // BINARY, not CONTINUATION
        client.shutdown().await.unwrap();

        run(&mut reader, handle, &descriptor, Box::new(()), 1 << 20).await;

        assert!(messages.lock().unwrap().is_empty());
    }
}
