//! The output serializer: encodes a frame header and writes header +
//! payload as one atomic unit. Server frames are never masked, never
//! fragmented by this crate, and always FIN=1.

use crate::frame::OpCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Encodes a server-originated frame header for payload length `len` and
/// `opcode`. MASK bit is always 0.
pub fn encode_header(opcode: OpCode, len: usize) -> Vec<u8> {
    let mut header = vec![0b1000_0000 | opcode.as_u8()];
    if len < 126 {
        header.push(len as u8);
    } else if len < 65536 {
        header.push(0x7E);
        header.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        header.push(0x7F);
        header.extend_from_slice(&(len as u64).to_be_bytes());
    }
    header
}

/// Wraps the host-owned output sink. Every write is header-then-payload,
/// with no other write interleaved in between — callers serialize access
/// through the `tokio::sync::Mutex` in `Session`, not through this type.
pub struct Writer<W> {
    sink: W,
}

impl<W: AsyncWrite + Unpin> Writer<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Writes one complete frame and flushes it. Returns the number of
    /// payload bytes written.
    pub async fn write_frame(&mut self, opcode: OpCode, payload: &[u8]) -> std::io::Result<usize> {
        let header = encode_header(opcode, payload.len());
        self.sink.write_all(&header).await?;
        self.sink.write_all(payload).await?;
        self.sink.flush().await?;
        Ok(payload.len())
    }
}
