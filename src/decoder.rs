//! The frame decode state machine, per RFC 6455 §5.2's base framing
//! protocol.
//!
//! Written as one sequential `async fn`: each `.await` point *is* a
//! suspension state (START / LEN / LEN_EXT / MASK_KEY / APP_DATA), so
//! there's no separate hand-rolled state enum to keep in sync with it.

use crate::error::Error;
use crate::frame::{Frame, OpCode};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads exactly one frame off `reader`, validating RSV bits, the client
/// mask requirement, and the payload length against `payload_limit`.
/// Unmasks the payload in place. Fragmentation/continuation validity is
/// the caller's concern (the dispatch loop tracks in-progress messages);
/// this function only validates what a single frame can tell on its own.
pub async fn decode_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    payload_limit: usize,
) -> Result<Frame, Error> {
    // START: FIN, RSV1..3, opcode.
    let mut header = [0u8; 2];
    reader.read_exact(&mut header).await?;

    let fin = header[0] & 0b1000_0000 != 0;
    let rsv = header[0] & 0b0111_0000;
    if rsv != 0 {
        return Err(Error::ReservedBitSet);
    }
    let opcode = OpCode::from(header[0] & 0b0000_1111)?;

    if opcode.is_control() && !fin {
        return Err(Error::ControlFrameFragmented);
    }

    // LEN: MASK bit (must be 1) and the 7-bit length, possibly extended.
    let masked = header[1] & 0b1000_0000 != 0;
    if !masked {
        return Err(Error::UnmaskedClientFrame);
    }
    let length_field = header[1] & 0b0111_1111;
    if opcode.is_control() && length_field > 125 {
        return Err(Error::ControlFramePayloadTooLarge);
    }

    // LEN_EXT: accumulate the extended length, big-endian.
    let payload_len: u64 = match length_field {
        0..=125 => length_field as u64,
        126 => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf).await?;
            u16::from_be_bytes(buf) as u64
        }
        127 => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf).await?;
            let len = u64::from_be_bytes(buf);
            if len & 0x8000_0000_0000_0000 != 0 {
                return Err(Error::PayloadLimitExceeded(len, payload_limit));
            }
            len
        }
        _ => unreachable!("7-bit field"),
    };
    if opcode.is_control() && payload_len > 125 {
        return Err(Error::ControlFramePayloadTooLarge);
    }
    if payload_len > payload_limit as u64 {
        return Err(Error::PayloadLimitExceeded(payload_len, payload_limit));
    }

    // MASK_KEY: 4-byte client mask. An all-zero mask is equivalent to no masking.
    let mut mask = [0u8; 4];
    reader.read_exact(&mut mask).await?;

    // EXT_DATA / APP_DATA: grow the buffer to the advertised length and read it.
    let payload_len = payload_len as usize;
    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload).await?;

    if mask != [0, 0, 0, 0] {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= mask[i & 3];
        }
    }

    Ok(Frame::new(fin, opcode, payload))
}
