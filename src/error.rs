use std::io;
use thiserror::Error;

/// Errors surfaced by the frame codec, the read/dispatch loop, and the
/// handler registration path. Handshake decline is intentionally *not*
/// represented here — it's policy, not failure (see `handshake::HandshakeOutcome`).
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("reserved bit set with no extension negotiated")]
    ReservedBitSet,

    #[error("control frames must not be fragmented")]
    ControlFrameFragmented,

    #[error("control frame payload exceeds 125 bytes")]
    ControlFramePayloadTooLarge,

    #[error("payload length {0} exceeds the configured limit of {1} bytes")]
    PayloadLimitExceeded(u64, usize),

    #[error("client frame arrived without the mask bit set")]
    UnmaskedClientFrame,

    #[error("continuation frame received with no message in progress")]
    UnexpectedContinuation,

    #[error("data frame received while a fragmented message is already in progress")]
    MessageAlreadyInProgress,

    #[error("unknown opcode: {0:#x}")]
    InvalidOpcode(u8),

    #[error("failed to allocate the assembly buffer")]
    AllocationFailure,

    #[error("the session is closing; no further frames may be written")]
    Closing,
}
