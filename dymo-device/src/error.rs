use std::time::Duration;

use dymo_proto::DecodeError;

use crate::poll::Phase;
use crate::transport::TransportError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no LabelManager found: {0}")]
    DeviceNotFound(String),
    /// Present but could not be opened or claimed
    #[error("LabelManager unavailable: {0}")]
    Unavailable(String),
    #[error("transport failure on command 0x{opcode:02x}: {source}")]
    Transport {
        opcode: u8,
        #[source]
        source: TransportError,
    },
    #[error("protocol error on command 0x{opcode:02x}: {detail}")]
    Protocol { opcode: u8, detail: String },
    #[error("malformed response to command 0x{opcode:02x}: {source}")]
    MalformedResponse {
        opcode: u8,
        #[source]
        source: DecodeError,
    },
    #[error("{phase}: device reported failure status {code}")]
    FatalStatus { phase: Phase, code: u8 },
    #[error("{phase}: no result after {waited:?} ({ticks} status queries)")]
    Timeout {
        phase: Phase,
        waited: Duration,
        ticks: u32,
    },
    #[error("scan found no networks")]
    NoNetworks,
    #[error("cancelled")]
    Cancelled,
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Attach the command context to a decoder failure
    pub fn decode(opcode: u8, err: DecodeError) -> Self {
        match err {
            DecodeError::Protocol(detail) => Error::Protocol { opcode, detail },
            DecodeError::PasswordTooLong { .. } => Error::InvalidInput(err.to_string()),
            DecodeError::Malformed { .. } => Error::MalformedResponse { opcode, source: err },
        }
    }

    pub fn transport(opcode: u8, source: TransportError) -> Self {
        Error::Transport { opcode, source }
    }
}
