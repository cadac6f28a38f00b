//! Command framing and reply reassembly
//!
//! Object commands look like this on the wire:
//!
//! ```text
//! 0x1b 'W' <opcode> <length: u32 LE> <payload...>
//! ```
//!
//! where `length` counts the 7 header bytes as well. Replies start with a
//! 4 byte header `<response_id> <length: u16 LE> <status>`, again counting
//! itself. Both directions are split into 64 byte packets; only the first
//! reply packet carries the header.

use crate::{DecodeError, ESC, PACKET_SIZE, RAW_SYSTEM_STATUS, RAW_WIFI_ENABLE};

pub const OBJ_HEADER_LEN: usize = 7;
pub const RESP_HEADER_LEN: usize = 4;

/// Zero fill carried by the activate and unknown `0x04` objects; with the
/// header it fills exactly one packet.
pub const OBJ_FILL_LEN: usize = PACKET_SIZE - OBJ_HEADER_LEN;

/// A request to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Structured `ESC W <opcode> <length>` request
    Object { opcode: u8, payload: Vec<u8> },
    /// `ESC <letter> [flag]`, sent verbatim
    Raw(Vec<u8>),
}

impl Command {
    pub fn object(opcode: u8, payload: Vec<u8>) -> Self {
        Command::Object { opcode, payload }
    }

    /// Object command carrying the 57 byte zero fill
    pub fn object_filled(opcode: u8) -> Self {
        Command::Object {
            opcode,
            payload: vec![0u8; OBJ_FILL_LEN],
        }
    }

    pub fn system_status() -> Self {
        Command::Raw(vec![ESC, RAW_SYSTEM_STATUS])
    }

    pub fn set_wifi_enabled(enable: bool) -> Self {
        Command::Raw(vec![ESC, RAW_WIFI_ENABLE, u8::from(enable)])
    }

    /// Opcode for object commands, the command letter for raw ones
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Object { opcode, .. } => *opcode,
            Command::Raw(bytes) => bytes.get(1).copied().unwrap_or(0),
        }
    }

    /// Full wire form, header included
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Command::Object { opcode, payload } => {
                let length = (OBJ_HEADER_LEN + payload.len()) as u32;
                let mut buf = Vec::with_capacity(OBJ_HEADER_LEN + payload.len());
                buf.push(ESC);
                buf.push(b'W');
                buf.push(*opcode);
                buf.extend_from_slice(&length.to_le_bytes());
                buf.extend_from_slice(payload);
                buf
            }
            Command::Raw(bytes) => bytes.clone(),
        }
    }
}

/// Split outgoing bytes into transfers of at most `PACKET_SIZE` bytes.
/// The last packet is not padded.
pub fn chunk_packets(data: &[u8]) -> std::slice::Chunks<'_, u8> {
    data.chunks(PACKET_SIZE)
}

/// Leading bytes of the first reply packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub response_id: u8,
    /// Total reply length, header included
    pub length: u16,
    pub status: u8,
}

impl ResponseHeader {
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < RESP_HEADER_LEN {
            return Err(DecodeError::Protocol(format!(
                "reply header needs {RESP_HEADER_LEN} bytes, first packet has {}",
                data.len()
            )));
        }
        let header = Self {
            response_id: data[0],
            length: u16::from_le_bytes([data[1], data[2]]),
            status: data[3],
        };
        if (header.length as usize) < RESP_HEADER_LEN {
            return Err(DecodeError::Protocol(format!(
                "declared length {} is shorter than the reply header",
                header.length
            )));
        }
        Ok(header)
    }

    pub fn to_bytes(&self) -> [u8; RESP_HEADER_LEN] {
        let len = self.length.to_le_bytes();
        [self.response_id, len[0], len[1], self.status]
    }

    /// Number of body bytes the device promised
    pub fn body_len(&self) -> usize {
        self.length as usize - RESP_HEADER_LEN
    }
}

/// A fully reassembled object reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub response_id: u8,
    pub declared_length: u16,
    pub status: u8,
    pub body: Vec<u8>,
}

impl Response {
    pub fn header(&self) -> ResponseHeader {
        ResponseHeader {
            response_id: self.response_id,
            length: self.declared_length,
            status: self.status,
        }
    }

    pub fn expect_id(&self, expected: u8) -> Result<(), DecodeError> {
        if self.response_id != expected {
            return Err(DecodeError::Protocol(format!(
                "expected response id 0x{expected:02x}, got 0x{:02x}",
                self.response_id
            )));
        }
        Ok(())
    }
}

/// Accumulates reply packets until the declared body length is reached.
///
/// The body never grows past `length - 4` bytes: surplus bytes in the last
/// packet are padding and get dropped.
#[derive(Debug)]
pub struct Reassembly {
    header: ResponseHeader,
    body: Vec<u8>,
}

impl Reassembly {
    pub fn start(first_packet: &[u8]) -> Result<Self, DecodeError> {
        let header = ResponseHeader::from_bytes(first_packet)?;
        let mut body = Vec::with_capacity(header.body_len());
        let take = header.body_len().min(first_packet.len() - RESP_HEADER_LEN);
        body.extend_from_slice(&first_packet[RESP_HEADER_LEN..RESP_HEADER_LEN + take]);
        Ok(Self { header, body })
    }

    pub fn header(&self) -> ResponseHeader {
        self.header
    }

    pub fn received(&self) -> usize {
        self.body.len()
    }

    pub fn remaining(&self) -> usize {
        self.header.body_len() - self.body.len()
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Append a continuation packet. Returns how many bytes were kept.
    pub fn push(&mut self, packet: &[u8]) -> Result<usize, DecodeError> {
        if packet.is_empty() {
            return Err(DecodeError::Protocol(format!(
                "empty continuation packet with {} of {} body bytes received",
                self.body.len(),
                self.header.body_len()
            )));
        }
        let take = self.remaining().min(packet.len());
        self.body.extend_from_slice(&packet[..take]);
        Ok(take)
    }

    pub fn finish(self) -> Result<Response, DecodeError> {
        if !self.is_complete() {
            return Err(DecodeError::Protocol(format!(
                "reply incomplete: {} of {} body bytes",
                self.body.len(),
                self.header.body_len()
            )));
        }
        Ok(Response {
            response_id: self.header.response_id,
            declared_length: self.header.length,
            status: self.header.status,
            body: self.body,
        })
    }
}
