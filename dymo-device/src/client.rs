//! Command framer: one request/response exchange at a time

use std::time::Duration;

use data_encoding::HEXLOWER;
use log::{debug, trace, warn};

use dymo_proto::{
    Command, NetworkStatus, OBJ_ACTIVATE, OBJ_INTERFACE_INFO, OBJ_NETWORK_CONFIG, OBJ_NETWORK_STATUS,
    OBJ_SCAN_RESULTS, OBJ_START_SCAN, OBJ_UNKNOWN_04, PACKET_SIZE, RESP_NETWORK_STATUS, Reassembly,
    Response, ScannedNetwork, SystemStatus, chunk_packets,
};

use crate::{CancelToken, Error, Transport, TransportError};

pub const REPLY_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);

/// Talks to one LabelManager over an exclusively owned transport.
///
/// No retries happen here: a failed exchange is reported and the next
/// command starts by draining whatever the device still had queued.
pub struct LabelManager<T> {
    transport: T,
    cancel: CancelToken,
    reply_timeout: Duration,
    drain_timeout: Duration,
}

impl<T: Transport> LabelManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cancel: CancelToken::new(),
            reply_timeout: REPLY_TIMEOUT,
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeouts(mut self, reply: Duration, drain: Duration) -> Self {
        self.reply_timeout = reply;
        self.drain_timeout = drain;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Drain stale input, then write the command packet by packet
    fn send(&mut self, command: &Command) -> Result<(), Error> {
        self.check_cancel()?;
        let opcode = command.opcode();
        let dropped = self.transport.drain(self.drain_timeout);
        if dropped > 0 {
            warn!("discarded {dropped} stale packet(s) before command 0x{opcode:02x}");
        }

        let bytes = command.to_bytes();
        debug!("--> command 0x{opcode:02x} ({} bytes)", bytes.len());
        for packet in chunk_packets(&bytes) {
            trace!("--> {}", HEXLOWER.encode(packet));
            self.transport
                .write(packet)
                .map_err(|e| Error::transport(opcode, e))?;
        }
        Ok(())
    }

    fn read_packet(&mut self, opcode: u8) -> Result<Vec<u8>, TransportError> {
        let packet = self.transport.read(PACKET_SIZE, self.reply_timeout)?;
        trace!("<-- 0x{opcode:02x}: {}", HEXLOWER.encode(&packet));
        Ok(packet)
    }

    fn check_cancel(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Raw short command (`ESC <letter> [flag]`). With `expect_reply` the
    /// single reply packet is returned as is.
    pub fn send_raw(&mut self, command: &Command, expect_reply: bool) -> Result<Option<Vec<u8>>, Error> {
        let opcode = command.opcode();
        self.send(command)?;
        if !expect_reply {
            return Ok(None);
        }
        self.check_cancel()?;
        let packet = self
            .read_packet(opcode)
            .map_err(|e| Error::transport(opcode, e))?;
        Ok(Some(packet))
    }

    /// Object command (`ESC W <opcode>`), returning the reassembled reply
    pub fn send_command(&mut self, opcode: u8, payload: &[u8]) -> Result<Response, Error> {
        self.exchange(&Command::object(opcode, payload.to_vec()))
    }

    fn exchange(&mut self, command: &Command) -> Result<Response, Error> {
        let opcode = command.opcode();
        self.send(command)?;

        self.check_cancel()?;
        let first = self
            .read_packet(opcode)
            .map_err(|e| Error::transport(opcode, e))?;
        let mut reply = Reassembly::start(&first).map_err(|e| Error::decode(opcode, e))?;

        while !reply.is_complete() {
            self.check_cancel()?;
            let packet = match self.read_packet(opcode) {
                Ok(packet) => packet,
                Err(TransportError::Timeout { timeout_ms }) => {
                    return Err(Error::Protocol {
                        opcode,
                        detail: format!(
                            "reply truncated: timed out after {timeout_ms}ms with {} of {} body bytes",
                            reply.received(),
                            reply.header().body_len()
                        ),
                    });
                }
                Err(e) => return Err(Error::transport(opcode, e)),
            };
            reply.push(&packet).map_err(|e| Error::decode(opcode, e))?;
        }

        let response = reply.finish().map_err(|e| Error::decode(opcode, e))?;
        debug!(
            "<-- response 0x{:02x} to 0x{opcode:02x}: length {} status {}",
            response.response_id, response.declared_length, response.status
        );
        Ok(response)
    }

    /// `ESC A`
    pub fn system_status(&mut self) -> Result<SystemStatus, Error> {
        let command = Command::system_status();
        let opcode = command.opcode();
        let reply = self.send_raw(&command, true)?.unwrap_or_default();
        SystemStatus::from_bytes(&reply).map_err(|e| Error::decode(opcode, e))
    }

    /// `ESC I <0|1>`; the device does not answer
    pub fn set_wifi_enabled(&mut self, enable: bool) -> Result<(), Error> {
        self.send_raw(&Command::set_wifi_enabled(enable), false)?;
        Ok(())
    }

    pub fn network_status(&mut self) -> Result<NetworkStatus, Error> {
        let response = self.send_command(OBJ_NETWORK_STATUS, &[])?;
        response
            .expect_id(RESP_NETWORK_STATUS)
            .map_err(|e| Error::decode(OBJ_NETWORK_STATUS, e))?;
        NetworkStatus::from_bytes(&response.body).map_err(|e| Error::decode(OBJ_NETWORK_STATUS, e))
    }

    /// MAC address of the Wi-Fi interface (object `0x08`, body bytes 4..10)
    pub fn interface_mac(&mut self) -> Result<[u8; 6], Error> {
        let response = self.send_command(OBJ_INTERFACE_INFO, &[])?;
        let body = &response.body;
        if body.len() < 10 {
            return Err(Error::decode(
                OBJ_INTERFACE_INFO,
                dymo_proto::DecodeError::Malformed {
                    what: "interface info",
                    needed: 10,
                    got: body.len(),
                },
            ));
        }
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&body[4..10]);
        Ok(mac)
    }

    pub fn start_scan(&mut self) -> Result<Response, Error> {
        self.send_command(OBJ_START_SCAN, &[])
    }

    pub fn scanned_networks(&mut self) -> Result<Vec<ScannedNetwork>, Error> {
        let response = self.send_command(OBJ_SCAN_RESULTS, &[])?;
        dymo_proto::decode_scan_results(&response.body).map_err(|e| Error::decode(OBJ_SCAN_RESULTS, e))
    }

    /// Object `0x02`. The reply is returned uninterpreted.
    pub fn submit_network_config(&mut self, network: &ScannedNetwork, password: &str) -> Result<Response, Error> {
        let payload = dymo_proto::network_config_payload(network, password)
            .map_err(|e| Error::decode(OBJ_NETWORK_CONFIG, e))?;
        self.send_command(OBJ_NETWORK_CONFIG, &payload)
    }

    /// Object `0x05` with its zero fill
    pub fn activate_network(&mut self) -> Result<Response, Error> {
        self.exchange(&Command::object_filled(OBJ_ACTIVATE))
    }

    /// Object `0x04` with its zero fill. Meaning unknown.
    pub fn query_unknown_04(&mut self) -> Result<Response, Error> {
        self.exchange(&Command::object_filled(OBJ_UNKNOWN_04))
    }

    /// Any object, optionally with the standard zero fill
    pub fn query_object(&mut self, opcode: u8, filled: bool) -> Result<Response, Error> {
        if filled {
            self.exchange(&Command::object_filled(opcode))
        } else {
            self.send_command(opcode, &[])
        }
    }
}
