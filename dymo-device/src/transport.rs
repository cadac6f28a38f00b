//! Packet transport abstraction
//!
//! The transport is owned exclusively by one [`crate::LabelManager`] for its
//! lifetime. Implementations claim the device when opened and release it
//! when dropped.

use std::time::Duration;

use dymo_proto::PACKET_SIZE;

/// Upper bound on packets thrown away by one [`Transport::drain`]
pub const MAX_DRAIN_PACKETS: usize = 64;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("device disconnected")]
    Disconnected,
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    pub fn timeout(timeout: Duration) -> Self {
        TransportError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

/// Byte channel to the device with fixed size packets
pub trait Transport {
    /// Write one packet of at most `PACKET_SIZE` bytes
    fn write(&mut self, packet: &[u8]) -> Result<(), TransportError>;

    /// Block until a packet arrives or `timeout` passes
    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Throw away input left over from an earlier, incomplete exchange.
    ///
    /// Best effort: stops at the first timeout, error or empty read, and after
    /// `MAX_DRAIN_PACKETS` packets. Returns how many packets were dropped.
    fn drain(&mut self, timeout: Duration) -> usize {
        let mut dropped = 0;
        while dropped < MAX_DRAIN_PACKETS {
            match self.read(PACKET_SIZE, timeout) {
                Ok(packet) if packet.is_empty() => break,
                Ok(_) => dropped += 1,
                Err(TransportError::Timeout { .. }) => break,
                Err(e) => {
                    log::debug!("drain stopped: {e}");
                    break;
                }
            }
        }
        dropped
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        (**self).write(packet)
    }

    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).read(max_len, timeout)
    }

    fn drain(&mut self, timeout: Duration) -> usize {
        (**self).drain(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        (**self).write(packet)
    }

    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).read(max_len, timeout)
    }

    fn drain(&mut self, timeout: Duration) -> usize {
        (**self).drain(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Pending(VecDeque<Result<Vec<u8>, TransportError>>);

    impl Transport for Pending {
        fn write(&mut self, _packet: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }

        fn read(&mut self, _max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::timeout(timeout)))
        }
    }

    #[test]
    fn drain_stops_at_timeout() {
        let mut t = Pending(VecDeque::from([Ok(vec![1; 64]), Ok(vec![2; 64])]));
        assert_eq!(t.drain(Duration::from_millis(10)), 2);
        assert_eq!(t.drain(Duration::from_millis(10)), 0);
    }

    #[test]
    fn drain_stops_at_error() {
        let mut t = Pending(VecDeque::from([
            Ok(vec![1; 64]),
            Err(TransportError::Io("stall".into())),
            Ok(vec![2; 64]),
        ]));
        assert_eq!(t.drain(Duration::from_millis(10)), 1);
        assert_eq!(t.0.len(), 1);
    }

    #[test]
    fn drain_is_bounded() {
        let mut t = Pending((0..200).map(|_| Ok(vec![0; 64])).collect());
        assert_eq!(t.drain(Duration::from_millis(10)), MAX_DRAIN_PACKETS);
    }
}
