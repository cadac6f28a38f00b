//! LabelManager Wireless PnP device control
//!
//! Layers, top down:
//! - [`Session`] sequences the Wi-Fi setup: radio up, scan, submit, connect
//! - [`Poller`] repeats a status query until the device reaches a state
//! - [`LabelManager`] frames commands and reassembles replies
//! - [`Transport`] moves 64 byte packets; `dymo-usb` provides the real one
//!
//! # Example
//!
//! ```ignore
//! use dymo_device::{LabelManager, Session, SessionConfig};
//!
//! let transport = dymo_usb::UsbTransport::open()?;
//! let mut session = Session::new(LabelManager::new(transport), SessionConfig::default());
//! session.bring_up_radio(&mut operator)?;
//! let networks = session.scan(&mut operator)?;
//! session.join(&networks[0], "password", &mut operator)?;
//! ```

mod cancel;
mod client;
mod config;
mod error;
mod poll;
mod session;
mod transport;

pub use cancel::CancelToken;
pub use client::{DRAIN_TIMEOUT, LabelManager, REPLY_TIMEOUT};
pub use config::SessionConfig;
pub use error::Error;
#[cfg(feature = "test-util")]
pub use poll::ManualClock;
pub use poll::{
    Clock, Phase, PollPolicy, Polled, Poller, SystemClock, Verdict, connection_result, radio_ready,
    scan_complete,
};
pub use session::{Operator, Session};
pub use transport::{MAX_DRAIN_PACKETS, Transport, TransportError};

// Re-export protocol types used in this crate's API
pub use dymo_proto::{
    Command, ConnectionOutcome, DecodeError, NetworkStatus, PACKET_SIZE, Response, ScannedNetwork,
    SystemStatus, hex_separated,
};
