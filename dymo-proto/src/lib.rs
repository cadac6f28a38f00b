//! LabelManager Wireless PnP protocol - command framing and status records
//!
//! Everything in this crate is pure: it turns commands into the bytes that go
//! over the wire and turns reply bytes back into typed records. Moving those
//! bytes is the job of a `Transport` (see `dymo-device`).

mod error;
pub mod frame;
pub mod network;
pub mod status;

pub use error::DecodeError;
pub use frame::{Command, Reassembly, Response, ResponseHeader, chunk_packets};
pub use network::{ScannedNetwork, decode_scan_results, decode_scanned_networks, network_config_payload};
pub use status::{ConnectionOutcome, NetworkStatus, SystemStatus, decode_network_status, decode_system_status};

/// Every USB transfer, in either direction, is at most this many bytes
pub const PACKET_SIZE: usize = 64;

pub const ESC: u8 = 0x1b;

// USB identity. The PnP model enumerates with either product id depending
// on which personality it booted into.
pub const VENDOR_ID: u16 = 0x0922;
pub const PRODUCT_IDS: [u16; 2] = [0x1008, 0x1007];
/// HID interface class carrying the command endpoints
pub const INTERFACE_CLASS_HID: u8 = 0x03;

// Object ids for `ESC W <id>`
pub const OBJ_START_SCAN: u8 = 0x00;
pub const OBJ_SCAN_RESULTS: u8 = 0x01;
pub const OBJ_NETWORK_CONFIG: u8 = 0x02;
/// Not understood; only ever sent with a zero fill
pub const OBJ_UNKNOWN_04: u8 = 0x04;
/// Applies the submitted network config. Exact semantics unknown.
pub const OBJ_ACTIVATE: u8 = 0x05;
pub const OBJ_INTERFACE_INFO: u8 = 0x08;
pub const OBJ_NETWORK_STATUS: u8 = 0x0c;

/// Response id answering `OBJ_NETWORK_STATUS`
pub const RESP_NETWORK_STATUS: u8 = 0x8c;

// Raw command letters for `ESC <letter> [flag]`
pub const RAW_SYSTEM_STATUS: u8 = b'A';
pub const RAW_WIFI_ENABLE: u8 = b'I';

/// Lowercase hex, one byte per group: `00:11:22` with `":"`
pub fn hex_separated(data: &[u8], separator: &str) -> String {
    data.iter()
        .map(|b| data_encoding::HEXLOWER.encode(std::slice::from_ref(b)))
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separated_hex() {
        assert_eq!(hex_separated(&[0x00, 0x80, 0xfe], "-"), "00-80-fe");
        assert_eq!(hex_separated(&[0x0a], ":"), "0a");
        assert_eq!(hex_separated(&[], " "), "");
    }
}
