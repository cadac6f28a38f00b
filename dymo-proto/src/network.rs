//! Scanned network records and the network configuration payload

use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::frame::OBJ_HEADER_LEN;
use crate::{DecodeError, PACKET_SIZE};

/// Offset of the first record in the scan result body. Byte 0 holds the
/// record count, the rest of the first packet is unused.
pub const SCAN_FIRST_RECORD: usize = PACKET_SIZE - 4;
/// Each record occupies its own packet
pub const SCAN_RECORD_STRIDE: usize = PACKET_SIZE;

pub const ESSID_LEN: usize = 32;

/// Network config is `0x00, encryption, bssid, essid` padded to this size,
/// which together with the object header fills the first packet
const CONFIG_NETWORK_FRAME: usize = PACKET_SIZE - OBJ_HEADER_LEN;
/// Password frame is padded so the whole request spans three packets
const CONFIG_TOTAL: usize = 3 * PACKET_SIZE - OBJ_HEADER_LEN;
pub const MAX_PASSWORD_LEN: usize = CONFIG_TOTAL - CONFIG_NETWORK_FRAME;

// SCAN RECORD
// offset | size | field
// 0      | 6    | bssid
// 6      | 1    | channel
// 7      | 2    | unknown
// 9      | 2    | encryption
// 11     | 1    | unknown
// 12     | 32   | essid, NUL padded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedNetwork {
    pub bssid: [u8; 6],
    pub channel: u8,
    pub encryption: [u8; 2],
    pub essid: [u8; ESSID_LEN],
}

impl ScannedNetwork {
    pub const LEN: usize = 12 + ESSID_LEN;

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::LEN {
            return Err(DecodeError::short("scan record", Self::LEN, data.len()));
        }
        let mut bssid = [0u8; 6];
        bssid.copy_from_slice(&data[0..6]);
        let mut essid = [0u8; ESSID_LEN];
        essid.copy_from_slice(&data[12..12 + ESSID_LEN]);
        Ok(Self {
            bssid,
            channel: data[6],
            encryption: [data[9], data[10]],
            essid,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..6].copy_from_slice(&self.bssid);
        buf[6] = self.channel;
        buf[9..11].copy_from_slice(&self.encryption);
        buf[12..].copy_from_slice(&self.essid);
        buf
    }

    /// ESSID up to the first NUL
    pub fn name(&self) -> String {
        let end = self.essid.iter().position(|b| *b == 0).unwrap_or(ESSID_LEN);
        String::from_utf8_lossy(&self.essid[..end]).into_owned()
    }

    pub fn bssid_str(&self) -> String {
        crate::hex_separated(&self.bssid, ":")
    }
}

impl fmt::Display for ScannedNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, Ch: {}, Enc: ({}, {}))",
            self.name(),
            self.bssid_str(),
            self.channel,
            self.encryption[0],
            self.encryption[1]
        )
    }
}

impl Serialize for ScannedNetwork {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ScannedNetwork", 4)?;
        s.serialize_field("essid", &self.name())?;
        s.serialize_field("bssid", &self.bssid_str())?;
        s.serialize_field("channel", &self.channel)?;
        s.serialize_field("encryption", &self.encryption)?;
        s.end()
    }
}

/// Decode `count` records from an assembled scan result body.
///
/// Every record must own its whole slot, the last one included. A slot cut
/// short by the end of the body is an error, never dropped.
pub fn decode_scanned_networks(body: &[u8], count: u8) -> Result<Vec<ScannedNetwork>, DecodeError> {
    let mut networks = Vec::with_capacity(count as usize);
    for index in 0..count as usize {
        let start = SCAN_FIRST_RECORD + index * SCAN_RECORD_STRIDE;
        let needed = start + SCAN_RECORD_STRIDE;
        if body.len() < needed {
            return Err(DecodeError::Malformed {
                what: "scan result list",
                needed,
                got: body.len(),
            });
        }
        networks.push(ScannedNetwork::from_bytes(&body[start..start + ScannedNetwork::LEN])?);
    }
    Ok(networks)
}

/// Decode a scan result body using the count stored in its first byte
pub fn decode_scan_results(body: &[u8]) -> Result<Vec<ScannedNetwork>, DecodeError> {
    let count = *body
        .first()
        .ok_or_else(|| DecodeError::short("scan result count", 1, 0))?;
    decode_scanned_networks(body, count)
}

/// Payload for object `0x02`: the selected network followed by the
/// password, each zero padded to its frame. Credentials travel in clear.
pub fn network_config_payload(network: &ScannedNetwork, password: &str) -> Result<Vec<u8>, DecodeError> {
    let password = password.as_bytes();
    if password.len() > MAX_PASSWORD_LEN {
        return Err(DecodeError::PasswordTooLong {
            len: password.len(),
            max: MAX_PASSWORD_LEN,
        });
    }

    let mut data = Vec::with_capacity(CONFIG_TOTAL);
    data.push(0x00);
    data.extend_from_slice(&network.encryption);
    data.extend_from_slice(&network.bssid);
    data.extend_from_slice(&network.essid);
    data.resize(CONFIG_NETWORK_FRAME, 0);
    data.extend_from_slice(password);
    data.resize(CONFIG_TOTAL, 0);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(name: &str, last: u8) -> ScannedNetwork {
        let mut essid = [0u8; ESSID_LEN];
        essid[..name.len()].copy_from_slice(name.as_bytes());
        ScannedNetwork {
            bssid: [0x00, 0x11, 0x22, 0x33, 0x44, last],
            channel: 6,
            encryption: [3, 4],
            essid,
        }
    }

    fn scan_body(networks: &[ScannedNetwork]) -> Vec<u8> {
        let mut body = vec![0u8; SCAN_FIRST_RECORD];
        body[0] = networks.len() as u8;
        for n in networks {
            let mut slot = n.to_bytes().to_vec();
            slot.resize(SCAN_RECORD_STRIDE, 0);
            body.extend_from_slice(&slot);
        }
        body
    }

    #[test]
    fn three_records() {
        let expected = [network("home", 1), network("office-5g", 2), network("x", 3)];
        let body = scan_body(&expected);
        assert_eq!(body.len(), 60 + 3 * 64);

        let decoded = decode_scanned_networks(&body, 3).unwrap();
        assert_eq!(decoded, expected);
        let names: Vec<String> = decoded.iter().map(|n| n.name()).collect();
        assert_eq!(names, ["home", "office-5g", "x"]);
        assert_eq!(decode_scan_results(&body).unwrap(), expected);
    }

    #[test]
    fn truncated_list_fails() {
        let body = scan_body(&[network("a", 1), network("b", 2), network("c", 3)]);
        let truncated = &body[..60 + 2 * 64 + 10];
        assert!(matches!(
            decode_scanned_networks(truncated, 3),
            Err(DecodeError::Malformed { what: "scan result list", .. })
        ));
    }

    #[test]
    fn short_last_slot_fails() {
        let body = scan_body(&[network("a", 1), network("b", 2), network("c", 3)]);
        // whole record present, slot padding missing
        let short = &body[..60 + 2 * 64 + 50];
        assert_eq!(
            decode_scanned_networks(short, 3),
            Err(DecodeError::Malformed {
                what: "scan result list",
                needed: 60 + 3 * 64,
                got: 238,
            })
        );
        assert_eq!(decode_scanned_networks(short, 2).unwrap().len(), 2);
    }

    #[test]
    fn count_limits_records() {
        let body = scan_body(&[network("a", 1), network("b", 2)]);
        assert_eq!(decode_scanned_networks(&body, 1).unwrap().len(), 1);
        assert!(decode_scanned_networks(&body, 0).unwrap().is_empty());
        assert!(decode_scan_results(&[]).is_err());
    }

    #[test]
    fn full_width_essid_has_no_nul() {
        let n = network("abcdefghijklmnopqrstuvwxyz012345", 9);
        assert_eq!(n.name().len(), 32);
        assert_eq!(n.to_string(), "abcdefghijklmnopqrstuvwxyz012345 (00:11:22:33:44:09, Ch: 6, Enc: (3, 4))");
    }

    #[test]
    fn config_payload_layout() {
        let n = network("home", 0xaa);
        let payload = network_config_payload(&n, "secret").unwrap();
        assert_eq!(payload.len(), 185);
        assert_eq!(payload[0], 0);
        assert_eq!(&payload[1..3], &[3, 4]);
        assert_eq!(&payload[3..9], &n.bssid);
        assert_eq!(&payload[9..41], &n.essid);
        assert!(payload[41..57].iter().all(|b| *b == 0));
        assert_eq!(&payload[57..63], b"secret");
        assert!(payload[63..].iter().all(|b| *b == 0));
    }

    #[test]
    fn password_limit() {
        let n = network("home", 1);
        assert!(network_config_payload(&n, &"p".repeat(MAX_PASSWORD_LEN)).is_ok());
        assert_eq!(
            network_config_payload(&n, &"p".repeat(MAX_PASSWORD_LEN + 1)),
            Err(DecodeError::PasswordTooLong { len: 129, max: 128 })
        );
    }
}
