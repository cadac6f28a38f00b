//! Bit-packed status records
//!
//! Fields are packed least significant bit first within each byte, bytes in
//! little-endian order. Widths are fixed by the firmware; changing one shifts
//! every status code after it.

use std::fmt;

use serde::Serialize;

use crate::DecodeError;

/// Extract `width` bits starting at bit `shift` (LSB = 0)
fn field(byte: u8, shift: u8, width: u8) -> u8 {
    (byte >> shift) & ((1u16 << width) - 1) as u8
}

/// Place the low `width` bits of `value` at bit `shift`
fn place(value: u8, shift: u8, width: u8) -> u8 {
    (value & ((1u16 << width) - 1) as u8) << shift
}

fn flag(byte: u8, bit: u8) -> bool {
    field(byte, bit, 1) == 1
}

// NETWORK STATUS (reply body of ESC W 0x0c, response id 0x8c)
// byte | bits | field
// 0    | 0-2  | general_status
//      | 3-5  | wifi_scan_status
//      | 6-7  | flash_status
// 1    | 0-3  | wifi_connection_status
//      | 4-7  | wifi_network_status
// 2    | 0-3  | wired_connection_status
//      | 4-7  | wired_network_status
// 3    | 0-6  | wifi_signal_strength
//      | 7    | wifi_signal_status
// 4    | 0-6  | flash_updating_progress
//      | 7    | flash_updating_readiness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkStatus {
    pub general_status: u8,
    pub wifi_scan_status: u8,
    pub flash_status: u8,
    pub wifi_connection_status: u8,
    pub wifi_network_status: u8,
    pub wired_connection_status: u8,
    pub wired_network_status: u8,
    pub wifi_signal_strength: u8,
    pub wifi_signal_status: u8,
    pub flash_updating_progress: u8,
    pub flash_updating_readiness: u8,
}

/// How far the device got with joining the configured network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionOutcome {
    Pending,
    Connected,
    /// Terminal failure, carries the raw connection status (>= 3)
    Failed(u8),
}

impl NetworkStatus {
    pub const LEN: usize = 5;

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::LEN {
            return Err(DecodeError::short("network status", Self::LEN, data.len()));
        }
        Ok(Self {
            general_status: field(data[0], 0, 3),
            wifi_scan_status: field(data[0], 3, 3),
            flash_status: field(data[0], 6, 2),
            wifi_connection_status: field(data[1], 0, 4),
            wifi_network_status: field(data[1], 4, 4),
            wired_connection_status: field(data[2], 0, 4),
            wired_network_status: field(data[2], 4, 4),
            wifi_signal_strength: field(data[3], 0, 7),
            wifi_signal_status: field(data[3], 7, 1),
            flash_updating_progress: field(data[4], 0, 7),
            flash_updating_readiness: field(data[4], 7, 1),
        })
    }

    /// Re-pack into the wire layout. Out-of-range values are masked.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            place(self.general_status, 0, 3)
                | place(self.wifi_scan_status, 3, 3)
                | place(self.flash_status, 6, 2),
            place(self.wifi_connection_status, 0, 4) | place(self.wifi_network_status, 4, 4),
            place(self.wired_connection_status, 0, 4) | place(self.wired_network_status, 4, 4),
            place(self.wifi_signal_strength, 0, 7) | place(self.wifi_signal_status, 7, 1),
            place(self.flash_updating_progress, 0, 7) | place(self.flash_updating_readiness, 7, 1),
        ]
    }

    /// Radio is up and can take scan / config requests
    pub fn is_radio_ready(&self) -> bool {
        matches!(self.wifi_network_status, 1 | 3)
    }

    pub fn is_scan_complete(&self) -> bool {
        self.wifi_scan_status == 2
    }

    pub fn connection_outcome(&self) -> ConnectionOutcome {
        match self.wifi_connection_status {
            2 => ConnectionOutcome::Connected,
            code if code >= 3 => ConnectionOutcome::Failed(code),
            _ => ConnectionOutcome::Pending,
        }
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "general status:           {}", self.general_status)?;
        writeln!(f, "wifi scan status:         {}", self.wifi_scan_status)?;
        writeln!(f, "flash status:             {}", self.flash_status)?;
        writeln!(f, "wifi connection status:   {}", self.wifi_connection_status)?;
        writeln!(f, "wifi network status:      {}", self.wifi_network_status)?;
        writeln!(f, "wired connection status:  {}", self.wired_connection_status)?;
        writeln!(f, "wired network status:     {}", self.wired_network_status)?;
        writeln!(f, "wifi signal strength:     {}", self.wifi_signal_strength)?;
        writeln!(f, "wifi signal status:       {}", self.wifi_signal_status)?;
        writeln!(f, "flash updating progress:  {}", self.flash_updating_progress)?;
        write!(f, "flash updating readiness: {}", self.flash_updating_readiness)
    }
}

pub fn decode_network_status(body: &[u8]) -> Result<NetworkStatus, DecodeError> {
    NetworkStatus::from_bytes(body)
}

// SYSTEM STATUS (reply to ESC A, no object header)
// byte | bits | field
// 0    | 0-1  | reserved
//      | 2    | tape_jam
//      | 3    | overheated
//      | 4    | cutter_jam
//      | 5    | printer_busy
//      | 6    | cassette_present
//      | 7    | auto_cutter_enabled
// 1    |      | tape_width_detail
// 2    | 0-3  | battery_details
//      | 4-5  | battery_status
//      | 6    | external_pwr_present
//      | 7    | low_power
// 3    |      | battery_charge_level
// 4-5  |      | raw_battery_voltage (u16 LE)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SystemStatus {
    pub reserved: u8,
    pub tape_jam: bool,
    pub overheated: bool,
    pub cutter_jam: bool,
    pub printer_busy: bool,
    pub cassette_present: bool,
    pub auto_cutter_enabled: bool,
    pub tape_width_detail: u8,
    pub battery_details: u8,
    pub battery_status: u8,
    pub external_pwr_present: bool,
    pub low_power: bool,
    pub battery_charge_level: u8,
    pub raw_battery_voltage: u16,
}

impl SystemStatus {
    pub const LEN: usize = 6;

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::LEN {
            return Err(DecodeError::short("system status", Self::LEN, data.len()));
        }
        Ok(Self {
            reserved: field(data[0], 0, 2),
            tape_jam: flag(data[0], 2),
            overheated: flag(data[0], 3),
            cutter_jam: flag(data[0], 4),
            printer_busy: flag(data[0], 5),
            cassette_present: flag(data[0], 6),
            auto_cutter_enabled: flag(data[0], 7),
            tape_width_detail: data[1],
            battery_details: field(data[2], 0, 4),
            battery_status: field(data[2], 4, 2),
            external_pwr_present: flag(data[2], 6),
            low_power: flag(data[2], 7),
            battery_charge_level: data[3],
            raw_battery_voltage: u16::from_le_bytes([data[4], data[5]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let voltage = self.raw_battery_voltage.to_le_bytes();
        [
            place(self.reserved, 0, 2)
                | place(self.tape_jam as u8, 2, 1)
                | place(self.overheated as u8, 3, 1)
                | place(self.cutter_jam as u8, 4, 1)
                | place(self.printer_busy as u8, 5, 1)
                | place(self.cassette_present as u8, 6, 1)
                | place(self.auto_cutter_enabled as u8, 7, 1),
            self.tape_width_detail,
            place(self.battery_details, 0, 4)
                | place(self.battery_status, 4, 2)
                | place(self.external_pwr_present as u8, 6, 1)
                | place(self.low_power as u8, 7, 1),
            self.battery_charge_level,
            voltage[0],
            voltage[1],
        ]
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tape jam:             {}", self.tape_jam)?;
        writeln!(f, "overheated:           {}", self.overheated)?;
        writeln!(f, "cutter jam:           {}", self.cutter_jam)?;
        writeln!(f, "printer busy:         {}", self.printer_busy)?;
        writeln!(f, "cassette present:     {}", self.cassette_present)?;
        writeln!(f, "auto cutter enabled:  {}", self.auto_cutter_enabled)?;
        writeln!(f, "tape width detail:    {}", self.tape_width_detail)?;
        writeln!(f, "battery details:      {}", self.battery_details)?;
        writeln!(f, "battery status:       {}", self.battery_status)?;
        writeln!(f, "external power:       {}", self.external_pwr_present)?;
        writeln!(f, "low power:            {}", self.low_power)?;
        writeln!(f, "battery charge level: {}", self.battery_charge_level)?;
        write!(f, "raw battery voltage:  {}", self.raw_battery_voltage)
    }
}

pub fn decode_system_status(body: &[u8]) -> Result<SystemStatus, DecodeError> {
    SystemStatus::from_bytes(body)
}
