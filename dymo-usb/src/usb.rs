//! nusb backed [`Transport`]
//!
//! Transfers are async in nusb; each one is driven to completion on a
//! private current-thread runtime and bounded with `tokio::time::timeout`.
//! Dropping an unfinished transfer cancels it.

use std::future::Future;
use std::time::Duration;

use log::{debug, info};
use nusb::transfer::{RequestBuffer, TransferError};
use nusb::{DeviceInfo, Interface};
use tokio::runtime::Runtime;

use dymo_device::{Error, Transport, TransportError};
use dymo_proto::{INTERFACE_CLASS_HID, PRODUCT_IDS, VENDOR_ID};

/// Writes are not expected to stall; this only guards against a wedged device
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(thiserror::Error, Debug)]
pub enum OpenError {
    #[error("no USB device {vendor_id:04x}:{product_ids:04x?}")]
    NotFound { vendor_id: u16, product_ids: Vec<u16> },
    #[error("USB enumeration failed: {0}")]
    Enumerate(#[source] std::io::Error),
    #[error("cannot open {vendor_id:04x}:{product_id:04x}: {source}")]
    Open {
        vendor_id: u16,
        product_id: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read active configuration: {0}")]
    Configuration(String),
    #[error("no HID interface with both an IN and an OUT endpoint")]
    NoEndpoints,
    #[error("cannot claim interface {interface}: {source}")]
    Claim {
        interface: u8,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot start USB transfer runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl From<OpenError> for Error {
    fn from(err: OpenError) -> Self {
        match &err {
            OpenError::NotFound { .. } => Error::DeviceNotFound(err.to_string()),
            _ => Error::Unavailable(err.to_string()),
        }
    }
}

/// One alternate setting as seen in the active configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub number: u8,
    pub class: u8,
    /// Endpoint addresses; bit 7 set means IN
    pub endpoints: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub interface: u8,
    pub ep_in: u8,
    pub ep_out: u8,
}

impl Endpoints {
    /// First HID interface carrying an IN and an OUT endpoint
    pub fn resolve(interfaces: &[InterfaceDescriptor]) -> Option<Self> {
        interfaces
            .iter()
            .filter(|i| i.class == INTERFACE_CLASS_HID)
            .find_map(|i| {
                let ep_in = i.endpoints.iter().copied().find(|a| a & 0x80 != 0)?;
                let ep_out = i.endpoints.iter().copied().find(|a| a & 0x80 == 0)?;
                Some(Endpoints {
                    interface: i.number,
                    ep_in,
                    ep_out,
                })
            })
    }
}

/// Index into `found` of the device to use. Product ids are tried in the
/// order given, so the preferred personality wins when both are attached.
fn pick_device(found: &[(u16, u16)], vendor_id: u16, product_ids: &[u16]) -> Option<usize> {
    product_ids
        .iter()
        .find_map(|pid| found.iter().position(|&(v, p)| v == vendor_id && p == *pid))
}

/// Exclusive handle on the printer's HID interface. The claim ends when
/// the inner `nusb::Interface` is dropped.
pub struct UsbTransport {
    interface: Interface,
    endpoints: Endpoints,
    serial_number: Option<String>,
    runtime: Runtime,
}

impl UsbTransport {
    /// Open the first LabelManager, preferring product `0x1008`
    pub fn open() -> Result<Self, OpenError> {
        Self::open_with(VENDOR_ID, &PRODUCT_IDS)
    }

    pub fn open_with(vendor_id: u16, product_ids: &[u16]) -> Result<Self, OpenError> {
        let devices: Vec<DeviceInfo> = nusb::list_devices().map_err(OpenError::Enumerate)?.collect();
        let ids: Vec<(u16, u16)> = devices
            .iter()
            .map(|d| (d.vendor_id(), d.product_id()))
            .collect();
        let index = pick_device(&ids, vendor_id, product_ids).ok_or_else(|| OpenError::NotFound {
            vendor_id,
            product_ids: product_ids.to_vec(),
        })?;
        let info = &devices[index];
        let product_id = info.product_id();
        let serial_number = info.serial_number().map(str::to_owned);
        info!(
            "found LabelManager {vendor_id:04x}:{product_id:04x} on bus {} addr {}",
            info.bus_number(),
            info.device_address()
        );

        let device = info.open().map_err(|source| OpenError::Open {
            vendor_id,
            product_id,
            source,
        })?;

        let interfaces: Vec<InterfaceDescriptor> = device
            .active_configuration()
            .map_err(|e| OpenError::Configuration(e.to_string()))?
            .interface_alt_settings()
            .map(|alt| InterfaceDescriptor {
                number: alt.interface_number(),
                class: alt.class(),
                endpoints: alt.endpoints().map(|ep| ep.address()).collect(),
            })
            .collect();
        let endpoints = Endpoints::resolve(&interfaces).ok_or(OpenError::NoEndpoints)?;
        debug!(
            "using interface {} (in 0x{:02x}, out 0x{:02x})",
            endpoints.interface, endpoints.ep_in, endpoints.ep_out
        );

        let interface = device
            .detach_and_claim_interface(endpoints.interface)
            .map_err(|source| OpenError::Claim {
                interface: endpoints.interface,
                source,
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(OpenError::Runtime)?;

        Ok(Self {
            interface,
            endpoints,
            serial_number,
            runtime,
        })
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    fn run<F, T>(&self, timeout: Duration, transfer: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransferError>>,
    {
        self.runtime
            .block_on(tokio::time::timeout(timeout, transfer))
            .map_err(|_| TransportError::timeout(timeout))?
            .map_err(transfer_error)
    }
}

fn transfer_error(err: TransferError) -> TransportError {
    match err {
        TransferError::Disconnected => TransportError::Disconnected,
        other => TransportError::Io(other.to_string()),
    }
}

impl Transport for UsbTransport {
    fn write(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        let transfer = self
            .interface
            .interrupt_out(self.endpoints.ep_out, packet.to_vec());
        self.run(WRITE_TIMEOUT, async move { transfer.await.into_result() })?;
        Ok(())
    }

    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let transfer = self
            .interface
            .interrupt_in(self.endpoints.ep_in, RequestBuffer::new(max_len));
        self.run(timeout, async move { transfer.await.into_result() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hid(number: u8, endpoints: &[u8]) -> InterfaceDescriptor {
        InterfaceDescriptor {
            number,
            class: INTERFACE_CLASS_HID,
            endpoints: endpoints.to_vec(),
        }
    }

    #[test]
    fn resolves_hid_endpoints() {
        let interfaces = [
            InterfaceDescriptor {
                number: 0,
                class: 0x07,
                endpoints: vec![0x81, 0x02],
            },
            hid(1, &[0x83, 0x04]),
        ];
        assert_eq!(
            Endpoints::resolve(&interfaces),
            Some(Endpoints {
                interface: 1,
                ep_in: 0x83,
                ep_out: 0x04
            })
        );
    }

    #[test]
    fn hid_interface_needs_both_directions() {
        assert_eq!(Endpoints::resolve(&[hid(0, &[0x81])]), None);
        assert_eq!(
            Endpoints::resolve(&[hid(0, &[0x81]), hid(2, &[0x01, 0x82])]).map(|e| e.interface),
            Some(2)
        );
    }

    #[test]
    fn preferred_product_id_wins() {
        let found = [(0x0922, 0x1007), (0x046d, 0x1008), (0x0922, 0x1008)];
        assert_eq!(pick_device(&found, VENDOR_ID, &PRODUCT_IDS), Some(2));
        assert_eq!(pick_device(&found[..2], VENDOR_ID, &PRODUCT_IDS), Some(0));
        assert_eq!(pick_device(&found[1..2], VENDOR_ID, &PRODUCT_IDS), None);
    }

    #[test]
    fn not_found_maps_to_device_not_found() {
        let err: Error = OpenError::NotFound {
            vendor_id: VENDOR_ID,
            product_ids: PRODUCT_IDS.to_vec(),
        }
        .into();
        assert!(matches!(err, Error::DeviceNotFound(_)));

        let err: Error = OpenError::NoEndpoints.into();
        assert!(matches!(err, Error::Unavailable(_)));
    }

    #[test]
    fn transfer_errors() {
        assert_eq!(transfer_error(TransferError::Disconnected), TransportError::Disconnected);
        assert!(matches!(transfer_error(TransferError::Stall), TransportError::Io(_)));
    }
}
