//! USB transport for the LabelManager Wireless PnP
//!
//! Finds the printer by vendor/product id, claims its HID interface and moves
//! 64 byte interrupt transfers with a timeout on each one.
//!
//! # Example
//!
//! ```ignore
//! use dymo_device::LabelManager;
//! use dymo_usb::UsbTransport;
//!
//! let transport = UsbTransport::open()?;
//! println!("serial no. {}", transport.serial_number().unwrap_or("unknown"));
//! let mut device = LabelManager::new(transport);
//! println!("{}", device.system_status()?);
//! ```

pub mod usb;

pub use usb::{Endpoints, InterfaceDescriptor, OpenError, UsbTransport, WRITE_TIMEOUT};
