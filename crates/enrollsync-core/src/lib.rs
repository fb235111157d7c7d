//! enrollsync Core Library
//!
//! Domain model shared by the enrollsync crates.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (`DeviceId`, `TagId`)
//! - [`device`] - Device records and the status state machine
//! - [`tag`] - Tags carrying the per-tag sync policy
//! - [`identifier`] - OS-dependent canonical identifier policy
//!
//! # Example
//!
//! ```
//! use enrollsync_core::{Device, IdentifierType, OsKind};
//!
//! let device = Device::new("Dell", "Latitude 5420", "ABC123").with_os(OsKind::Windows);
//! let identifier = device.canonical_identifier().unwrap();
//!
//! assert_eq!(identifier.identifier_type, IdentifierType::ManufacturerModelSerial);
//! assert_eq!(identifier.value, r#""Dell","Latitude 5420",ABC123"#);
//! ```

pub mod device;
pub mod identifier;
pub mod ids;
pub mod tag;

pub use device::{
    Device, DeviceStatus, HardwareTriple, OsKind, ParseDeviceStatusError, TransitionError,
};
pub use identifier::{canonical_identifier, CanonicalIdentifier, IdentifierError, IdentifierType};
pub use ids::{DeviceId, ParseIdError, TagId};
pub use tag::Tag;
