//! Canonical hardware identifier policy.
//!
//! The identity directory accepts two identifier shapes. Which one a device
//! gets depends only on its operating system:
//!
//! | OS                      | Type                      | Value                         |
//! |-------------------------|---------------------------|-------------------------------|
//! | Windows, Unknown        | `ManufacturerModelSerial` | `"<make>","<model>",<serial>` |
//! | MacOS, iOS, Android     | `SerialNumber`            | `<serial>`                    |
//!
//! Make and model are quoted because the directory splits the value on
//! commas and both fields may contain one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::device::OsKind;

/// Identifier shape registered with the identity directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentifierType {
    ManufacturerModelSerial,
    SerialNumber,
}

impl IdentifierType {
    /// Get the string representation used by the directory and the registry.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::ManufacturerModelSerial => "manufacturerModelSerial",
            IdentifierType::SerialNumber => "serialNumber",
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IdentifierType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manufacturermodelserial" => Ok(IdentifierType::ManufacturerModelSerial),
            "serialnumber" => Ok(IdentifierType::SerialNumber),
            _ => Err(IdentifierError::UnknownIdentifierType(s.to_string())),
        }
    }
}

/// Identifier string submitted to the directory together with its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIdentifier {
    pub identifier_type: IdentifierType,
    pub value: String,
}

/// Errors produced by the identifier policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The device OS has no identifier rule.
    #[error("unsupported OS kind: {0}")]
    UnsupportedOsKind(String),

    #[error("unknown identifier type: {0}")]
    UnknownIdentifierType(String),
}

/// Compute the canonical identifier for a device.
///
/// # Errors
///
/// Returns [`IdentifierError::UnsupportedOsKind`] for an OS outside the
/// policy table.
pub fn canonical_identifier(
    os: &OsKind,
    make: &str,
    model: &str,
    serial_number: &str,
) -> Result<CanonicalIdentifier, IdentifierError> {
    match os {
        OsKind::Windows | OsKind::Unknown => Ok(CanonicalIdentifier {
            identifier_type: IdentifierType::ManufacturerModelSerial,
            value: format!("\"{make}\",\"{model}\",{serial_number}"),
        }),
        OsKind::MacOs | OsKind::Ios | OsKind::Android => Ok(CanonicalIdentifier {
            identifier_type: IdentifierType::SerialNumber,
            value: serial_number.to_string(),
        }),
        OsKind::Unsupported(raw) => Err(IdentifierError::UnsupportedOsKind(raw.clone())),
    }
}

impl crate::device::Device {
    /// Canonical identifier for this device's OS and hardware triple.
    ///
    /// # Errors
    ///
    /// See [`canonical_identifier`].
    pub fn canonical_identifier(&self) -> Result<CanonicalIdentifier, IdentifierError> {
        canonical_identifier(&self.os, &self.make, &self.model, &self.serial_number)
    }
}
