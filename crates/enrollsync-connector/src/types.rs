//! Records returned by the external systems.

use serde::{Deserialize, Serialize};

use enrollsync_core::{CanonicalIdentifier, HardwareTriple, IdentifierType};

/// A record in the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Id assigned by the directory.
    pub id: String,
    /// Canonical value as stored by the directory.
    pub value: String,
    pub identifier_type: IdentifierType,
}

impl DirectoryRecord {
    /// Split into the directory id and the identifier as the directory stores it.
    #[must_use]
    pub fn into_parts(self) -> (String, CanonicalIdentifier) {
        (
            self.id,
            CanonicalIdentifier {
                identifier_type: self.identifier_type,
                value: self.value,
            },
        )
    }
}

/// A managed-device record in the device inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedDevice {
    pub id: String,
    pub make: String,
    pub model: String,
    pub serial_number: String,
}

impl ManagedDevice {
    /// Exact, case-sensitive match against a hardware triple.
    #[must_use]
    pub fn matches(&self, triple: &HardwareTriple<'_>) -> bool {
        self.make == triple.make
            && self.model == triple.model
            && self.serial_number == triple.serial_number
    }
}
