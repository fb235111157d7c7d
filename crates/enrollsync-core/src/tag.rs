//! Tags carrying the per-tag sync policy.

use serde::{Deserialize, Serialize};

use crate::ids::TagId;

/// A device tag. Devices reference at most one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Whether devices with this tag are registered with the identity directory.
    #[serde(default)]
    pub sync_enabled: bool,
}

impl Tag {
    #[must_use]
    pub fn new(name: impl Into<String>, sync_enabled: bool) -> Self {
        Self {
            id: TagId::new(),
            name: name.into(),
            sync_enabled,
        }
    }
}
