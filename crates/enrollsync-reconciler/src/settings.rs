//! Runtime settings consumed by the flows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ReconcilerError, ReconcilerResult};

/// Global sync switch and confirm interval.
///
/// Both values are kept as supplied so that a misconfiguration is reported
/// by the flow that consumes it rather than rejected at startup: enroll treats
/// a bad switch as "off", confirm refuses to run without a valid interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Raw global sync switch.
    #[serde(default)]
    pub sync_enabled: Option<String>,
    /// Raw confirm interval, in whole hours.
    #[serde(default)]
    pub confirm_interval_hours: Option<String>,
}

impl SyncSettings {
    #[must_use]
    pub fn new(sync_enabled: Option<String>, confirm_interval_hours: Option<String>) -> Self {
        Self {
            sync_enabled,
            confirm_interval_hours,
        }
    }

    /// Sync on, with the given confirm interval.
    #[must_use]
    pub fn enabled(confirm_interval_hours: u32) -> Self {
        Self::new(
            Some("true".to_string()),
            Some(confirm_interval_hours.to_string()),
        )
    }

    /// Sync explicitly off.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Some("false".to_string()), None)
    }

    /// Parsed switch. `None` when unset or unparseable.
    #[must_use]
    pub fn sync_switch(&self) -> Option<bool> {
        self.sync_enabled.as_deref().and_then(parse_switch)
    }

    /// Whether sync is on. Unset or unparseable values count as off.
    #[must_use]
    pub fn is_sync_enabled(&self) -> bool {
        match self.sync_switch() {
            Some(enabled) => enabled,
            None => {
                warn!(
                    raw = ?self.sync_enabled,
                    "Global sync switch is unset or invalid, treating as disabled"
                );
                false
            }
        }
    }

    /// Confirm staleness interval.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcilerError::InvalidConfiguration`] unless the interval
    /// is a positive whole number of hours that fits in a [`Duration`].
    pub fn confirm_interval(&self) -> ReconcilerResult<Duration> {
        let raw = self
            .confirm_interval_hours
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ReconcilerError::InvalidConfiguration {
                message: "confirm interval is not set".to_string(),
            })?;

        match raw.parse::<i64>() {
            Ok(hours) if hours > 0 => {
                Duration::try_hours(hours).ok_or_else(|| ReconcilerError::InvalidConfiguration {
                    message: format!("confirm interval of {hours} hours is out of range"),
                })
            }
            _ => Err(ReconcilerError::InvalidConfiguration {
                message: format!(
                    "confirm interval must be a positive whole number of hours, got '{raw}'"
                ),
            }),
        }
    }

    /// Instant before which a device is due for confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcilerError::InvalidConfiguration`] if the interval is
    /// invalid or reaches further back than `DateTime` can represent.
    pub fn confirm_cutoff(&self, now: DateTime<Utc>) -> ReconcilerResult<DateTime<Utc>> {
        let interval = self.confirm_interval()?;
        now.checked_sub_signed(interval)
            .ok_or_else(|| ReconcilerError::InvalidConfiguration {
                message: format!(
                    "confirm interval of {} hours is out of range",
                    interval.num_hours()
                ),
            })
    }
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
