//! # Device Reconciler
//!
//! Periodic flows that keep the device registry consistent with the identity
//! directory and the device inventory.
//!
//! ## Flows
//!
//! - **Enroll** - `Added` devices are registered with the directory
//!   (`Synced`) or parked (`NotSyncing`) according to their tag
//! - **Confirm** - settled devices older than the confirm interval are
//!   re-checked and drift is corrected
//! - **Retire** - `Deleting` devices are removed from the inventory, then the
//!   directory, then the registry
//!
//! Flows operate on disjoint status sets and may overlap with each other.
//! Per-device failures are recorded in the [`RunSummary`] and retried on the
//! next run; only run-level failures surface as [`ReconcilerError`].
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use enrollsync_reconciler::{FlowSchedule, FlowScheduler, Reconciler, SyncSettings};
//!
//! let reconciler = Reconciler::new(registry, tags, directory, inventory, SyncSettings::enabled(24));
//! let summary = reconciler.run_enroll().await?;
//!
//! FlowScheduler::new(Arc::new(reconciler), FlowSchedule::default())
//!     .run(shutdown)
//!     .await;
//! ```

pub mod confirm;
pub mod engine;
pub mod enroll;
pub mod error;
pub mod outcome;
pub mod retire;
pub mod scheduler;
pub mod settings;

pub use engine::Reconciler;
pub use enroll::ENROLL_BATCH_LIMIT;
pub use error::{ReconcilerError, ReconcilerResult};
pub use outcome::{DeviceFailure, DeviceOutcome, FailedStep, FlowKind, RunSummary, SkipReason};
pub use scheduler::{FlowSchedule, FlowScheduler};
pub use settings::SyncSettings;
