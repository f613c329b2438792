//! Live session state for the scraper control panel.
//!
//! Everything here runs on the tokio runtime: the recurring status and
//! statistics polls, toast expiry, settle polls after job commands and the
//! delayed hand-off to the dashboard after first-time setup.

pub mod busy;
pub mod config_sync;
pub mod job_monitor;
pub mod notifications;
pub mod session;
pub mod tasks;

#[cfg(test)]
mod fake;

pub use config_sync::{ConfigLoad, ConfigSynchronizer};
pub use job_monitor::{JobMonitor, JobSnapshot, PollerHandle};
pub use notifications::{NotificationCenter, Toast, ToastKind};
pub use session::{Session, SessionSnapshot};
