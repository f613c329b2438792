//! Domain layer of the scraper control panel.
//!
//! Pure types and functions only: the monitoring config and its editable
//! form, job status and statistics, records, settings and timings.

pub mod error;
pub mod form;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod timings;

pub use error::{PanelError, Result};
