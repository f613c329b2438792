//! Backend collaborator of the scraper control panel.
//!
//! [`Backend`] is the request/response contract the runtime consumes;
//! [`HttpBackend`] implements it against the scraper's JSON web API.

pub mod api;
pub mod backend;
pub mod http;

pub use api::ExportSummary;
pub use backend::Backend;
pub use http::HttpBackend;
