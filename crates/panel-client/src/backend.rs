use async_trait::async_trait;
use panel_core::models::{
    BusinessRecord, CategoryCatalog, ExportRequest, JobStatus, MonitoringConfig, RecordFilter,
    Statistics,
};
use panel_core::Result;
use serde_json::Value;

use crate::api::ExportSummary;

/// The scraper backend as seen by the control panel.
///
/// Every method is a single request/response. Transport and decode failures
/// come back as [`PanelError::Transport`]/[`PanelError::JsonParse`];
/// `success: false` replies come back as [`PanelError::Rejected`].
/// Implementations never retry and never time out on their own.
///
/// [`PanelError::Transport`]: panel_core::PanelError::Transport
/// [`PanelError::JsonParse`]: panel_core::PanelError::JsonParse
/// [`PanelError::Rejected`]: panel_core::PanelError::Rejected
#[async_trait]
pub trait Backend: Send + Sync {
    /// Raw `monitoring` payload of the persisted config, `Null` when none is saved.
    async fn get_config(&self) -> Result<Value>;

    async fn save_config(&self, config: &MonitoringConfig) -> Result<()>;

    async fn get_statistics(&self) -> Result<Statistics>;

    async fn get_businesses(&self, filter: RecordFilter) -> Result<Vec<BusinessRecord>>;

    async fn get_categories(&self) -> Result<CategoryCatalog>;

    async fn get_status(&self) -> Result<JobStatus>;

    async fn start_job(&self) -> Result<()>;

    async fn stop_job(&self) -> Result<()>;

    async fn export(&self, request: &ExportRequest) -> Result<ExportSummary>;
}
