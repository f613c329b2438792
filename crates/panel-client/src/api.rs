//! JSON envelopes exchanged with the scraper backend.
//!
//! Every reply carries `success` and, when it is `false`, an optional
//! `error`. The payload field is only trusted on success.

use panel_core::models::{BusinessRecord, CategoryCatalog, JobStatus, Statistics};
use panel_core::{PanelError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shared `success`/`error` head of every reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Ack {
    /// `Ok(())` on success, [`PanelError::Rejected`] otherwise.
    pub fn into_result(self, operation: &'static str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(PanelError::rejected(operation, self.error))
        }
    }
}

/// `GET /api/config`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigReply {
    #[serde(flatten)]
    pub ack: Ack,
    #[serde(default)]
    pub config: Option<ConfigDocument>,
    /// Set by the backend when it answered with its own template.
    #[serde(default)]
    pub is_default: bool,
}

/// The persisted config document; only `monitoring` is consumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub monitoring: Value,
}

impl ConfigReply {
    /// The raw `monitoring` payload, `Null` when the document lacks one.
    pub fn into_monitoring(self) -> Result<Value> {
        let is_default = self.is_default;
        self.ack.into_result("load config")?;
        if is_default {
            return Ok(Value::Null);
        }
        Ok(self.config.map(|c| c.monitoring).unwrap_or(Value::Null))
    }
}

/// `GET /api/statistics`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsReply {
    #[serde(flatten)]
    pub ack: Ack,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

impl StatisticsReply {
    pub fn into_statistics(self) -> Result<Statistics> {
        self.ack.into_result("load statistics")?;
        Ok(self.statistics.unwrap_or_default())
    }
}

/// `GET /api/businesses`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessesReply {
    #[serde(flatten)]
    pub ack: Ack,
    #[serde(default)]
    pub businesses: Option<Vec<BusinessRecord>>,
}

impl BusinessesReply {
    pub fn into_records(self) -> Result<Vec<BusinessRecord>> {
        self.ack.into_result("load businesses")?;
        Ok(self.businesses.unwrap_or_default())
    }
}

/// `GET /api/categories`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoriesReply {
    #[serde(flatten)]
    pub ack: Ack,
    #[serde(default)]
    pub categories: Option<CategoryCatalog>,
}

impl CategoriesReply {
    pub fn into_catalog(self) -> Result<CategoryCatalog> {
        self.ack.into_result("load categories")?;
        match self.categories {
            Some(catalog) if !catalog.is_empty() => Ok(catalog),
            _ => Err(PanelError::rejected(
                "load categories",
                Some("empty category catalog".to_string()),
            )),
        }
    }
}

/// `GET /api/scraper/status`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReply {
    #[serde(flatten)]
    pub ack: Ack,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

impl StatusReply {
    pub fn into_status(self) -> Result<JobStatus> {
        self.ack.into_result("load job status")?;
        self.status
            .ok_or_else(|| PanelError::rejected("load job status", Some("missing status".into())))
    }
}

/// `POST /api/export`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportReply {
    #[serde(flatten)]
    pub ack: Ack,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub filename: Option<String>,
}

/// What the backend reports after writing an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub message: String,
    pub count: u64,
    pub filename: Option<String>,
}

impl ExportReply {
    pub fn into_summary(self) -> Result<ExportSummary> {
        let message = self.ack.message.clone().unwrap_or_default();
        self.ack.into_result("export")?;
        Ok(ExportSummary {
            message,
            count: self.count,
            filename: self.filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode<T: serde::de::DeserializeOwned>(v: Value) -> T {
        serde_json::from_value(v).expect("decode")
    }

    #[test]
    fn test_ack_rejected_keeps_server_error() {
        let ack: Ack = decode(json!({"success": false, "error": "Scraper is not running"}));
        match ack.into_result("stop job") {
            Err(PanelError::Rejected { operation, message }) => {
                assert_eq!(operation, "stop job");
                assert_eq!(message.as_deref(), Some("Scraper is not running"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_ack_missing_success_is_failure() {
        let ack: Ack = decode(json!({}));
        assert!(ack.into_result("start job").is_err());
    }

    #[test]
    fn test_config_reply_monitoring_payload() {
        let reply: ConfigReply = decode(json!({
            "success": true,
            "config": {"monitoring": {"category": "gym"}, "notifications": {}}
        }));
        assert_eq!(reply.into_monitoring().unwrap(), json!({"category": "gym"}));
    }

    #[test]
    fn test_config_reply_backend_template_is_not_a_saved_config() {
        let reply: ConfigReply = decode(json!({
            "success": true,
            "is_default": true,
            "config": {"monitoring": {"category": "restaurant"}}
        }));
        assert_eq!(reply.into_monitoring().unwrap(), Value::Null);
    }

    #[test]
    fn test_config_reply_without_document() {
        let reply: ConfigReply = decode(json!({"success": true}));
        assert_eq!(reply.into_monitoring().unwrap(), Value::Null);
    }

    #[test]
    fn test_statistics_reply() {
        let reply: StatisticsReply = decode(json!({
            "success": true,
            "statistics": {"total_businesses": 12, "new_this_week": 3}
        }));
        let stats = reply.into_statistics().unwrap();
        assert_eq!(stats.get("total_businesses"), 12.0);
        assert_eq!(stats.get("new_this_week"), 3.0);
    }

    #[test]
    fn test_categories_reply_empty_is_error() {
        let reply: CategoriesReply = decode(json!({"success": true, "categories": {}}));
        assert!(reply.into_catalog().is_err());
    }

    #[test]
    fn test_status_reply_requires_status() {
        let reply: StatusReply = decode(json!({"success": true}));
        assert!(reply.into_status().is_err());
        let reply: StatusReply =
            decode(json!({"success": true, "status": {"running": true, "stats": {"total_cycles": 2}}}));
        let status = reply.into_status().unwrap();
        assert!(status.running);
        assert_eq!(status.stats["total_cycles"], 2.0);
    }

    #[test]
    fn test_export_reply_summary() {
        let reply: ExportReply = decode(json!({
            "success": true,
            "message": "Exported 4 businesses to out.csv",
            "filename": "out.csv",
            "count": 4
        }));
        let summary = reply.into_summary().unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.filename.as_deref(), Some("out.csv"));
        assert_eq!(summary.message, "Exported 4 businesses to out.csv");
    }
}
