use async_trait::async_trait;
use panel_core::models::{
    BusinessRecord, CategoryCatalog, ExportRequest, JobStatus, MonitoringConfig, RecordFilter,
    Statistics,
};
use panel_core::{PanelError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::{
    Ack, BusinessesReply, CategoriesReply, ConfigReply, ExportReply, ExportSummary,
    StatisticsReply, StatusReply,
};
use crate::backend::Backend;

/// [`Backend`] speaking JSON over HTTP to the scraper's web server.
///
/// Non-2xx statuses are not errors by themselves: the backend reports
/// failures as `{"success": false, "error": ...}` bodies with a 500 status,
/// so every body is decoded and judged by its `success` flag.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a backend rooted at `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("scraper-panel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PanelError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Build a backend around an existing client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        tracing::debug!(path, ?query, "GET");
        let request = self.client.get(self.url(path)).query(query);
        Self::decode(path, request).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        tracing::debug!(path, "POST");
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::decode(path, request).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| PanelError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PanelError::Transport(e.to_string()))?;
        if !status.is_success() {
            tracing::debug!(path, %status, "backend answered with an error status");
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_config(&self) -> Result<Value> {
        let reply: ConfigReply = self.get_json("/api/config", &[]).await?;
        reply.into_monitoring()
    }

    async fn save_config(&self, config: &MonitoringConfig) -> Result<()> {
        let body = json!({ "monitoring": config });
        let ack: Ack = self.post_json("/api/config", Some(&body)).await?;
        ack.into_result("save config")
    }

    async fn get_statistics(&self) -> Result<Statistics> {
        let reply: StatisticsReply = self.get_json("/api/statistics", &[]).await?;
        reply.into_statistics()
    }

    async fn get_businesses(&self, filter: RecordFilter) -> Result<Vec<BusinessRecord>> {
        let mut query = vec![("limit", filter.limit.to_string())];
        if filter.days > 0 {
            query.push(("days", filter.days.to_string()));
        }
        let reply: BusinessesReply = self.get_json("/api/businesses", &query).await?;
        reply.into_records()
    }

    async fn get_categories(&self) -> Result<CategoryCatalog> {
        let reply: CategoriesReply = self.get_json("/api/categories", &[]).await?;
        reply.into_catalog()
    }

    async fn get_status(&self) -> Result<JobStatus> {
        let reply: StatusReply = self.get_json("/api/scraper/status", &[]).await?;
        reply.into_status()
    }

    async fn start_job(&self) -> Result<()> {
        let ack: Ack = self.post_json::<_, Value>("/api/scraper/start", None).await?;
        ack.into_result("start job")
    }

    async fn stop_job(&self) -> Result<()> {
        let ack: Ack = self.post_json::<_, Value>("/api/scraper/stop", None).await?;
        ack.into_result("stop job")
    }

    async fn export(&self, request: &ExportRequest) -> Result<ExportSummary> {
        let reply: ExportReply = self.post_json("/api/export", Some(request)).await?;
        reply.into_summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("http://localhost:8080/").unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080");
        assert_eq!(backend.url("/api/config"), "http://localhost:8080/api/config");
    }
}
