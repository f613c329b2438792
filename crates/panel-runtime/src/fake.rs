//! Scripted in-memory [`Backend`] for runtime tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use panel_client::{Backend, ExportSummary};
use panel_core::models::{
    BusinessRecord, CategoryCatalog, ExportRequest, JobStatus, MonitoringConfig, RecordFilter,
    Statistics,
};
use panel_core::{PanelError, Result};
use serde_json::Value;

/// How the fake answers one call.
#[derive(Debug, Clone)]
pub(crate) enum Step<T> {
    Ok(T),
    /// Answer after a delay.
    Slow(Duration, T),
    /// Connection-level failure.
    Transport,
    /// `success: false` with an optional server message.
    Rejected(Option<String>),
    /// Never resolves.
    Hang,
    /// Blow up while handling the call.
    Panic,
}

impl<T> Step<T> {
    async fn run(self, operation: &'static str) -> Result<T> {
        match self {
            Step::Ok(v) => Ok(v),
            Step::Slow(delay, v) => {
                tokio::time::sleep(delay).await;
                Ok(v)
            }
            Step::Transport => Err(PanelError::Transport(format!(
                "{operation}: connection refused"
            ))),
            Step::Rejected(message) => Err(PanelError::rejected(operation, message)),
            Step::Hang => std::future::pending().await,
            Step::Panic => panic!("{operation} blew up"),
        }
    }
}

/// Queued steps for one operation, then a repeating fallback.
#[derive(Debug)]
pub(crate) struct Script<T> {
    queue: Mutex<VecDeque<Step<T>>>,
    fallback: Mutex<Step<T>>,
}

impl<T: Clone> Script<T> {
    fn new(fallback: Step<T>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
        }
    }

    /// Answer the next call with `step`.
    pub(crate) fn push(&self, step: Step<T>) -> &Self {
        self.queue.lock().unwrap().push_back(step);
        self
    }

    /// Answer every call without a queued step with `step`.
    pub(crate) fn always(&self, step: Step<T>) {
        *self.fallback.lock().unwrap() = step;
    }

    fn next(&self) -> Step<T> {
        match self.queue.lock().unwrap().pop_front() {
            Some(step) => step,
            None => self.fallback.lock().unwrap().clone(),
        }
    }
}

pub(crate) fn running(running: bool) -> JobStatus {
    JobStatus {
        running,
        stats: Default::default(),
    }
}

pub(crate) fn stats(total: f64) -> Statistics {
    let mut s = Statistics::zeroed();
    s.0.insert("total_businesses".to_string(), total);
    s
}

pub(crate) fn fake_catalog() -> CategoryCatalog {
    CategoryCatalog::from([("Test Group".to_string(), vec!["widget repair".to_string()])])
}

/// In-memory backend recording every call.
#[derive(Debug)]
pub(crate) struct FakeBackend {
    pub config: Script<Value>,
    pub save: Script<()>,
    pub statistics: Script<Statistics>,
    pub businesses: Script<Vec<BusinessRecord>>,
    pub categories: Script<CategoryCatalog>,
    pub status: Script<JobStatus>,
    pub start: Script<()>,
    pub stop: Script<()>,
    pub export: Script<ExportSummary>,
    pub saved: Mutex<Vec<MonitoringConfig>>,
    pub queries: Mutex<Vec<RecordFilter>>,
    pub exports: Mutex<Vec<ExportRequest>>,
    calls: Mutex<Vec<&'static str>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            config: Script::new(Step::Ok(Value::Null)),
            save: Script::new(Step::Ok(())),
            statistics: Script::new(Step::Ok(stats(42.0))),
            businesses: Script::new(Step::Ok(Vec::new())),
            categories: Script::new(Step::Ok(fake_catalog())),
            status: Script::new(Step::Ok(running(false))),
            start: Script::new(Step::Ok(())),
            stop: Script::new(Step::Ok(())),
            export: Script::new(Step::Ok(ExportSummary {
                message: "Exported 3 businesses to export.csv".to_string(),
                count: 3,
                filename: Some("export.csv".to_string()),
            })),
            saved: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            exports: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }

    /// Every call so far, in order.
    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls to `operation`.
    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == operation)
            .count()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn get_config(&self) -> Result<Value> {
        self.record("get_config");
        self.config.next().run("load config").await
    }

    async fn save_config(&self, config: &MonitoringConfig) -> Result<()> {
        self.record("save_config");
        self.saved.lock().unwrap().push(config.clone());
        self.save.next().run("save config").await
    }

    async fn get_statistics(&self) -> Result<Statistics> {
        self.record("get_statistics");
        self.statistics.next().run("load statistics").await
    }

    async fn get_businesses(&self, filter: RecordFilter) -> Result<Vec<BusinessRecord>> {
        self.record("get_businesses");
        self.queries.lock().unwrap().push(filter);
        self.businesses.next().run("load businesses").await
    }

    async fn get_categories(&self) -> Result<CategoryCatalog> {
        self.record("get_categories");
        self.categories.next().run("load categories").await
    }

    async fn get_status(&self) -> Result<JobStatus> {
        self.record("get_status");
        self.status.next().run("load job status").await
    }

    async fn start_job(&self) -> Result<()> {
        self.record("start_job");
        self.start.next().run("start job").await
    }

    async fn stop_job(&self) -> Result<()> {
        self.record("stop_job");
        self.stop.next().run("stop job").await
    }

    async fn export(&self, request: &ExportRequest) -> Result<ExportSummary> {
        self.record("export");
        self.exports.lock().unwrap().push(*request);
        self.export.next().run("export").await
    }
}
