//! Top-level session: view selection, startup, and user actions.
//!
//! The [`Session`] owns every shared piece of state and every background
//! task. Startup runs its steps one after another, each with its own
//! fallback, under a single panic safety net that lands the operator on the
//! configuration view instead of a dead session.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use panel_client::{Backend, ExportSummary};
use panel_core::form::ConfigForm;
use panel_core::models::{
    builtin_catalog, BusinessRecord, CategoryCatalog, ExportRequest, JobStatus,
    MonitoringConfig, RecordFilter, Statistics, View,
};
use panel_core::timings::Timings;
use panel_core::Result;

use crate::busy::BusyFlag;
use crate::config_sync::ConfigSynchronizer;
use crate::job_monitor::{JobMonitor, PollerHandle};
use crate::notifications::{NotificationCenter, Toast, ToastId};
use crate::tasks::TaskSet;

const WELCOME: &str = "Welcome! Configure your monitoring settings to get started.";
const SETUP_COMPLETE: &str = "Setup complete! You can now start monitoring.";
const LIST_FAILED: &str = "Error loading businesses";
const LIST_REJECTED: &str = "Failed to load businesses";
const EXPORT_FAILED: &str = "Error exporting data";
const EXPORT_REJECTED: &str = "Export failed";

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Everything a renderer needs, copied out of the live session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub view: View,
    pub loading: bool,
    pub config: MonitoringConfig,
    pub form: ConfigForm,
    pub status: JobStatus,
    pub statistics: Option<Statistics>,
    /// Dashboard strip of the newest records.
    pub recent: Vec<BusinessRecord>,
    /// Records listing for the businesses view.
    pub businesses: Vec<BusinessRecord>,
    pub catalog: CategoryCatalog,
    pub filter: RecordFilter,
    pub export_result: Option<String>,
    pub toasts: Vec<Toast>,
}

#[derive(Debug)]
struct ViewState {
    view: View,
    recent: Vec<BusinessRecord>,
    businesses: Vec<BusinessRecord>,
    catalog: CategoryCatalog,
    filter: RecordFilter,
    export_result: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            view: View::default(),
            recent: Vec::new(),
            businesses: Vec::new(),
            catalog: builtin_catalog(),
            filter: RecordFilter::default(),
            export_result: None,
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// A control-panel session against one backend.
pub struct Session {
    backend: Arc<dyn Backend>,
    timings: Timings,
    state: Arc<Mutex<ViewState>>,
    notifier: NotificationCenter,
    busy: BusyFlag,
    tasks: TaskSet,
    sync: ConfigSynchronizer,
    jobs: JobMonitor,
    pollers: Mutex<Option<PollerHandle>>,
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>, timings: Timings) -> Self {
        let tasks = TaskSet::new();
        let busy = BusyFlag::new();
        let notifier = NotificationCenter::new(&timings, tasks.clone());
        let sync = ConfigSynchronizer::new(backend.clone(), notifier.clone(), busy.clone());
        let jobs = JobMonitor::new(
            backend.clone(),
            notifier.clone(),
            busy.clone(),
            tasks.clone(),
            timings,
        );

        Self {
            backend,
            timings,
            state: Arc::new(Mutex::new(ViewState::default())),
            notifier,
            busy,
            tasks,
            sync,
            jobs,
            pollers: Mutex::new(None),
        }
    }

    // ── Startup ───────────────────────────────────────────────────────────

    /// Run the startup sequence and arm the recurring polls.
    ///
    /// Returns the view the session settled on.
    pub async fn initialize(&self) -> View {
        match AssertUnwindSafe(self.startup()).catch_unwind().await {
            Ok(()) => {}
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(%reason, "startup aborted; falling back to setup");
                self.lock().view = View::Config;
                self.notifier.info(WELCOME);
            }
        }
        self.view()
    }

    async fn startup(&self) {
        let load = self.sync.load().await;
        let view = if load.is_returning_user() {
            View::Dashboard
        } else {
            View::Welcome
        };
        tracing::info!(%view, returning = load.is_returning_user(), "configuration resolved");
        self.lock().view = view;

        self.jobs.poll_statistics(true).await;
        self.load_recent().await;
        self.load_categories().await;
        self.jobs.poll_status().await;

        let handle = self.jobs.spawn_pollers();
        *self.pollers_lock() = Some(handle);
        tracing::info!(
            status_every = ?self.timings.status_interval,
            statistics_every = ?self.timings.statistics_interval,
            "pollers armed"
        );
    }

    async fn load_recent(&self) {
        match self.backend.get_businesses(RecordFilter::RECENT).await {
            Ok(records) => self.lock().recent = records,
            Err(e) => tracing::warn!(error = %e, "recent records unavailable"),
        }
    }

    async fn load_categories(&self) {
        let catalog = match self.backend.get_categories().await {
            Ok(catalog) if !catalog.is_empty() => catalog,
            Ok(_) => {
                tracing::warn!("backend returned no categories; using built-in catalog");
                builtin_catalog()
            }
            Err(e) => {
                tracing::warn!(error = %e, "categories unavailable; using built-in catalog");
                builtin_catalog()
            }
        };
        self.lock().catalog = catalog;
    }

    // ── Views ─────────────────────────────────────────────────────────────

    pub fn view(&self) -> View {
        self.lock().view
    }

    /// Switch view. Entering the businesses view refreshes the listing.
    pub async fn set_view(&self, target: View) {
        self.lock().view = target;
        tracing::debug!(view = %target, "view changed");
        if target == View::Businesses {
            if let Err(e) = self.load_businesses().await {
                tracing::debug!(error = %e, "listing not refreshed on view entry");
            }
        }
    }

    pub fn filter(&self) -> RecordFilter {
        self.lock().filter
    }

    pub fn set_filter(&self, filter: RecordFilter) {
        self.lock().filter = filter;
    }

    /// Query the records listing with the current filter.
    pub async fn load_businesses(&self) -> Result<usize> {
        let filter = self.filter();
        let outcome = {
            let _busy = self.busy.hold();
            self.backend.get_businesses(filter).await
        };

        match outcome {
            Ok(records) => {
                let count = records.len();
                tracing::debug!(count, limit = filter.limit, days = filter.days, "records loaded");
                self.lock().businesses = records;
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "records listing failed");
                let message = if e.is_transport() {
                    LIST_FAILED.to_string()
                } else {
                    e.user_message(LIST_REJECTED)
                };
                self.notifier.error(message);
                Err(e)
            }
        }
    }

    // ── Actions ───────────────────────────────────────────────────────────

    /// Save the configuration form.
    ///
    /// A save made from the configuration view completes first-time setup:
    /// after a short delay the session moves on to the dashboard.
    pub async fn save_config(&self) -> Result<MonitoringConfig> {
        let from_setup = self.view() == View::Config;
        let config = self.sync.save().await?;

        if from_setup {
            let state = self.state.clone();
            let notifier = self.notifier.clone();
            let delay = self.timings.setup_complete_delay;
            self.tasks.spawn(async move {
                tokio::time::sleep(delay).await;
                {
                    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                    if state.view == View::Config {
                        state.view = View::Dashboard;
                    }
                }
                notifier.info(SETUP_COMPLETE);
            });
        }
        Ok(config)
    }

    pub async fn start_job(&self) -> Result<()> {
        self.jobs.start().await
    }

    pub async fn stop_job(&self) -> Result<()> {
        self.jobs.stop().await
    }

    /// Ask the backend to export collected records.
    pub async fn export(&self, request: ExportRequest) -> Result<ExportSummary> {
        self.lock().export_result = None;
        let outcome = {
            let _busy = self.busy.hold();
            self.backend.export(&request).await
        };

        match outcome {
            Ok(summary) => {
                tracing::info!(
                    format = %request.format,
                    count = summary.count,
                    filename = summary.filename.as_deref().unwrap_or("-"),
                    "export finished"
                );
                self.lock().export_result = Some(summary.message.clone());
                self.notifier
                    .success(format!("Exported {} businesses!", summary.count));
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, format = %request.format, "export failed");
                let message = if e.is_transport() {
                    EXPORT_FAILED.to_string()
                } else {
                    e.user_message(EXPORT_REJECTED)
                };
                self.notifier.error(message);
                Err(e)
            }
        }
    }

    pub fn dismiss_toast(&self, id: ToastId) {
        self.notifier.dismiss(id);
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn sync(&self) -> &ConfigSynchronizer {
        &self.sync
    }

    pub fn jobs(&self) -> &JobMonitor {
        &self.jobs
    }

    pub fn notifier(&self) -> &NotificationCenter {
        &self.notifier
    }

    pub fn is_loading(&self) -> bool {
        self.busy.is_busy()
    }

    /// `true` once startup armed the recurring polls and until shutdown.
    pub fn pollers_armed(&self) -> bool {
        self.pollers_lock()
            .as_ref()
            .is_some_and(PollerHandle::is_running)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let job = self.jobs.snapshot();
        let state = self.lock();
        SessionSnapshot {
            view: state.view,
            loading: self.busy.is_busy(),
            config: self.sync.config(),
            form: self.sync.form(),
            status: job.status,
            statistics: job.statistics,
            recent: state.recent.clone(),
            businesses: state.businesses.clone(),
            catalog: state.catalog.clone(),
            filter: state.filter,
            export_result: state.export_result.clone(),
            toasts: self.notifier.toasts(),
        }
    }

    /// Stop the recurring polls and every pending timer.
    pub fn shutdown(&self) {
        if let Some(handle) = self.pollers_lock().take() {
            handle.abort();
        }
        let pending = self.tasks.pending();
        self.tasks.abort_all();
        tracing::info!(pending, "session shut down");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pollers_lock(&self) -> std::sync::MutexGuard<'_, Option<PollerHandle>> {
        self.pollers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.tasks.abort_all();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
