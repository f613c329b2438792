//! Background job control and status polling.
//!
//! [`JobMonitor`] holds the latest job status and statistics, replaces them
//! wholesale on every successful poll, and keeps the previous snapshot when a
//! poll fails. Start/stop commands are followed by one settle-delay status
//! poll, since the command's own reply does not reflect the new state yet.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use panel_client::Backend;
use panel_core::models::{JobStatus, Statistics};
use panel_core::timings::Timings;
use panel_core::Result;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::busy::BusyFlag;
use crate::notifications::NotificationCenter;
use crate::tasks::TaskSet;

// ── Public types ──────────────────────────────────────────────────────────────

/// Latest known job status and statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// `None` until the first statistics load has settled.
    pub statistics: Option<Statistics>,
}

/// A start or stop command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobCommand {
    Start,
    Stop,
}

impl JobCommand {
    fn operation(self) -> &'static str {
        match self {
            Self::Start => "start job",
            Self::Stop => "stop job",
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            Self::Start => "Scraper started successfully!",
            Self::Stop => "Scraper stopped successfully!",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Self::Start => "Failed to start scraper",
            Self::Stop => "Failed to stop scraper",
        }
    }

    fn transport_message(self) -> &'static str {
        match self {
            Self::Start => "Error starting scraper",
            Self::Stop => "Error stopping scraper",
        }
    }
}

// ── JobMonitor ────────────────────────────────────────────────────────────────

/// Polls and commands the background job.
///
/// Cloning yields another handle to the same snapshot.
#[derive(Clone)]
pub struct JobMonitor {
    backend: Arc<dyn Backend>,
    snapshot: Arc<Mutex<JobSnapshot>>,
    notifier: NotificationCenter,
    busy: BusyFlag,
    tasks: TaskSet,
    /// Serializes start/stop so the backend sees them in issue order.
    commands: Arc<tokio::sync::Mutex<()>>,
    timings: Timings,
}

impl JobMonitor {
    pub fn new(
        backend: Arc<dyn Backend>,
        notifier: NotificationCenter,
        busy: BusyFlag,
        tasks: TaskSet,
        timings: Timings,
    ) -> Self {
        Self {
            backend,
            snapshot: Arc::new(Mutex::new(JobSnapshot::default())),
            notifier,
            busy,
            tasks,
            commands: Arc::new(tokio::sync::Mutex::new(())),
            timings,
        }
    }

    // ── Snapshot access ───────────────────────────────────────────────────

    pub fn snapshot(&self) -> JobSnapshot {
        self.lock().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.lock().status.clone()
    }

    pub fn statistics(&self) -> Option<Statistics> {
        self.lock().statistics.clone()
    }

    // ── Polls ─────────────────────────────────────────────────────────────

    /// Refresh the job status. Failures are logged and the previous status kept.
    ///
    /// Returns `true` when the snapshot was replaced.
    pub async fn poll_status(&self) -> bool {
        match self.backend.get_status().await {
            Ok(status) => {
                tracing::debug!(running = status.running, "job status refreshed");
                self.lock().status = status;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "status poll failed; keeping previous snapshot");
                false
            }
        }
    }

    /// Refresh the statistics. Failures keep the previous value, except that
    /// a failed `initial` load with nothing held yet installs zeroed counters.
    pub async fn poll_statistics(&self, initial: bool) -> bool {
        match self.backend.get_statistics().await {
            Ok(statistics) => {
                self.lock().statistics = Some(statistics);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, initial, "statistics poll failed");
                if initial {
                    self.lock().statistics.get_or_insert_with(Statistics::zeroed);
                }
                false
            }
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// Ask the backend to start the job.
    pub async fn start(&self) -> Result<()> {
        self.command(JobCommand::Start).await
    }

    /// Ask the backend to stop the job.
    pub async fn stop(&self) -> Result<()> {
        self.command(JobCommand::Stop).await
    }

    async fn command(&self, command: JobCommand) -> Result<()> {
        let _serial = self.commands.lock().await;
        let busy = self.busy.hold();
        tracing::info!(command = command.operation(), "sending job command");

        let outcome = match command {
            JobCommand::Start => self.backend.start_job().await,
            JobCommand::Stop => self.backend.stop_job().await,
        };
        drop(busy);

        match &outcome {
            Ok(()) => {
                self.notifier.success(command.success_message());
            }
            Err(e) if e.is_transport() => {
                tracing::warn!(error = %e, command = command.operation(), "job command failed");
                self.notifier.error(command.transport_message());
            }
            Err(e) => {
                tracing::warn!(error = %e, command = command.operation(), "job command rejected");
                self.notifier.error(e.user_message(command.failure_message()));
            }
        }

        self.schedule_settle_poll();
        outcome
    }

    /// One extra status poll once the backend has had time to apply a command.
    fn schedule_settle_poll(&self) {
        let monitor = self.clone();
        let delay = self.timings.settle_delay;
        self.tasks.spawn(async move {
            time::sleep(delay).await;
            monitor.poll_status().await;
        });
    }

    // ── Recurring polls ───────────────────────────────────────────────────

    /// Start the recurring status and statistics polls.
    ///
    /// The first tick of each fires one full period from now; the caller is
    /// expected to have polled once already.
    pub fn spawn_pollers(&self) -> PollerHandle {
        let status = {
            let monitor = self.clone();
            let period = self.timings.status_interval;
            tokio::spawn(async move {
                let mut ticks = interval_after(period);
                loop {
                    ticks.tick().await;
                    monitor.poll_status().await;
                }
            })
        };

        let statistics = {
            let monitor = self.clone();
            let period = self.timings.statistics_interval;
            tokio::spawn(async move {
                let mut ticks = interval_after(period);
                loop {
                    ticks.tick().await;
                    monitor.poll_statistics(false).await;
                }
            })
        };

        PollerHandle { status, statistics }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JobSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn interval_after(period: Duration) -> time::Interval {
    let mut ticks = time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticks
}

// ── PollerHandle ──────────────────────────────────────────────────────────────

/// Owner of the two recurring poll tasks; aborts both when dropped.
#[derive(Debug)]
pub struct PollerHandle {
    status: JoinHandle<()>,
    statistics: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop both polls immediately.
    pub fn abort(&self) {
        self.status.abort();
        self.statistics.abort();
    }

    /// `true` while both polls are still scheduled.
    pub fn is_running(&self) -> bool {
        !self.status.is_finished() && !self.statistics.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
