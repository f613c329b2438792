//! Transient operator notifications ("toasts").
//!
//! [`ToastQueue`] is the plain ordered store; [`NotificationCenter`] wraps it
//! in shared state and schedules each toast's removal on the tokio timer.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use panel_core::timings::Timings;
use tokio::time::Instant;

use crate::tasks::TaskSet;

// ── Toast ─────────────────────────────────────────────────────────────────────

/// Severity of a toast; decides its colour and lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastKind {
    #[default]
    Success,
    Error,
    Info,
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        };
        f.write_str(s)
    }
}

/// Monotonically increasing toast identifier.
pub type ToastId = u64;

/// A single on-screen notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub kind: ToastKind,
    /// When the toast is due to disappear on its own.
    pub expires_at: Instant,
}

// ── ToastQueue ────────────────────────────────────────────────────────────────

/// Insertion-ordered toasts with id allocation.
#[derive(Debug, Default)]
pub struct ToastQueue {
    next_id: ToastId,
    toasts: Vec<Toast>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a toast and return a copy of it.
    pub fn push(&mut self, message: String, kind: ToastKind, expires_at: Instant) -> Toast {
        let toast = Toast {
            id: self.next_id,
            message,
            kind,
            expires_at,
        };
        self.next_id += 1;
        self.toasts.push(toast.clone());
        toast
    }

    /// Remove the toast with `id`. Returns `false` if it was already gone.
    pub fn dismiss(&mut self, id: ToastId) -> bool {
        match self.toasts.iter().position(|t| t.id == id) {
            Some(index) => {
                self.toasts.remove(index);
                true
            }
            None => false,
        }
    }

    /// Toasts in display order.
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

// ── NotificationCenter ────────────────────────────────────────────────────────

/// Shared, self-expiring toast store.
///
/// Cloning yields another handle to the same toasts.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    queue: Arc<Mutex<ToastQueue>>,
    tasks: TaskSet,
    toast_duration: Duration,
    info_duration: Duration,
}

impl NotificationCenter {
    /// Create a center using the toast lifetimes in `timings`; expiry timers
    /// are spawned into `tasks`.
    pub fn new(timings: &Timings, tasks: TaskSet) -> Self {
        Self {
            queue: Arc::new(Mutex::new(ToastQueue::new())),
            tasks,
            toast_duration: timings.toast_duration,
            info_duration: timings.info_toast_duration,
        }
    }

    /// How long a toast of `kind` stays up.
    pub fn lifetime(&self, kind: ToastKind) -> Duration {
        match kind {
            ToastKind::Info => self.info_duration,
            ToastKind::Success | ToastKind::Error => self.toast_duration,
        }
    }

    /// Show a success toast.
    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.show(message, ToastKind::Success)
    }

    /// Show an error toast.
    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.show(message, ToastKind::Error)
    }

    /// Show an info toast.
    pub fn info(&self, message: impl Into<String>) -> ToastId {
        self.show(message, ToastKind::Info)
    }

    /// Append a toast and schedule its removal.
    pub fn show(&self, message: impl Into<String>, kind: ToastKind) -> ToastId {
        let lifetime = self.lifetime(kind);
        let toast = self
            .lock()
            .push(message.into(), kind, Instant::now() + lifetime);
        tracing::info!(id = toast.id, %kind, message = %toast.message, "toast");

        let center = self.clone();
        let (id, expires_at) = (toast.id, toast.expires_at);
        self.tasks.spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            center.dismiss(id);
        });
        id
    }

    /// Remove a toast. A no-op when it has already expired or been dismissed.
    pub fn dismiss(&self, id: ToastId) {
        if self.lock().dismiss(id) {
            tracing::debug!(id, "toast removed");
        }
    }

    /// Current toasts in display order.
    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().toasts().to_vec()
    }

    /// Messages of the current toasts, in display order.
    pub fn messages(&self) -> Vec<String> {
        self.lock().toasts().iter().map(|t| t.message.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ToastQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
