//! Remote monitoring configuration and its edit form.
//!
//! The held [`MonitoringConfig`] is always the last value the backend
//! confirmed, or the built-in default when nothing has been saved yet. The
//! [`ConfigForm`] is an independent draft; it only reaches the backend
//! through [`ConfigSynchronizer::save`].

use std::sync::{Arc, Mutex, PoisonError};

use panel_client::Backend;
use panel_core::form::ConfigForm;
use panel_core::models::{MonitoringConfig, ScopeKind};
use panel_core::Result;

use crate::busy::BusyFlag;
use crate::notifications::NotificationCenter;

const SAVE_OK: &str = "Configuration saved successfully!";
const SAVE_REJECTED: &str = "Failed to save configuration";
const SAVE_FAILED: &str = "Error saving configuration";

/// Outcome of a config load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoad {
    /// The backend had a saved configuration.
    Loaded(MonitoringConfig),
    /// Nothing usable was saved, or the backend could not be reached.
    Defaulted(MonitoringConfig),
}

impl ConfigLoad {
    pub fn config(&self) -> &MonitoringConfig {
        match self {
            Self::Loaded(config) | Self::Defaulted(config) => config,
        }
    }

    pub fn is_returning_user(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

#[derive(Debug, Default)]
struct SyncState {
    config: MonitoringConfig,
    form: ConfigForm,
}

/// Keeps the local config copy and edit form in step with the backend.
#[derive(Clone)]
pub struct ConfigSynchronizer {
    backend: Arc<dyn Backend>,
    state: Arc<Mutex<SyncState>>,
    notifier: NotificationCenter,
    busy: BusyFlag,
}

impl ConfigSynchronizer {
    pub fn new(backend: Arc<dyn Backend>, notifier: NotificationCenter, busy: BusyFlag) -> Self {
        let config = MonitoringConfig::default();
        let form = ConfigForm::derive(&config);
        Self {
            backend,
            state: Arc::new(Mutex::new(SyncState { config, form })),
            notifier,
            busy,
        }
    }

    /// Fetch the saved configuration and rebuild the form from it.
    ///
    /// Never fails: an empty payload or an unreachable backend yields the
    /// default configuration.
    pub async fn load(&self) -> ConfigLoad {
        let outcome = match self.backend.get_config().await {
            Ok(payload) => match MonitoringConfig::from_payload(&payload) {
                Some(config) => ConfigLoad::Loaded(config),
                None => {
                    tracing::info!("no saved configuration; using defaults");
                    ConfigLoad::Defaulted(MonitoringConfig::default())
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "config load failed; using defaults");
                ConfigLoad::Defaulted(MonitoringConfig::default())
            }
        };

        let config = outcome.config().clone();
        let mut state = self.lock();
        state.form = ConfigForm::derive(&config);
        state.config = config;
        outcome
    }

    /// The last confirmed configuration.
    pub fn config(&self) -> MonitoringConfig {
        self.lock().config.clone()
    }

    /// The current draft.
    pub fn form(&self) -> ConfigForm {
        self.lock().form.clone()
    }

    /// Apply an edit to the draft.
    pub fn edit_form<F: FnOnce(&mut ConfigForm)>(&self, edit: F) {
        edit(&mut self.lock().form);
    }

    /// Switch the draft's targeting mode.
    pub fn set_scope(&self, scope: ScopeKind) {
        self.lock().form.set_scope(scope);
    }

    /// Throw away draft edits.
    pub fn reset_form(&self) {
        let mut state = self.lock();
        state.form = ConfigForm::derive(&state.config);
    }

    /// Normalize the draft, validate it and persist it.
    ///
    /// The held config is replaced with the normalized value only once the
    /// backend confirms; the draft itself is left as typed.
    pub async fn save(&self) -> Result<MonitoringConfig> {
        let config = self.form().normalize();
        if let Err(e) = config.validate() {
            tracing::info!(error = %e, "refusing to save invalid configuration");
            self.notifier.error(e.user_message(SAVE_REJECTED));
            return Err(e);
        }

        let outcome = {
            let _busy = self.busy.hold();
            self.backend.save_config(&config).await
        };

        match outcome {
            Ok(()) => {
                tracing::info!(
                    category = %config.category,
                    scope = ?config.locations.kind(),
                    "configuration saved"
                );
                self.lock().config = config.clone();
                self.notifier.success(SAVE_OK);
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(error = %e, "configuration save failed");
                let message = if e.is_transport() {
                    SAVE_FAILED.to_string()
                } else {
                    e.user_message(SAVE_REJECTED)
                };
                self.notifier.error(message);
                Err(e)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeBackend, Step};
    use crate::tasks::TaskSet;
    use panel_core::models::LocationScope;
    use panel_core::timings::Timings;
    use panel_core::PanelError;
    use serde_json::json;
    use std::time::Duration;

    fn sync(backend: Arc<FakeBackend>) -> (ConfigSynchronizer, NotificationCenter, BusyFlag) {
        let notifier = NotificationCenter::new(&Timings::default(), TaskSet::new());
        let busy = BusyFlag::new();
        let s = ConfigSynchronizer::new(backend, notifier.clone(), busy.clone());
        (s, notifier, busy)
    }

    fn saved_payload() -> serde_json::Value {
        json!({
            "category": "electrician",
            "locations": {"states": ["CA", "NY"]},
            "batch_size": 20,
            "browser_instances": 2
        })
    }

    // ── load ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_load_saved_config_is_returning_user() {
        let backend = Arc::new(FakeBackend::default());
        backend.config.push(Step::Ok(saved_payload()));
        let (s, _, _) = sync(backend);

        let load = s.load().await;
        assert!(load.is_returning_user());
        assert_eq!(load.config().category, "electrician");
        assert_eq!(s.config().batch_size, 20);

        let form = s.form();
        assert_eq!(form.scope, ScopeKind::States);
        assert_eq!(form.states_input, "CA, NY");
        assert!(form.cities_input.is_empty());
    }

    #[tokio::test]
    async fn test_load_empty_monitoring_defaults() {
        let backend = Arc::new(FakeBackend::default());
        backend.config.push(Step::Ok(json!({})));
        let (s, notifier, _) = sync(backend);

        let load = s.load().await;
        assert!(!load.is_returning_user());
        assert_eq!(s.config(), MonitoringConfig::default());
        assert_eq!(s.config().category, "plumber");
        assert_eq!(s.form().scope, ScopeKind::Nationwide);
        assert!(notifier.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_load_category_with_null_fields_is_returning_user() {
        let backend = Arc::new(FakeBackend::default());
        backend.config.push(Step::Ok(json!({
            "category": "dentist",
            "locations": null,
            "batch_size": null
        })));
        let (s, _, _) = sync(backend);

        let load = s.load().await;
        assert!(load.is_returning_user());
        let config = s.config();
        assert_eq!(config.category, "dentist");
        assert_eq!(config.locations, LocationScope::Nationwide);
        assert_eq!(config.batch_size, 10);
        assert_eq!(s.form().draft.category, "dentist");
    }

    #[tokio::test]
    async fn test_save_sends_back_fields_the_form_does_not_edit() {
        let backend = Arc::new(FakeBackend::default());
        backend.config.push(Step::Ok(json!({
            "category": "dentist",
            "locations": {"states": ["CA"], "min_population": 50000},
            "batch_size": 10,
            "browser_instances": 1
        })));
        let (s, _, _) = sync(backend.clone());
        s.load().await;

        s.edit_form(|f| f.states_input = "CA, NV".into());
        let saved = s.save().await.unwrap();
        assert_eq!(saved.location_extra["min_population"], json!(50000));
        let sent = backend.saved.lock().unwrap()[0].clone();
        assert_eq!(
            serde_json::to_value(sent).unwrap()["locations"]["min_population"],
            50000
        );
    }

    #[tokio::test]
    async fn test_load_blank_category_defaults() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .config
            .push(Step::Ok(json!({"category": "  ", "batch_size": 50})));
        let (s, _, _) = sync(backend);
        assert!(matches!(s.load().await, ConfigLoad::Defaulted(_)));
        assert_eq!(s.config().batch_size, 10);
    }

    #[tokio::test]
    async fn test_load_transport_failure_defaults_without_toast() {
        let backend = Arc::new(FakeBackend::default());
        backend.config.push(Step::Transport);
        let (s, notifier, _) = sync(backend);

        let load = s.load().await;
        assert_eq!(load, ConfigLoad::Defaulted(MonitoringConfig::default()));
        assert!(notifier.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_reload_replaces_form() {
        let backend = Arc::new(FakeBackend::default());
        backend.config.push(Step::Ok(saved_payload()));
        let (s, _, _) = sync(backend);

        s.edit_form(|f| f.draft.category = "draft only".into());
        s.load().await;
        assert_eq!(s.form().draft.category, "electrician");
    }

    // ── form edits ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_form_edits_never_touch_config() {
        let backend = Arc::new(FakeBackend::default());
        let (s, _, _) = sync(backend);

        s.edit_form(|f| {
            f.scope = ScopeKind::Cities;
            f.cities_input = "Austin".into();
            f.draft.category = "roofer".into();
        });
        assert_eq!(s.config(), MonitoringConfig::default());

        s.reset_form();
        assert_eq!(s.form(), ConfigForm::derive(&MonitoringConfig::default()));
    }

    #[tokio::test]
    async fn test_set_scope_nationwide_clears_draft_locations() {
        let backend = Arc::new(FakeBackend::default());
        backend.config.push(Step::Ok(saved_payload()));
        let (s, _, _) = sync(backend);
        s.load().await;

        s.set_scope(ScopeKind::Nationwide);
        let form = s.form();
        assert_eq!(form.draft.locations, LocationScope::Nationwide);
        // Text input survives, but no longer counts.
        assert_eq!(form.states_input, "CA, NY");
        assert_eq!(form.normalize().locations, LocationScope::Nationwide);
    }

    // ── save ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_save_normalizes_and_replaces_config() {
        let backend = Arc::new(FakeBackend::default());
        let (s, notifier, busy) = sync(backend.clone());

        s.edit_form(|f| {
            f.scope = ScopeKind::States;
            f.states_input = "ca, ny, TX, californ".into();
            f.draft.category = " electrician ".into();
        });
        let saved = s.save().await.expect("saved");

        assert_eq!(
            saved.locations,
            LocationScope::States(vec!["CA".into(), "NY".into(), "TX".into()])
        );
        assert_eq!(saved.category, "electrician");
        assert_eq!(s.config(), saved);
        assert_eq!(backend.saved.lock().unwrap().as_slice(), &[saved]);
        assert_eq!(notifier.messages(), vec![SAVE_OK]);
        assert!(!busy.is_busy());
        // Form keeps what the operator typed.
        assert_eq!(s.form().states_input, "ca, ny, TX, californ");
    }

    #[tokio::test]
    async fn test_save_scope_with_empty_input_is_nationwide() {
        let backend = Arc::new(FakeBackend::default());
        let (s, _, _) = sync(backend);
        s.edit_form(|f| f.scope = ScopeKind::Cities);
        let saved = s.save().await.unwrap();
        assert_eq!(saved.locations, LocationScope::Nationwide);
    }

    #[tokio::test]
    async fn test_save_rejected_keeps_previous_config() {
        let backend = Arc::new(FakeBackend::default());
        backend.config.push(Step::Ok(saved_payload()));
        backend
            .save
            .push(Step::Rejected(Some("Category not supported".into())));
        let (s, notifier, _) = sync(backend);
        s.load().await;
        let before = s.config();

        s.edit_form(|f| f.draft.category = "astronaut".into());
        let err = s.save().await.unwrap_err();
        assert!(matches!(err, PanelError::Rejected { .. }));
        assert_eq!(s.config(), before);
        assert_eq!(notifier.messages(), vec!["Category not supported"]);
    }

    #[tokio::test]
    async fn test_save_rejected_without_message_uses_fallback() {
        let backend = Arc::new(FakeBackend::default());
        backend.save.push(Step::Rejected(None));
        let (s, notifier, _) = sync(backend);
        assert!(s.save().await.is_err());
        assert_eq!(notifier.messages(), vec![SAVE_REJECTED]);
    }

    #[tokio::test]
    async fn test_save_transport_failure_message() {
        let backend = Arc::new(FakeBackend::default());
        backend.save.push(Step::Transport);
        let (s, notifier, _) = sync(backend);
        assert!(s.save().await.is_err());
        assert_eq!(notifier.messages(), vec![SAVE_FAILED]);
        assert_eq!(s.config(), MonitoringConfig::default());
    }

    #[tokio::test]
    async fn test_invalid_config_is_not_transmitted() {
        let backend = Arc::new(FakeBackend::default());
        let (s, notifier, _) = sync(backend.clone());

        s.edit_form(|f| f.draft.category = "   ".into());
        let err = s.save().await.unwrap_err();
        assert!(matches!(err, PanelError::InvalidConfig(_)));
        assert_eq!(notifier.messages(), vec!["Please choose a business category"]);
        assert_eq!(backend.count("save_config"), 0);

        s.edit_form(|f| {
            f.draft.category = "roofer".into();
            f.draft.batch_size = 0;
        });
        assert!(s.save().await.is_err());
        assert_eq!(backend.count("save_config"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_save_leaves_busy_flag_up() {
        let backend = Arc::new(FakeBackend::default());
        backend.save.push(Step::Hang);
        let (s, _, busy) = sync(backend);

        let pending = tokio::spawn({
            let s = s.clone();
            async move { s.save().await }
        });
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(busy.is_busy());
        assert_eq!(s.config(), MonitoringConfig::default());

        pending.abort();
        let _ = pending.await;
        assert!(!busy.is_busy(), "aborting the save drops its guard");
    }

    #[tokio::test]
    async fn test_save_all_scopes_never_both_lists() {
        let backend = Arc::new(FakeBackend::default());
        let (s, _, _) = sync(backend);
        for scope in [ScopeKind::Nationwide, ScopeKind::States, ScopeKind::Cities] {
            s.edit_form(|f| {
                f.scope = scope;
                f.states_input = "CA".into();
                f.cities_input = "Reno".into();
            });
            let saved = s.save().await.unwrap();
            assert!(saved.locations.codes().is_none() || saved.locations.names().is_none());
            assert_eq!(saved.locations.kind(), scope);
        }
    }
}
