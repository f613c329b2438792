//! Editable draft of a [`MonitoringConfig`].
//!
//! [`ConfigForm::derive`] and [`ConfigForm::normalize`] are a pure pair: the
//! first turns a persisted config into form state, the second turns form
//! state back into a config ready to transmit. Neither touches the persisted
//! copy; only an explicit save does.

use crate::models::{LocationScope, MonitoringConfig, ScopeKind};

/// Separator used when rendering a list into a text input.
const LIST_JOINER: &str = ", ";

/// In-progress edit of the monitoring configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigForm {
    /// Selected targeting mode.
    pub scope: ScopeKind,
    /// Raw comma-separated state codes.
    pub states_input: String,
    /// Raw comma-separated city names.
    pub cities_input: String,
    /// Draft of the remaining fields.
    pub draft: MonitoringConfig,
}

impl ConfigForm {
    /// Build the form state for `config`.
    pub fn derive(config: &MonitoringConfig) -> Self {
        let mut form = Self {
            scope: ScopeKind::Nationwide,
            states_input: String::new(),
            cities_input: String::new(),
            draft: config.clone(),
        };

        match &config.locations {
            LocationScope::Nationwide => {}
            LocationScope::States(codes) => {
                form.scope = ScopeKind::States;
                form.states_input = codes.join(LIST_JOINER);
            }
            LocationScope::Cities(names) => {
                form.scope = ScopeKind::Cities;
                form.cities_input = names.join(LIST_JOINER);
            }
        }

        form
    }

    /// Switch the targeting mode.
    ///
    /// Choosing nationwide drops any locations held in the draft straight
    /// away, whatever the text inputs still contain.
    pub fn set_scope(&mut self, scope: ScopeKind) {
        self.scope = scope;
        if scope == ScopeKind::Nationwide {
            self.draft.locations = LocationScope::Nationwide;
        }
    }

    /// Produce the config this form would save.
    ///
    /// A scope whose text input is empty, or parses to nothing, saves as
    /// nationwide.
    pub fn normalize(&self) -> MonitoringConfig {
        let locations = match self.scope {
            ScopeKind::States if !self.states_input.is_empty() => {
                non_empty(parse_state_codes(&self.states_input)).map(LocationScope::States)
            }
            ScopeKind::Cities if !self.cities_input.is_empty() => {
                non_empty(parse_city_names(&self.cities_input)).map(LocationScope::Cities)
            }
            _ => None,
        };

        MonitoringConfig {
            category: self.draft.category.trim().to_string(),
            locations: locations.unwrap_or(LocationScope::Nationwide),
            batch_size: self.draft.batch_size,
            browser_instances: self.draft.browser_instances,
            location_extra: self.draft.location_extra.clone(),
            extra: self.draft.extra.clone(),
        }
    }
}

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    (!items.is_empty()).then_some(items)
}

/// Split comma-separated state codes: trimmed, upper-cased, exactly two
/// characters long, first occurrence kept.
///
/// # Examples
///
/// ```
/// use panel_core::form::parse_state_codes;
///
/// assert_eq!(parse_state_codes("ca, ny, TX, californ"), vec!["CA", "NY", "TX"]);
/// ```
pub fn parse_state_codes(input: &str) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for code in input
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| s.chars().count() == 2)
    {
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

/// Split comma-separated city names: trimmed, empty entries dropped.
///
/// # Examples
///
/// ```
/// use panel_core::form::parse_city_names;
///
/// assert_eq!(parse_city_names("Austin, , Dallas"), vec!["Austin", "Dallas"]);
/// ```
pub fn parse_city_names(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
