use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{PanelError, Result};
use crate::formatting::parse_timestamp;

/// Category used when no persisted configuration exists.
pub const DEFAULT_CATEGORY: &str = "plumber";
/// Default number of search URLs handled per batch.
pub const DEFAULT_BATCH_SIZE: u32 = 10;
/// Default number of concurrent browser instances.
pub const DEFAULT_BROWSER_INSTANCES: u32 = 1;

// ── LocationScope ─────────────────────────────────────────────────────────────

/// Geographic targeting of the monitoring job.
///
/// On the wire this is `{ "states": [..] | null, "cities": [..] | null }`;
/// the enum makes "both lists populated" unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "WireLocations", into = "WireLocations")]
pub enum LocationScope {
    /// Whole country, no location filter.
    #[default]
    Nationwide,
    /// Two-letter state codes, deduplicated, in entry order.
    States(Vec<String>),
    /// City names in entry order.
    Cities(Vec<String>),
}

impl LocationScope {
    /// The discriminator for this scope.
    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Nationwide => ScopeKind::Nationwide,
            Self::States(_) => ScopeKind::States,
            Self::Cities(_) => ScopeKind::Cities,
        }
    }

    /// State codes, when this is a states scope.
    pub fn codes(&self) -> Option<&[String]> {
        match self {
            Self::States(codes) => Some(codes),
            _ => None,
        }
    }

    /// City names, when this is a cities scope.
    pub fn names(&self) -> Option<&[String]> {
        match self {
            Self::Cities(names) => Some(names),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireLocations {
    #[serde(default, deserialize_with = "lenient")]
    states: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    cities: Option<Vec<String>>,
    /// Backend-side location filters such as `min_population`.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl WireLocations {
    fn new(scope: LocationScope, extra: Map<String, Value>) -> Self {
        Self {
            extra,
            ..Self::from(scope)
        }
    }
}

impl From<WireLocations> for LocationScope {
    fn from(wire: WireLocations) -> Self {
        // Empty lists count as absent; states win if a payload carries both.
        match (wire.states, wire.cities) {
            (Some(codes), _) if !codes.is_empty() => Self::States(codes),
            (_, Some(names)) if !names.is_empty() => Self::Cities(names),
            _ => Self::Nationwide,
        }
    }
}

impl From<LocationScope> for WireLocations {
    fn from(scope: LocationScope) -> Self {
        match scope {
            LocationScope::Nationwide => Self::default(),
            LocationScope::States(codes) => Self {
                states: Some(codes),
                ..Self::default()
            },
            LocationScope::Cities(names) => Self {
                cities: Some(names),
                ..Self::default()
            },
        }
    }
}

/// Which of the three [`LocationScope`] variants the operator has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    #[default]
    Nationwide,
    States,
    Cities,
}

// ── MonitoringConfig ──────────────────────────────────────────────────────────

/// The persisted monitoring configuration of the background job.
///
/// Fields the panel does not edit are kept in `extra` and
/// `location_extra` so a load followed by a save sends them back intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireConfig", into = "WireConfig")]
pub struct MonitoringConfig {
    /// Business category to monitor (e.g. `"plumber"`).
    pub category: String,
    /// Geographic scope.
    pub locations: LocationScope,
    /// Search URLs handled per batch; must be positive.
    pub batch_size: u32,
    /// Concurrent browser instances; must be positive.
    pub browser_instances: u32,
    /// Unrecognised keys of the `locations` object.
    pub location_extra: Map<String, Value>,
    /// Unrecognised top-level keys.
    pub extra: Map<String, Value>,
}

/// Wire shape of [`MonitoringConfig`]. Every field decodes leniently: a
/// null or mistyped value falls back to its default instead of failing
/// the whole document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WireConfig {
    #[serde(default, deserialize_with = "lenient")]
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    locations: Option<WireLocations>,
    #[serde(default, deserialize_with = "lenient")]
    batch_size: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    browser_instances: Option<u32>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<WireConfig> for MonitoringConfig {
    fn from(wire: WireConfig) -> Self {
        let locations = wire.locations.unwrap_or_default();
        let location_extra = locations.extra.clone();
        Self {
            category: wire.category.unwrap_or_default(),
            locations: LocationScope::from(locations),
            batch_size: wire.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            browser_instances: wire.browser_instances.unwrap_or(DEFAULT_BROWSER_INSTANCES),
            location_extra,
            extra: wire.extra,
        }
    }
}

impl From<MonitoringConfig> for WireConfig {
    fn from(config: MonitoringConfig) -> Self {
        Self {
            category: Some(config.category),
            locations: Some(WireLocations::new(config.locations, config.location_extra)),
            batch_size: Some(config.batch_size),
            browser_instances: Some(config.browser_instances),
            extra: config.extra,
        }
    }
}

/// Decode `T` if the value fits, `None` otherwise.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            locations: LocationScope::Nationwide,
            batch_size: DEFAULT_BATCH_SIZE,
            browser_instances: DEFAULT_BROWSER_INSTANCES,
            location_extra: Map::new(),
            extra: Map::new(),
        }
    }
}

impl MonitoringConfig {
    /// Interpret a raw `monitoring` payload.
    ///
    /// Returns `None` unless the payload is an object with a non-empty
    /// category; callers treat that as "nothing saved yet". Any other field
    /// that is missing, null or mistyped takes its default.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        match serde_json::from_value::<Self>(payload.clone()) {
            Ok(config) if !config.category.trim().is_empty() => Some(config),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "monitoring payload did not decode");
                None
            }
        }
    }

    /// Reject values the backend would refuse to run with.
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(PanelError::InvalidConfig(
                "Please choose a business category".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(PanelError::InvalidConfig(
                "Batch size must be at least 1".to_string(),
            ));
        }
        if self.browser_instances == 0 {
            return Err(PanelError::InvalidConfig(
                "Browser instances must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Job status & statistics ───────────────────────────────────────────────────

/// Live status of the background scraping job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobStatus {
    /// Whether the job is currently running.
    #[serde(default)]
    pub running: bool,
    /// Per-run counters reported by the job (`urls_processed`, ...).
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

/// Aggregate counters over all collected records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statistics(pub BTreeMap<String, f64>);

impl Statistics {
    /// Counter names the dashboard renders.
    pub const KEYS: [&'static str; 4] = [
        "total_businesses",
        "new_this_week",
        "new_this_month",
        "categories_count",
    ];

    /// All dashboard counters present and zero.
    pub fn zeroed() -> Self {
        Self(Self::KEYS.iter().map(|k| (k.to_string(), 0.0)).collect())
    }

    /// Counter value, `0` when absent.
    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// A collected business, kept opaque apart from its creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    /// Backend timestamp of when the business was first collected.
    #[serde(default)]
    pub first_seen: Option<String>,
    /// Every other field, untouched.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl BusinessRecord {
    /// Parsed creation time, if the backend supplied a readable one.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.first_seen.as_deref().and_then(parse_timestamp)
    }

    /// A string field such as `name` or `address`.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Listing filter for the businesses view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFilter {
    /// Page size.
    pub limit: u32,
    /// Look-back window in days; `0` disables the filter.
    pub days: u32,
}

impl RecordFilter {
    /// Fixed page used for the dashboard's recent strip.
    pub const RECENT: RecordFilter = RecordFilter { limit: 6, days: 0 };
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            limit: 100,
            days: 30,
        }
    }
}

// ── Category catalog ──────────────────────────────────────────────────────────

/// Category groups offered in the configuration form, keyed by group name.
pub type CategoryCatalog = BTreeMap<String, Vec<String>>;

/// Catalog used when the backend cannot supply one.
pub fn builtin_catalog() -> CategoryCatalog {
    let groups: [(&str, &[&str]); 5] = [
        (
            "Home Services",
            &[
                "plumber",
                "electrician",
                "hvac",
                "contractor",
                "roofer",
                "landscaper",
                "painter",
                "handyman",
            ],
        ),
        (
            "Health & Wellness",
            &["gym", "yoga studio", "dentist", "chiropractor", "salon", "barber"],
        ),
        (
            "Automotive",
            &["auto repair", "car dealer", "tire shop", "car wash", "body shop"],
        ),
        (
            "Professional Services",
            &["lawyer", "accountant", "insurance agent", "real estate agent"],
        ),
        (
            "Food & Dining",
            &["restaurant", "cafe", "bakery", "bar", "coffee shop"],
        ),
    ];
    groups
        .into_iter()
        .map(|(group, items)| {
            (
                group.to_string(),
                items.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}

// ── Export ────────────────────────────────────────────────────────────────────

/// File format the backend writes an export in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Xlsx,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xlsx" => Ok(Self::Xlsx),
            other => Err(PanelError::Config(format!("unknown export format: {other}"))),
        }
    }
}

/// Body of an export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub days: u32,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
            days: 30,
        }
    }
}

// ── View ──────────────────────────────────────────────────────────────────────

/// Top-level page of the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// First-run landing page.
    #[default]
    Welcome,
    /// Monitoring configuration form.
    Config,
    /// Job control, status and statistics.
    Dashboard,
    /// Collected records listing.
    Businesses,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Config => "config",
            Self::Dashboard => "dashboard",
            Self::Businesses => "businesses",
        };
        f.write_str(s)
    }
}
