use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PanelError, Result};
use crate::models::{ExportFormat, ExportRequest, RecordFilter};
use crate::timings::Timings;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Headless control panel for the background scraper
#[derive(Parser, Debug, Clone)]
#[command(
    name = "scraper-panel",
    about = "Headless control panel for the background scraper",
    version
)]
pub struct Settings {
    /// Base URL of the scraper backend
    #[arg(long, env = "SCRAPER_PANEL_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// What to do after the session has initialised
    #[arg(long, default_value = "watch", value_parser = ["watch", "start", "stop", "export"])]
    pub command: String,

    /// Job status poll interval in seconds (1-300)
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..=300))]
    pub status_interval: u64,

    /// Statistics poll interval in seconds (1-3600)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub statistics_interval: u64,

    /// Delay before the status check that follows start/stop, in milliseconds
    #[arg(long, default_value = "1000")]
    pub settle_delay_ms: u64,

    /// Delay before leaving first-time setup for the dashboard, in milliseconds
    #[arg(long, default_value = "1500")]
    pub setup_delay_ms: u64,

    /// Page size of the businesses listing
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u32).range(1..))]
    pub business_limit: u32,

    /// Look-back window of the businesses listing and exports, in days (0 = all)
    #[arg(long, default_value = "30")]
    pub business_days: u32,

    /// Export file format
    #[arg(long, default_value = "csv", value_parser = ["csv", "json", "xlsx"])]
    pub export_format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved parameters
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.scraper-panel/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".scraper-panel").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge with last-used params where no explicit
    /// CLI value was provided, then persist the result.
    ///
    /// A failure to persist or clear the params does not stop startup; it is
    /// handed back so the caller can log it once logging is up.
    pub fn load_with_last_used() -> (Self, Option<PanelError>) {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit path so that tests
    /// can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> (Self, Option<PanelError>) {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let problem = LastUsedParams::clear_at(config_path).err();
            return (Self::apply_debug(settings), problem);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI (and env) always win over the persisted values.
        if !is_arg_explicitly_set(&matches, "base_url") {
            if let Some(v) = last.base_url {
                settings.base_url = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "log_level") {
            if let Some(v) = last.log_level {
                settings.log_level = v;
            }
        }

        let problem = LastUsedParams::from(&settings).save_to(config_path).err();

        (Self::apply_debug(settings), problem)
    }

    /// `--debug` overrides the log level (not persisted).
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Schedules derived from the interval options.
    pub fn timings(&self) -> Timings {
        Timings {
            status_interval: Duration::from_secs(self.status_interval),
            statistics_interval: Duration::from_secs(self.statistics_interval),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            setup_complete_delay: Duration::from_millis(self.setup_delay_ms),
            ..Timings::default()
        }
    }

    /// Initial filter of the businesses listing.
    pub fn record_filter(&self) -> RecordFilter {
        RecordFilter {
            limit: self.business_limit,
            days: self.business_days,
        }
    }

    /// Export request built from the export options.
    pub fn export_request(&self) -> ExportRequest {
        ExportRequest {
            format: self.export_format.parse().unwrap_or(ExportFormat::Csv),
            days: self.business_days,
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            base_url: Some(s.base_url.clone()),
            log_level: Some(s.log_level.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line or
/// through its environment variable.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine | clap::parser::ValueSource::EnvVariable)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
