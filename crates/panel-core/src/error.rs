use thiserror::Error;

/// All errors produced by the control panel.
#[derive(Error, Debug)]
pub enum PanelError {
    /// The backend could not be reached, or the connection broke mid-request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The backend answered with `success: false`.
    #[error("{operation} rejected: {}", message.as_deref().unwrap_or("no reason given"))]
    Rejected {
        operation: &'static str,
        message: Option<String>,
    },

    /// A monitoring configuration failed local validation before transmission.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A settings value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local file access failed (e.g. persisting last-used parameters).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PanelError {
    /// Build a [`PanelError::Rejected`] for `operation`.
    pub fn rejected(operation: &'static str, message: Option<String>) -> Self {
        Self::Rejected { operation, message }
    }

    /// Text to put in front of the operator.
    ///
    /// Server-supplied rejection reasons and local validation failures are
    /// shown verbatim; everything else collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            Self::InvalidConfig(reason) => reason.clone(),
            _ => fallback.to_string(),
        }
    }

    /// `true` for network and decode failures (as opposed to application-level ones).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::JsonParse(_))
    }
}

/// Convenience alias used throughout the panel crates.
pub type Result<T> = std::result::Result<T, PanelError>;
