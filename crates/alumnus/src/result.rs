//! Result and error types for Alumnus.

use thiserror::Error;

/// Result type for Alumnus operations
pub type AlumnusResult<T> = Result<T, AlumnusError>;

/// Errors that can occur in Alumnus
#[derive(Debug, Error)]
pub enum AlumnusError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Browser connection lost or never established
    #[error("Browser session unavailable: {message}")]
    SessionUnavailable {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Element handle no longer attached to the page
    #[error("Stale element reference: {id}")]
    StaleElement {
        /// Handle id
        id: String,
    },

    /// Another element received the click
    #[error("Click on {id} was intercepted: {message}")]
    ClickIntercepted {
        /// Handle id
        id: String,
        /// Error message
        message: String,
    },

    /// Locator expression rejected by the automation layer
    #[error("Invalid selector {selector}: {message}")]
    InvalidSelector {
        /// Selector text
        selector: String,
        /// Error message
        message: String,
    },

    /// Any other failure reported by the automation layer
    #[error("Driver error: {message}")]
    DriverError {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    ScreenshotError {
        /// Error message
        message: String,
    },

    /// Record source error
    #[error("Record source error: {message}")]
    RecordError {
        /// Error message
        message: String,
    },

    /// Template rendering error
    #[error("Template error: {message}")]
    TemplateError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AlumnusError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::DriverError {
            message: message.into(),
        }
    }

    /// Create a record source error
    #[must_use]
    pub fn record(message: impl Into<String>) -> Self {
        Self::RecordError {
            message: message.into(),
        }
    }

    /// Create a template error
    #[must_use]
    pub fn template(message: impl Into<String>) -> Self {
        Self::TemplateError {
            message: message.into(),
        }
    }

    /// Whether the error means the element reference went away
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement { .. })
    }
}
