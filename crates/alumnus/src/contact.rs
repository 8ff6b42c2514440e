//! Contact records and their status.

use crate::dispatch::DispatchOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing status of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Pending,
    Sent,
    Skipped,
    Error,
}

impl ContactStatus {
    /// Status written back for a dispatch outcome
    #[must_use]
    pub const fn from_outcome(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Sent => Self::Sent,
            DispatchOutcome::ConnectionNeeded => Self::Skipped,
            DispatchOutcome::Error => Self::Error,
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
            Self::Skipped => write!(f, "skipped"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Spreadsheet labels for each status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusLabels {
    pub pending: String,
    pub sent: String,
    pub skipped: String,
    pub error: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            pending: "Bekliyor".to_string(),
            sent: "Gönderildi".to_string(),
            skipped: "Atlandı".to_string(),
            error: "Hata".to_string(),
        }
    }
}

impl StatusLabels {
    /// Label for a status
    #[must_use]
    pub fn label(&self, status: ContactStatus) -> &str {
        match status {
            ContactStatus::Pending => &self.pending,
            ContactStatus::Sent => &self.sent,
            ContactStatus::Skipped => &self.skipped,
            ContactStatus::Error => &self.error,
        }
    }

    /// Status for a cell value. Blank cells count as pending; unknown
    /// labels are `None`.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Option<ContactStatus> {
        let raw = raw.trim();
        if raw.is_empty() || raw == self.pending {
            Some(ContactStatus::Pending)
        } else if raw == self.sent {
            Some(ContactStatus::Sent)
        } else if raw == self.skipped {
            Some(ContactStatus::Skipped)
        } else if raw == self.error {
            Some(ContactStatus::Error)
        } else {
            None
        }
    }
}

/// One alumnus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Zero-based data row in the record source
    pub row: usize,
    /// Profile URL, normalized
    pub profile_url: String,
    /// Full name
    pub name: String,
    pub graduation_year: String,
    pub company: String,
    pub position: String,
    pub status: ContactStatus,
}

impl Contact {
    #[must_use]
    pub fn new(row: usize, name: impl Into<String>, profile_url: &str) -> Self {
        Self {
            row,
            profile_url: normalize_url(profile_url),
            name: name.into(),
            graduation_year: String::new(),
            company: String::new(),
            position: String::new(),
            status: ContactStatus::Pending,
        }
    }

    #[must_use]
    pub fn with_graduation_year(mut self, year: impl Into<String>) -> Self {
        self.graduation_year = year.into();
        self
    }

    #[must_use]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    /// First word of the name
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }

    /// Whether there is a URL to visit
    #[must_use]
    pub fn has_url(&self) -> bool {
        !self.profile_url.is_empty()
    }
}

/// Trim and prepend `https://` when the scheme is missing
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lowered = trimmed.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
