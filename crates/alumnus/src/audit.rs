//! Append-only CSV audit trail, one row per attempt.

use crate::contact::Contact;
use crate::dispatch::DispatchOutcome;
use crate::result::{AlumnusError, AlumnusResult};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column headers, in order
pub const AUDIT_HEADER: [&str; 9] = [
    "timestamp",
    "alumni_name",
    "linkedin_url",
    "graduation_year",
    "company",
    "position",
    "action",
    "status",
    "notes",
];

/// What was done for a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// A message dispatch was attempted
    SendMessage,
    /// The contact was passed over without a dispatch
    Skip,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendMessage => write!(f, "send_message"),
            Self::Skip => write!(f, "skipped"),
        }
    }
}

/// How it went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Success,
    ConnectionNeeded,
    Skipped,
    Error,
}

impl AuditStatus {
    #[must_use]
    pub const fn from_outcome(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Sent => Self::Success,
            DispatchOutcome::ConnectionNeeded => Self::ConnectionNeeded,
            DispatchOutcome::Error => Self::Error,
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ConnectionNeeded => write!(f, "connection_needed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// CSV audit log
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Open the log, writing the header if the file is new
    pub fn open(path: impl Into<PathBuf>) -> AlumnusResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let log = Self { path };
        let is_empty = fs::metadata(&log.path).map_or(true, |m| m.len() == 0);
        if is_empty {
            log.append(&AUDIT_HEADER)?;
        }
        Ok(log)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row for `contact`
    pub fn record(
        &self,
        contact: &Contact,
        action: AuditAction,
        status: AuditStatus,
        notes: &str,
    ) -> AlumnusResult<()> {
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        let action = action.to_string();
        let status = status.to_string();
        let name = if contact.name.is_empty() {
            "Unknown"
        } else {
            contact.name.as_str()
        };
        self.append(&[
            timestamp.as_str(),
            name,
            contact.profile_url.as_str(),
            contact.graduation_year.as_str(),
            contact.company.as_str(),
            contact.position.as_str(),
            action.as_str(),
            status.as_str(),
            notes,
        ])
    }

    /// URLs that already have a `success` row
    pub fn processed_urls(&self) -> AlumnusResult<HashSet<String>> {
        let mut processed = HashSet::new();
        if !self.path.exists() {
            return Ok(processed);
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);
        let (Some(url_col), Some(status_col)) = (column("linkedin_url"), column("status")) else {
            return Err(AlumnusError::record(format!(
                "{} is not an audit log",
                self.path.display()
            )));
        };
        for record in reader.records() {
            let record = record?;
            if record.get(status_col) == Some("success") {
                if let Some(url) = record.get(url_col) {
                    let _ = processed.insert(url.to_string());
                }
            }
        }
        Ok(processed)
    }

    /// Serialize the row first so it reaches the file in one write
    fn append(&self, fields: &[&str]) -> AlumnusResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(fields)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| AlumnusError::record(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&bytes)?;
        Ok(())
    }
}
