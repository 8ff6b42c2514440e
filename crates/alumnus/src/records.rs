//! Record sources: where contacts come from and where their status goes.

use crate::contact::{normalize_url, Contact, ContactStatus, StatusLabels};
use crate::result::{AlumnusError, AlumnusResult};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads contacts and writes back their status
pub trait RecordSource: Send {
    /// Every contact, in row order
    fn fetch_all(&mut self) -> AlumnusResult<Vec<Contact>>;

    /// Contacts still waiting for a message
    fn fetch_pending(&mut self) -> AlumnusResult<Vec<Contact>> {
        let pending: Vec<Contact> = self
            .fetch_all()?
            .into_iter()
            .filter(|c| c.status == ContactStatus::Pending)
            .collect();
        tracing::info!(count = pending.len(), "pending contacts");
        Ok(pending)
    }

    /// Record the status of one row
    fn update_status(&mut self, row: usize, status: ContactStatus) -> AlumnusResult<()>;

    /// Row of the contact with this profile URL
    fn find_row(&mut self, profile_url: &str) -> AlumnusResult<Option<usize>> {
        let wanted = url_key(profile_url);
        Ok(self
            .fetch_all()?
            .into_iter()
            .find(|c| url_key(&c.profile_url) == wanted)
            .map(|c| c.row))
    }
}

fn url_key(url: &str) -> String {
    normalize_url(url).trim_end_matches('/').to_lowercase()
}

// =============================================================================
// CSV
// =============================================================================

/// Column headers for each contact field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub name: String,
    pub profile_url: String,
    pub graduation_year: String,
    pub company: String,
    pub position: String,
    pub status: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            name: "Ad Soyad".to_string(),
            profile_url: "LinkedIn URL".to_string(),
            graduation_year: "Mezuniyet Yılı".to_string(),
            company: "Şirket".to_string(),
            position: "Pozisyon".to_string(),
            status: "Durum".to_string(),
        }
    }
}

#[derive(Debug)]
struct Columns {
    name: Option<usize>,
    profile_url: usize,
    graduation_year: Option<usize>,
    company: Option<usize>,
    position: Option<usize>,
    status: Option<usize>,
}

/// Spreadsheet exported as CSV, header row first
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    path: PathBuf,
    columns: ColumnMapping,
    labels: StatusLabels,
}

impl CsvRecordSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            columns: ColumnMapping::default(),
            labels: StatusLabels::default(),
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: StatusLabels) -> Self {
        self.labels = labels;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> AlumnusResult<(StringRecord, Vec<StringRecord>)> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| AlumnusError::record(format!("{}: {e}", self.path.display())))?;
        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok((headers, rows))
    }

    fn columns(&self, headers: &StringRecord) -> AlumnusResult<Columns> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let profile_url = find(&self.columns.profile_url).ok_or_else(|| {
            AlumnusError::record(format!(
                "column '{}' not found in {}",
                self.columns.profile_url,
                self.path.display()
            ))
        })?;
        Ok(Columns {
            name: find(&self.columns.name),
            profile_url,
            graduation_year: find(&self.columns.graduation_year),
            company: find(&self.columns.company),
            position: find(&self.columns.position),
            status: find(&self.columns.status),
        })
    }

    fn contact(&self, row: usize, record: &StringRecord, columns: &Columns) -> Contact {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };
        let raw_status = cell(columns.status);
        let status = self.labels.parse(&raw_status).unwrap_or_else(|| {
            tracing::debug!(row, status = %raw_status, "unrecognized status label, treating as handled");
            ContactStatus::Skipped
        });
        let mut contact = Contact::new(row, cell(columns.name), &cell(Some(columns.profile_url)))
            .with_graduation_year(cell(columns.graduation_year))
            .with_company(cell(columns.company))
            .with_position(cell(columns.position));
        contact.status = status;
        contact
    }
}

impl RecordSource for CsvRecordSource {
    fn fetch_all(&mut self) -> AlumnusResult<Vec<Contact>> {
        let (headers, rows) = self.read()?;
        let columns = self.columns(&headers)?;
        let contacts: Vec<Contact> = rows
            .iter()
            .enumerate()
            .map(|(row, record)| self.contact(row, record, &columns))
            .collect();
        tracing::info!(count = contacts.len(), path = %self.path.display(), "loaded contacts");
        Ok(contacts)
    }

    fn update_status(&mut self, row: usize, status: ContactStatus) -> AlumnusResult<()> {
        let (headers, mut rows) = self.read()?;
        let column = headers
            .iter()
            .position(|h| h.trim() == self.columns.status)
            .ok_or_else(|| {
                AlumnusError::record(format!("status column '{}' not found", self.columns.status))
            })?;
        let width = headers.len();
        let record = rows
            .get_mut(row)
            .ok_or_else(|| AlumnusError::record(format!("row {row} out of range")))?;

        let label = self.labels.label(status);
        let updated: StringRecord = (0..width.max(record.len()))
            .map(|i| {
                if i == column {
                    label
                } else {
                    record.get(i).unwrap_or("")
                }
            })
            .collect();
        *record = updated;

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&tmp)?;
            writer.write_record(&headers)?;
            for record in &rows {
                writer.write_record(record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(row, status = %label, "status updated");
        Ok(())
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-memory record source
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    contacts: Vec<Contact>,
    updates: Vec<(usize, ContactStatus)>,
}

impl MemoryRecordSource {
    #[must_use]
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts,
            updates: Vec::new(),
        }
    }

    /// Status updates in the order they were made
    #[must_use]
    pub fn updates(&self) -> &[(usize, ContactStatus)] {
        &self.updates
    }
}

impl RecordSource for MemoryRecordSource {
    fn fetch_all(&mut self) -> AlumnusResult<Vec<Contact>> {
        Ok(self.contacts.clone())
    }

    fn update_status(&mut self, row: usize, status: ContactStatus) -> AlumnusResult<()> {
        let contact = self
            .contacts
            .iter_mut()
            .find(|c| c.row == row)
            .ok_or_else(|| AlumnusError::record(format!("row {row} out of range")))?;
        contact.status = status;
        self.updates.push((row, status));
        Ok(())
    }
}
