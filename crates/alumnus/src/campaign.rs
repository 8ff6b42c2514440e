//! Sequential outreach over a batch of pending contacts.
//!
//! For each contact: render the message, dispatch it through the session,
//! write the status back to the record source and append an audit row.
//! A misbehaving profile never aborts the loop; only a lost browser does.

use crate::audit::{AuditAction, AuditLog, AuditStatus};
use crate::contact::{Contact, ContactStatus};
use crate::dispatch::{DispatchOutcome, DispatchTarget};
use crate::driver::UiDriver;
use crate::records::RecordSource;
use crate::result::{AlumnusError, AlumnusResult};
use crate::session::Session;
use crate::template::MessageRenderer;
use crate::wait::settle;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Default contacts per run
pub const DEFAULT_MAX_CONTACTS: usize = 25;
/// Default pause between dispatches
pub const DEFAULT_DELAY: Duration = Duration::from_secs(45);

/// Campaign knobs
#[derive(Debug, Clone)]
pub struct CampaignOptions {
    pub max_contacts: usize,
    pub delay_between: Duration,
    /// Skip URLs that already have a `success` audit row
    pub skip_processed: bool,
    /// Where error screenshots go; `None` disables them
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for CampaignOptions {
    fn default() -> Self {
        Self {
            max_contacts: DEFAULT_MAX_CONTACTS,
            delay_between: DEFAULT_DELAY,
            skip_processed: true,
            screenshot_dir: None,
        }
    }
}

impl CampaignOptions {
    #[must_use]
    pub const fn with_max_contacts(mut self, max: usize) -> Self {
        self.max_contacts = max;
        self
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_between = delay;
        self
    }

    #[must_use]
    pub const fn with_skip_processed(mut self, skip: bool) -> Self {
        self.skip_processed = skip;
        self
    }

    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }
}

/// Counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CampaignSummary {
    pub sent: usize,
    pub connection_needed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total: usize,
}

impl CampaignSummary {
    fn count(&mut self, status: ContactStatus, outcome: Option<DispatchOutcome>) {
        self.total += 1;
        match (status, outcome) {
            (_, Some(DispatchOutcome::ConnectionNeeded)) => self.connection_needed += 1,
            (ContactStatus::Sent, _) => self.sent += 1,
            (ContactStatus::Error, _) => self.errors += 1,
            (ContactStatus::Skipped | ContactStatus::Pending, _) => self.skipped += 1,
        }
    }
}

/// Progress hooks. Every method defaults to a no-op.
pub trait CampaignObserver {
    fn on_start(&mut self, _total: usize) {}
    fn on_contact(&mut self, _index: usize, _contact: &Contact) {}
    fn on_result(&mut self, _contact: &Contact, _status: ContactStatus, _notes: &str) {}
    fn on_waiting(&mut self, _delay: Duration) {}
    fn on_finish(&mut self, _summary: &CampaignSummary) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CampaignObserver for NoopObserver {}

/// One campaign run
#[derive(Debug)]
pub struct Campaign<'a, D: UiDriver, R: RecordSource> {
    session: &'a Session<D>,
    records: &'a mut R,
    renderer: &'a MessageRenderer,
    audit: Option<&'a AuditLog>,
    options: CampaignOptions,
}

impl<'a, D: UiDriver, R: RecordSource> Campaign<'a, D, R> {
    pub fn new(
        session: &'a Session<D>,
        records: &'a mut R,
        renderer: &'a MessageRenderer,
    ) -> Self {
        Self {
            session,
            records,
            renderer,
            audit: None,
            options: CampaignOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_audit(mut self, audit: &'a AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: CampaignOptions) -> Self {
        self.options = options;
        self
    }

    /// Process up to `max_contacts` of `pending`.
    ///
    /// # Errors
    ///
    /// Only a dead browser session ends the run early. Per-contact failures
    /// are recorded and counted.
    pub async fn run(
        &mut self,
        pending: Vec<Contact>,
        observer: &mut dyn CampaignObserver,
    ) -> AlumnusResult<CampaignSummary> {
        let batch: Vec<Contact> = pending.into_iter().take(self.options.max_contacts).collect();
        let processed = self.processed_urls();
        let mut summary = CampaignSummary::default();
        let mut dispatched = false;

        observer.on_start(batch.len());
        tracing::info!(contacts = batch.len(), "campaign started");

        for (index, contact) in batch.iter().enumerate() {
            observer.on_contact(index, contact);

            if let Some(note) = skip_reason(contact, &processed) {
                tracing::info!(row = contact.row, name = %contact.name, note, "skipping contact");
                self.write_status(contact, ContactStatus::Skipped);
                self.write_audit(contact, AuditAction::Skip, AuditStatus::Skipped, note);
                summary.count(ContactStatus::Skipped, None);
                observer.on_result(contact, ContactStatus::Skipped, note);
                continue;
            }

            let message = match self.renderer.render(contact) {
                Ok(message) => message,
                Err(err) => {
                    let note = err.to_string();
                    tracing::error!(row = contact.row, error = %note, "message rendering failed");
                    self.write_status(contact, ContactStatus::Error);
                    self.write_audit(contact, AuditAction::SendMessage, AuditStatus::Error, &note);
                    summary.count(ContactStatus::Error, None);
                    observer.on_result(contact, ContactStatus::Error, &note);
                    continue;
                }
            };

            if dispatched && !self.options.delay_between.is_zero() {
                observer.on_waiting(self.options.delay_between);
                settle(self.options.delay_between).await;
            }
            if !self.session.is_connected().await {
                return Err(AlumnusError::SessionUnavailable {
                    message: format!("browser lost before contact row {}", contact.row),
                });
            }
            dispatched = true;

            let mut target = DispatchTarget::new(contact.profile_url.clone(), message);
            if !contact.name.is_empty() {
                target = target.with_display_name(contact.name.clone());
            }
            let report = self.session.dispatch(&target).await;
            let status = ContactStatus::from_outcome(report.outcome);
            let notes = report.notes();

            if report.outcome == DispatchOutcome::Error {
                self.capture_screenshot(contact).await;
            }
            self.write_status(contact, status);
            self.write_audit(
                contact,
                AuditAction::SendMessage,
                AuditStatus::from_outcome(report.outcome),
                &notes,
            );
            summary.count(status, Some(report.outcome));
            observer.on_result(contact, status, &notes);
        }

        tracing::info!(
            sent = summary.sent,
            connection_needed = summary.connection_needed,
            skipped = summary.skipped,
            errors = summary.errors,
            "campaign finished"
        );
        observer.on_finish(&summary);
        Ok(summary)
    }

    fn processed_urls(&self) -> HashSet<String> {
        if !self.options.skip_processed {
            return HashSet::new();
        }
        match self.audit.map(AuditLog::processed_urls) {
            Some(Ok(urls)) => urls,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "could not read audit log, nothing counts as processed");
                HashSet::new()
            }
            None => HashSet::new(),
        }
    }

    fn write_status(&mut self, contact: &Contact, status: ContactStatus) {
        if let Err(err) = self.records.update_status(contact.row, status) {
            tracing::error!(row = contact.row, %status, error = %err, "status update failed");
        }
    }

    fn write_audit(&self, contact: &Contact, action: AuditAction, status: AuditStatus, notes: &str) {
        if let Some(audit) = self.audit {
            if let Err(err) = audit.record(contact, action, status, notes) {
                tracing::error!(row = contact.row, error = %err, "audit write failed");
            }
        }
    }

    async fn capture_screenshot(&self, contact: &Contact) {
        let Some(dir) = &self.options.screenshot_dir else {
            return;
        };
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("error_row{}_{stamp}.png", contact.row));
        let saved = match self.session.screenshot().await {
            Ok(png) => std::fs::create_dir_all(dir)
                .and_then(|()| std::fs::write(&path, png))
                .map_err(AlumnusError::from),
            Err(err) => Err(err),
        };
        match saved {
            Ok(()) => tracing::info!(path = %path.display(), "error screenshot saved"),
            Err(err) => tracing::warn!(error = %err, "error screenshot failed"),
        }
    }
}

fn skip_reason(contact: &Contact, processed: &HashSet<String>) -> Option<&'static str> {
    if !contact.has_url() {
        Some("no profile url")
    } else if processed.contains(&contact.profile_url) {
        Some("already processed")
    } else {
        None
    }
}
