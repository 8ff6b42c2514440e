//! Message dispatch state machine.
//!
//! ```text
//! Idle → Cleaning → Navigating → Cleaning → LocatingEntryPoint
//!      → AwaitingConversation → Disambiguating → Composing → Submitting
//!      → Verifying → { Sent | ConnectionNeeded | Error }
//! ```
//!
//! [`MessageDispatcher::dispatch`] never fails: engine errors in the middle of
//! an attempt become an [`DispatchOutcome::Error`] with the failing step in
//! the report. Every attempt that does not end in `Sent` runs one more
//! cleanup so no overlay is left open for the next contact.

use crate::cleanup::{SurfaceCleaner, DEFAULT_MAX_PASSES};
use crate::disambiguate::{Composer, Disambiguation, Disambiguator, MatchConfidence};
use crate::driver::{ElementHandle, UiDriver};
use crate::interaction::{human_type, nudge, safe_click, ClickOutcome, TypingProfile};
use crate::locator::{LocatorTable, Role};
use crate::resolver::{ElementResolver, Resolution, ResolutionFailure};
use crate::result::{AlumnusError, AlumnusResult};
use crate::wait::{bounded_wait, poll_until, settle, Timings};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

// =============================================================================
// STATES AND OUTCOMES
// =============================================================================

/// Dispatch states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Idle,
    Cleaning,
    Navigating,
    LocatingEntryPoint,
    AwaitingConversation,
    Disambiguating,
    Composing,
    Submitting,
    Verifying,
    Sent,
    ConnectionNeeded,
    Error,
}

impl DispatchState {
    /// Whether the state ends an attempt
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::ConnectionNeeded | Self::Error)
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Cleaning => "cleaning",
            Self::Navigating => "navigating",
            Self::LocatingEntryPoint => "locating_entry_point",
            Self::AwaitingConversation => "awaiting_conversation",
            Self::Disambiguating => "disambiguating",
            Self::Composing => "composing",
            Self::Submitting => "submitting",
            Self::Verifying => "verifying",
            Self::Sent => "sent",
            Self::ConnectionNeeded => "connection_needed",
            Self::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Terminal outcome of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The message was submitted
    Sent,
    /// The target is not a direct connection; needs an invitation first
    ConnectionNeeded,
    /// The attempt failed
    Error,
}

impl DispatchOutcome {
    /// Terminal state for this outcome
    #[must_use]
    pub const fn state(&self) -> DispatchState {
        match self {
            Self::Sent => DispatchState::Sent,
            Self::ConnectionNeeded => DispatchState::ConnectionNeeded,
            Self::Error => DispatchState::Error,
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.state().fmt(f)
    }
}

/// Why an attempt ended in `Error`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Profile page could not be loaded
    Navigation(String),
    /// Neither a message nor a connect control, even after the overflow menu
    EntryPointMissing,
    /// The message control could not be clicked
    EntryPointClick(String),
    /// No usable text box
    TextBox(ResolutionFailure),
    /// Typing into the text box failed
    Compose(String),
    /// No usable submit control
    SubmitButton(ResolutionFailure),
    /// The submit control could not be clicked
    SubmitClick(String),
    /// Unexpected automation failure
    Engine(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigation(msg) => write!(f, "navigation failed: {msg}"),
            Self::EntryPointMissing => write!(f, "message button not found"),
            Self::EntryPointClick(msg) => write!(f, "message button click failed: {msg}"),
            Self::TextBox(failure) => write!(f, "text box {failure}"),
            Self::Compose(msg) => write!(f, "typing failed: {msg}"),
            Self::SubmitButton(failure) => write!(f, "submit button {failure}"),
            Self::SubmitClick(msg) => write!(f, "submit click failed: {msg}"),
            Self::Engine(msg) => write!(f, "automation error: {msg}"),
        }
    }
}

/// One unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTarget {
    /// Profile URL
    pub profile_url: String,
    /// Name from the record source, used when the page heading is unreadable
    pub display_name: Option<String>,
    /// Message text
    pub message: String,
}

impl DispatchTarget {
    #[must_use]
    pub fn new(profile_url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            profile_url: profile_url.into(),
            display_name: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Diagnostics for one attempt
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// Terminal outcome
    pub outcome: DispatchOutcome,
    /// Failure detail for `Error`
    pub reason: Option<FailureReason>,
    /// How the composer was chosen, when one was
    pub confidence: Option<MatchConfidence>,
    /// Name used to pick the overlay
    pub target_name: Option<String>,
    /// States visited, in order
    pub trail: Vec<DispatchState>,
    /// The overflow menu was opened to find the entry point
    pub used_overflow: bool,
    /// Clicks that needed the programmatic fallback
    pub fallback_clicks: u32,
    /// Wall-clock duration
    pub elapsed: Duration,
}

impl DispatchReport {
    /// Short note for the audit log
    #[must_use]
    pub fn notes(&self) -> String {
        match (&self.outcome, &self.reason) {
            (DispatchOutcome::Error, Some(reason)) => reason.to_string(),
            (DispatchOutcome::Sent, _) => match self.confidence {
                Some(MatchConfidence::Positional) => "sent (positional match)".to_string(),
                _ => "sent".to_string(),
            },
            (outcome, _) => outcome.to_string(),
        }
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

type Step = (DispatchOutcome, Option<FailureReason>);

#[derive(Debug, Default)]
struct Attempt {
    trail: Vec<DispatchState>,
    confidence: Option<MatchConfidence>,
    target_name: Option<String>,
    used_overflow: bool,
    fallback_clicks: u32,
}

impl Attempt {
    fn enter(&mut self, state: DispatchState) {
        let from = self.trail.last().copied().unwrap_or(DispatchState::Idle);
        tracing::debug!(%from, to = %state, "dispatch state");
        self.trail.push(state);
    }

    fn count(&mut self, outcome: &ClickOutcome) {
        if *outcome == ClickOutcome::Programmatic {
            self.fallback_clicks += 1;
        }
    }
}

#[derive(Debug)]
enum EntryPoint {
    Message(ElementHandle),
    Connect,
    Missing,
}

/// Drives one message attempt at a time through a [`UiDriver`]
#[derive(Debug)]
pub struct MessageDispatcher<'a, D: UiDriver + ?Sized> {
    driver: &'a D,
    table: &'a LocatorTable,
    timings: Timings,
    typing: TypingProfile,
    cleanup_passes: u32,
}

impl<'a, D: UiDriver + ?Sized> MessageDispatcher<'a, D> {
    #[must_use]
    pub fn new(driver: &'a D, table: &'a LocatorTable) -> Self {
        Self {
            driver,
            table,
            timings: Timings::default(),
            typing: TypingProfile::default(),
            cleanup_passes: DEFAULT_MAX_PASSES,
        }
    }

    #[must_use]
    pub const fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    #[must_use]
    pub fn with_typing(mut self, typing: TypingProfile) -> Self {
        self.typing = typing;
        self
    }

    #[must_use]
    pub const fn with_cleanup_passes(mut self, passes: u32) -> Self {
        self.cleanup_passes = passes;
        self
    }

    fn cleaner(&self) -> SurfaceCleaner<'a, D> {
        SurfaceCleaner::new(self.driver, self.table)
            .with_max_passes(self.cleanup_passes)
            .with_click_settle(self.timings.click_settle())
    }

    /// Run one attempt to completion
    pub async fn dispatch(&self, target: &DispatchTarget) -> DispatchReport {
        let start = Instant::now();
        let mut attempt = Attempt {
            trail: vec![DispatchState::Idle],
            ..Attempt::default()
        };

        let (outcome, reason) = match self.run(target, &mut attempt).await {
            Ok(step) => step,
            Err(e) => {
                tracing::error!(url = %target.profile_url, error = %e, "dispatch aborted by automation error");
                (DispatchOutcome::Error, Some(FailureReason::Engine(e.to_string())))
            }
        };

        if outcome != DispatchOutcome::Sent {
            attempt.enter(DispatchState::Cleaning);
            if let Err(e) = self.cleaner().cleanup_surface().await {
                tracing::warn!(error = %e, "closing cleanup failed");
            }
        }
        attempt.enter(outcome.state());
        self.driver.release_elements().await;

        let report = DispatchReport {
            outcome,
            reason,
            confidence: attempt.confidence,
            target_name: attempt.target_name,
            trail: attempt.trail,
            used_overflow: attempt.used_overflow,
            fallback_clicks: attempt.fallback_clicks,
            elapsed: start.elapsed(),
        };
        match report.outcome {
            DispatchOutcome::Sent => tracing::info!(url = %target.profile_url, "message sent"),
            DispatchOutcome::ConnectionNeeded => {
                tracing::info!(url = %target.profile_url, "not connected, invitation needed");
            }
            DispatchOutcome::Error => tracing::warn!(
                url = %target.profile_url,
                reason = %report.notes(),
                step = ?report.trail.iter().rev().find(|s| !s.is_terminal() && **s != DispatchState::Cleaning),
                "message not sent"
            ),
        }
        report
    }

    async fn run(&self, target: &DispatchTarget, attempt: &mut Attempt) -> AlumnusResult<Step> {
        let resolver = ElementResolver::new(self.driver, self.table);
        let cleaner = self.cleaner();

        attempt.enter(DispatchState::Cleaning);
        let _ = cleaner.cleanup_surface().await?;

        attempt.enter(DispatchState::Navigating);
        if let Err(e) = self.driver.navigate(&target.profile_url).await {
            return match e {
                AlumnusError::NavigationError { message, .. } => {
                    Ok((DispatchOutcome::Error, Some(FailureReason::Navigation(message))))
                }
                other => Err(other),
            };
        }
        settle(self.timings.page_settle()).await;

        attempt.enter(DispatchState::Cleaning);
        let _ = cleaner.cleanup_surface().await?;

        attempt.target_name = self.target_name(&resolver, target).await?;
        tracing::info!(name = ?attempt.target_name, "target");

        // Entry point
        attempt.enter(DispatchState::LocatingEntryPoint);
        let mut entry = self.await_entry_point(&resolver).await?;
        if matches!(entry, EntryPoint::Missing) {
            if let Some(more) = resolver.resolve(Role::MoreActions, false).await? {
                tracing::info!("entry point not visible, opening the overflow menu");
                attempt.used_overflow = true;
                let outcome = safe_click(self.driver, &more, self.timings.click_settle()).await;
                attempt.count(&outcome);
                settle(self.timings.click_settle()).await;
                entry = self.await_entry_point(&resolver).await?;
            }
        }
        let message_button = match entry {
            EntryPoint::Message(button) => button,
            EntryPoint::Connect => return Ok((DispatchOutcome::ConnectionNeeded, None)),
            EntryPoint::Missing => {
                return Ok((DispatchOutcome::Error, Some(FailureReason::EntryPointMissing)));
            }
        };
        let outcome = safe_click(self.driver, &message_button, self.timings.click_settle()).await;
        attempt.count(&outcome);
        if let ClickOutcome::Failed(reason) = outcome {
            return Ok((DispatchOutcome::Error, Some(FailureReason::EntryPointClick(reason))));
        }
        settle(self.timings.conversation_open()).await;

        // Conversation
        attempt.enter(DispatchState::AwaitingConversation);
        let lookup = &resolver;
        let opened = bounded_wait(self.timings.wait_options(), move || async move {
            Ok(lookup.resolve(Role::ConversationPanel, false).await?.is_some()
                || lookup.resolve(Role::TextBox, false).await?.is_some())
        })
        .await?;
        if !opened.success {
            tracing::warn!(waited = ?opened.elapsed, "no conversation overlay appeared");
        }

        attempt.enter(DispatchState::Disambiguating);
        let composer = match Disambiguator::new(self.driver, self.table)
            .select(attempt.target_name.as_deref())
            .await?
        {
            Disambiguation::Chosen(composer) => composer,
            Disambiguation::Unresolved(failure) => {
                return Ok((DispatchOutcome::Error, Some(FailureReason::TextBox(failure))));
            }
        };
        attempt.confidence = Some(composer.confidence);

        // Compose
        attempt.enter(DispatchState::Composing);
        if let Err(e) = self.compose(&composer, &target.message, attempt).await {
            if e.is_stale() || matches!(e, AlumnusError::DriverError { .. }) {
                return Ok((DispatchOutcome::Error, Some(FailureReason::Compose(e.to_string()))));
            }
            return Err(e);
        }

        // Submit
        attempt.enter(DispatchState::Submitting);
        let submit = match self.await_submit(&resolver, &composer).await? {
            Resolution::Found(button) => button,
            other => {
                let failure = other.failure().unwrap_or(ResolutionFailure::Absent);
                return Ok((DispatchOutcome::Error, Some(FailureReason::SubmitButton(failure))));
            }
        };
        let outcome = safe_click(self.driver, &submit, self.timings.click_settle()).await;
        attempt.count(&outcome);
        if let ClickOutcome::Failed(reason) = outcome {
            return Ok((DispatchOutcome::Error, Some(FailureReason::SubmitClick(reason))));
        }

        attempt.enter(DispatchState::Verifying);
        settle(self.timings.send_settle()).await;
        // The submit click landed; nothing from here on may undo `Sent`.
        match cleaner.cleanup_surface().await {
            Ok(report) if report.exhausted => tracing::warn!("overlays still open after sending"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "cleanup after sending failed"),
        }
        Ok((DispatchOutcome::Sent, None))
    }

    /// Full name from the profile heading, else from the record
    async fn target_name(
        &self,
        resolver: &ElementResolver<'_, D>,
        target: &DispatchTarget,
    ) -> AlumnusResult<Option<String>> {
        let from_page = match resolver.resolve(Role::ProfileHeading, false).await? {
            Some(heading) => match self.driver.text(&heading).await {
                Ok(text) => clean_name(&text),
                Err(e) if e.is_stale() => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        Ok(from_page.or_else(|| target.display_name.as_deref().and_then(clean_name)))
    }

    async fn find_entry_point(&self, resolver: &ElementResolver<'_, D>) -> AlumnusResult<EntryPoint> {
        if let Some(button) = resolver.resolve(Role::MessageButton, false).await? {
            return Ok(EntryPoint::Message(button));
        }
        if resolver.resolve(Role::ConnectButton, false).await?.is_some() {
            return Ok(EntryPoint::Connect);
        }
        Ok(EntryPoint::Missing)
    }

    async fn await_entry_point(&self, resolver: &ElementResolver<'_, D>) -> AlumnusResult<EntryPoint> {
        poll_until(
            self.timings.wait_options(),
            move || self.find_entry_point(resolver),
            |entry| !matches!(entry, EntryPoint::Missing),
        )
        .await
    }

    async fn compose(&self, composer: &Composer, message: &str, attempt: &mut Attempt) -> AlumnusResult<()> {
        let outcome = safe_click(self.driver, &composer.textbox, self.timings.click_settle()).await;
        attempt.count(&outcome);
        if let ClickOutcome::Failed(reason) = &outcome {
            tracing::warn!(%reason, "could not focus the text box, typing anyway");
        }
        self.driver.clear(&composer.textbox).await?;
        human_type(self.driver, &composer.textbox, message, &self.typing).await?;
        nudge(self.driver, &composer.textbox).await
    }

    /// Submit control: enclosing form, then the chosen overlay, then anywhere
    async fn find_submit(
        &self,
        resolver: &ElementResolver<'_, D>,
        composer: &Composer,
    ) -> AlumnusResult<Resolution> {
        let mut scopes: Vec<ElementHandle> = Vec::new();
        for selector in self.table.get(Role::ComposeForm) {
            if selector.is_xpath() {
                continue;
            }
            match self.driver.closest(&composer.textbox, selector).await {
                Ok(Some(form)) => {
                    scopes.push(form);
                    break;
                }
                Ok(None) => {}
                Err(e) if e.is_stale() => break,
                Err(e) => return Err(e),
            }
        }
        if let Some(panel) = &composer.panel {
            scopes.push(panel.clone());
        }

        let mut worst = Resolution::Absent;
        for scope in scopes.iter().map(Some).chain(std::iter::once(None)) {
            match resolver.probe(Role::SubmitButton, scope, true).await? {
                found @ Resolution::Found(_) => return Ok(found),
                not_interactable @ Resolution::NotInteractable { .. } => {
                    if worst == Resolution::Absent {
                        worst = not_interactable;
                    }
                }
                Resolution::Absent => {}
            }
        }
        Ok(worst)
    }

    async fn await_submit(
        &self,
        resolver: &ElementResolver<'_, D>,
        composer: &Composer,
    ) -> AlumnusResult<Resolution> {
        poll_until(
            self.timings.wait_options(),
            move || self.find_submit(resolver, composer),
            |resolution| matches!(resolution, Resolution::Found(_)),
        )
        .await
    }
}

/// Name with whitespace collapsed, `None` when blank
fn clean_name(raw: &str) -> Option<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod naming_tests {
        use super::*;

        #[test]
        fn test_clean_name() {
            assert_eq!(clean_name("  Ayşe Nur\n Yılmaz "), Some("Ayşe Nur Yılmaz".to_string()));
            assert_eq!(clean_name("   "), None);
        }

        #[test]
        fn test_state_display() {
            assert_eq!(DispatchState::LocatingEntryPoint.to_string(), "locating_entry_point");
            assert_eq!(DispatchOutcome::ConnectionNeeded.to_string(), "connection_needed");
            assert!(DispatchState::Error.is_terminal());
            assert!(!DispatchState::Verifying.is_terminal());
        }

        #[test]
        fn test_reason_text_separates_absent_from_not_interactable() {
            let absent = FailureReason::SubmitButton(ResolutionFailure::Absent).to_string();
            let disabled = FailureReason::SubmitButton(ResolutionFailure::NotInteractable).to_string();
            assert_eq!(absent, "submit button absent");
            assert_eq!(disabled, "submit button present but not interactable");
        }
    }

    mod report_tests {
        use super::*;

        fn report(outcome: DispatchOutcome, reason: Option<FailureReason>) -> DispatchReport {
            DispatchReport {
                outcome,
                reason,
                confidence: None,
                target_name: None,
                trail: vec![DispatchState::Idle, outcome.state()],
                used_overflow: false,
                fallback_clicks: 0,
                elapsed: Duration::ZERO,
            }
        }

        #[test]
        fn test_notes() {
            assert_eq!(report(DispatchOutcome::Sent, None).notes(), "sent");
            assert_eq!(
                report(DispatchOutcome::ConnectionNeeded, None).notes(),
                "connection_needed"
            );
            assert_eq!(
                report(DispatchOutcome::Error, Some(FailureReason::EntryPointMissing)).notes(),
                "message button not found"
            );
        }

        #[test]
        fn test_positional_send_is_flagged() {
            let mut sent = report(DispatchOutcome::Sent, None);
            sent.confidence = Some(MatchConfidence::Positional);
            assert_eq!(sent.notes(), "sent (positional match)");
        }
    }
}
