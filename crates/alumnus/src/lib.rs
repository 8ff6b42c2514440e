//! Alumnus: browser-driven outreach messaging for alumni networks
//!
//! Reads contacts from a record source, renders a message per contact, and
//! drives a browser session to each profile to deliver it. The browser is
//! reached through the [`UiDriver`] trait: [`ChromiumDriver`] speaks CDP
//! (feature `browser`), [`mock::MockDriver`] runs a scripted page in memory.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐
//! │ RecordSource │──►│   Campaign   │──►│ Session ─► Dispatcher    │
//! │ (CSV sheet)  │   │ render/audit │   │  cleanup / resolve /     │
//! └──────────────┘   └──────────────┘   │  disambiguate / submit   │
//!                                       └────────────┬─────────────┘
//!                                                    ▼
//!                                          UiDriver (CDP | mock)
//! ```

#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod audit;
mod browser;
mod campaign;
mod cleanup;
mod contact;
mod disambiguate;
mod dispatch;
mod driver;
mod interaction;
mod locator;
mod records;
mod resolver;
mod result;
mod session;
mod template;
mod wait;

/// In-memory driver over a scripted page tree
///
/// Substitutes the browser in tests and dry runs.
#[allow(clippy::missing_const_for_fn)]
pub mod mock;

pub use audit::{AuditAction, AuditLog, AuditStatus, AUDIT_HEADER};
pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use campaign::{
    Campaign, CampaignObserver, CampaignOptions, CampaignSummary, NoopObserver, DEFAULT_DELAY,
    DEFAULT_MAX_CONTACTS,
};
pub use cleanup::{CleanupReport, SurfaceCleaner, DEFAULT_MAX_PASSES};
pub use contact::{normalize_url, Contact, ContactStatus, StatusLabels};
pub use disambiguate::{Composer, Disambiguation, Disambiguator, MatchConfidence};
pub use dispatch::{
    DispatchOutcome, DispatchReport, DispatchState, DispatchTarget, FailureReason,
    MessageDispatcher,
};
pub use driver::{ElementHandle, Key, UiDriver};
pub use interaction::{human_type, nudge, safe_click, ClickOutcome, TypingProfile};
pub use locator::{LocatorTable, Role, Selector};
pub use records::{ColumnMapping, CsvRecordSource, MemoryRecordSource, RecordSource};
pub use resolver::{ElementResolver, Resolution, ResolutionFailure};
pub use result::{AlumnusError, AlumnusResult};
pub use session::Session;
pub use template::{
    list_templates, Language, MessageRenderer, MessageTemplate, TemplateDefaults, PLACEHOLDERS,
};
pub use wait::{
    bounded_wait, poll_until, settle, Timings, WaitOptions, WaitResult,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Default feed page used for the login check
pub const FEED_URL: &str = "https://www.linkedin.com/feed/";
