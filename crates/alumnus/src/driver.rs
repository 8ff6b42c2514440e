//! UiDriver - Abstract Browser Automation Trait
//!
//! The dispatch workflow only ever talks to the page through [`UiDriver`],
//! so the CDP-backed [`crate::ChromiumDriver`] and the scriptable
//! [`crate::mock::MockDriver`] are interchangeable.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  UiDriver (query / click / type capability set)              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐          ┌─────────────────────┐    │
//! │  │  ChromiumDriver     │          │  MockDriver         │    │
//! │  │  CDP via            │          │  in-memory page     │    │
//! │  │  chromiumoxide      │          │  tree for tests     │    │
//! │  └─────────────────────┘          └─────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::locator::Selector;
use crate::result::AlumnusResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element handle for DOM interactions.
///
/// Handles are only references; visibility, enablement and text are always
/// read live through the driver because the page can change underneath.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Unique identifier for the element within the driver
    pub id: String,
    /// Locator expression that produced this handle
    pub matched_by: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, matched_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            matched_by: matched_by.into(),
        }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.matched_by)
    }
}

/// Non-text keys the workflow needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Delete the character before the caret
    Backspace,
    /// Soft line break (Shift+Enter) that does not submit the form
    LineBreak,
}

impl Key {
    /// CDP key name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Backspace => "Backspace",
            Self::LineBreak => "Enter",
        }
    }
}

/// Abstract driver trait for browser automation.
///
/// Lookups never fail for "nothing matched": they return an empty list or
/// `None`. Errors are reserved for engine failures and for handles that went
/// stale ([`crate::AlumnusError::StaleElement`]).
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> AlumnusResult<()>;

    /// Get current URL
    async fn current_url(&self) -> AlumnusResult<String>;

    /// Query all elements matching a selector, in document order
    async fn find_all(&self, selector: &Selector) -> AlumnusResult<Vec<ElementHandle>>;

    /// Query all descendants of `scope` matching a selector
    async fn find_within(
        &self,
        scope: &ElementHandle,
        selector: &Selector,
    ) -> AlumnusResult<Vec<ElementHandle>>;

    /// Nearest ancestor-or-self of `element` matching a CSS selector
    async fn closest(
        &self,
        element: &ElementHandle,
        selector: &Selector,
    ) -> AlumnusResult<Option<ElementHandle>>;

    /// Element currently holding input focus, if any
    async fn focused_element(&self) -> AlumnusResult<Option<ElementHandle>>;

    /// Whether the element is rendered and visible
    async fn is_displayed(&self, element: &ElementHandle) -> AlumnusResult<bool>;

    /// Whether the element accepts interaction (not disabled)
    async fn is_enabled(&self, element: &ElementHandle) -> AlumnusResult<bool>;

    /// Whether the element accepts text input
    async fn is_editable(&self, element: &ElementHandle) -> AlumnusResult<bool>;

    /// Visible text of the element
    async fn text(&self, element: &ElementHandle) -> AlumnusResult<String>;

    /// Scroll the element to the center of the viewport
    async fn scroll_into_view(&self, element: &ElementHandle) -> AlumnusResult<()>;

    /// Native (input-event) click
    async fn click(&self, element: &ElementHandle) -> AlumnusResult<()>;

    /// Programmatic click through the element's own click behavior
    async fn js_click(&self, element: &ElementHandle) -> AlumnusResult<()>;

    /// Remove any existing content from a text-entry control
    async fn clear(&self, element: &ElementHandle) -> AlumnusResult<()>;

    /// Type text into the element
    async fn type_text(&self, element: &ElementHandle, text: &str) -> AlumnusResult<()>;

    /// Press a non-text key on the element
    async fn press_key(&self, element: &ElementHandle, key: Key) -> AlumnusResult<()>;

    /// Capture the viewport as PNG bytes
    async fn screenshot(&self) -> AlumnusResult<Vec<u8>>;

    /// Whether the browser still answers commands
    async fn is_alive(&self) -> bool;

    /// Drop any cached element references
    async fn release_elements(&self) {}

    /// Close the browser
    async fn close(&self) -> AlumnusResult<()>;
}
