//! Role-keyed locator table.
//!
//! The target UI has no stable markup, so every control the workflow needs is
//! described by a semantic [`Role`] and an ordered list of alternative
//! [`Selector`]s. Earlier entries are more specific and are tried first.
//! Adding a fallback locator is a data change: append it to the role's list
//! (or supply it through configuration) and the resolver picks it up.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "div[role='textbox']")
    Css(String),
    /// XPath selector (absolute or relative to a scope element)
    XPath(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::XPath(selector.into())
    }

    /// Classify a raw locator expression.
    ///
    /// Expressions starting with `/`, `./` or `(` are XPath, everything else
    /// is CSS.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('/') || trimmed.starts_with("./") || trimmed.starts_with('(') {
            Self::XPath(trimmed.to_string())
        } else {
            Self::Css(trimmed.to_string())
        }
    }

    /// The raw expression
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) => s,
        }
    }

    /// Whether this is an XPath expression
    #[must_use]
    pub const fn is_xpath(&self) -> bool {
        matches!(self, Self::XPath(_))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Selector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Semantic category of a UI control, independent of its markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Heading holding the profile owner's name
    ProfileHeading,
    /// Primary "send message" entry point on a profile
    MessageButton,
    /// "Connect" / "invite" control shown to non-connections
    ConnectButton,
    /// Overflow menu that may hide the message or connect entries
    MoreActions,
    /// Dismiss control of a modal pop-up or consent dialog
    PopupDismiss,
    /// Close control of a conversation overlay
    ChatClose,
    /// A conversation overlay
    ConversationPanel,
    /// Header/title element inside a conversation overlay
    PanelHeader,
    /// Message text-entry control
    TextBox,
    /// Form enclosing a text-entry control
    ComposeForm,
    /// Submit ("send") control
    SubmitButton,
}

impl Role {
    /// All roles in declaration order
    pub const ALL: [Self; 11] = [
        Self::ProfileHeading,
        Self::MessageButton,
        Self::ConnectButton,
        Self::MoreActions,
        Self::PopupDismiss,
        Self::ChatClose,
        Self::ConversationPanel,
        Self::PanelHeader,
        Self::TextBox,
        Self::ComposeForm,
        Self::SubmitButton,
    ];

    /// Stable name used in logs and configuration
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProfileHeading => "profile_heading",
            Self::MessageButton => "message_button",
            Self::ConnectButton => "connect_button",
            Self::MoreActions => "more_actions",
            Self::PopupDismiss => "popup_dismiss",
            Self::ChatClose => "chat_close",
            Self::ConversationPanel => "conversation_panel",
            Self::PanelHeader => "panel_header",
            Self::TextBox => "text_box",
            Self::ComposeForm => "compose_form",
            Self::SubmitButton => "submit_button",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered locator alternatives per role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorTable {
    entries: BTreeMap<Role, Vec<Selector>>,
}

impl LocatorTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the locators for a role, replacing existing ones
    #[must_use]
    pub fn with_role<I, S>(mut self, role: Role, locators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(role, locators);
        self
    }

    /// Set the locators for a role, replacing existing ones
    pub fn set<I, S>(&mut self, role: Role, locators: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = locators
            .into_iter()
            .map(|s| Selector::parse(s.as_ref()))
            .collect();
        let _ = self.entries.insert(role, list);
    }

    /// Locators for a role in priority order (empty if unknown)
    #[must_use]
    pub fn get(&self, role: Role) -> &[Selector] {
        self.entries.get(&role).map_or(&[], Vec::as_slice)
    }

    /// Roles that have at least one locator
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.entries
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(role, _)| *role)
    }

    /// Merge overrides into this table.
    ///
    /// With `replace` the override list becomes the role's list; otherwise the
    /// override entries are placed ahead of the existing ones, skipping
    /// duplicates.
    pub fn merge(&mut self, overrides: &Self, replace: bool) {
        for (role, extra) in &overrides.entries {
            let slot = self.entries.entry(*role).or_default();
            if replace {
                slot.clone_from(extra);
                continue;
            }
            let mut merged: Vec<Selector> = extra.clone();
            for existing in slot.drain(..) {
                if !merged.contains(&existing) {
                    merged.push(existing);
                }
            }
            *slot = merged;
        }
    }

    /// Built-in locators for the professional network's web UI.
    ///
    /// Turkish and English UI labels are both covered.
    #[must_use]
    pub fn linkedin() -> Self {
        Self::new()
            .with_role(
                Role::ProfileHeading,
                [
                    "//h1[contains(@class, 'text-heading-xlarge')]",
                    "//div[contains(@class, 'ph5')]//h1",
                    "//h1",
                ],
            )
            .with_role(
                Role::MessageButton,
                [
                    "//main//button[contains(@class, 'message-anywhere-button')]",
                    "//main//button[.//span[text()='Mesaj gönder']]",
                    "//main//button[.//span[text()='Mesaj']]",
                    "//main//button[.//span[text()='Message']]",
                    "//div[contains(@class, 'artdeco-dropdown__content')]//div[@role='button'][.//span[text()='Mesaj']]",
                    "//div[contains(@class, 'artdeco-dropdown__content')]//div[@role='button'][.//span[text()='Message']]",
                    "//main//button[contains(., 'Mesaj')]",
                ],
            )
            .with_role(
                Role::ConnectButton,
                [
                    "//main//button[contains(@aria-label, 'Invite')]",
                    "//main//button[contains(@aria-label, 'davet')]",
                    "//main//button[.//span[text()='Bağlantı kur']]",
                    "//main//button[.//span[text()='Connect']]",
                    "//div[contains(@class, 'artdeco-dropdown__content')]//div[@role='button'][.//span[text()='Bağlantı kur']]",
                    "//div[contains(@class, 'artdeco-dropdown__content')]//div[@role='button'][.//span[text()='Connect']]",
                ],
            )
            .with_role(
                Role::MoreActions,
                [
                    "//main//button[contains(@aria-label, 'More actions')]",
                    "//main//button[contains(@aria-label, 'Diğer işlemler')]",
                    "//main//button[.//span[text()='Diğer']]",
                    "//main//button[.//span[text()='More']]",
                ],
            )
            .with_role(
                Role::PopupDismiss,
                [
                    "//button[@aria-label='Dismiss']",
                    "//button[@aria-label='Kapat']",
                    "//button[contains(@class, 'artdeco-modal__dismiss')]",
                    "//button[@aria-label='Close']",
                    "//svg[@data-test-icon='close-medium']/ancestor::button",
                ],
            )
            .with_role(
                Role::ChatClose,
                [
                    "//button[contains(@class, 'msg-overlay-bubble-header__control--close-btn')]",
                    "//svg[@data-test-icon='close-small']/ancestor::button",
                    "//header[contains(@class, 'msg-overlay-bubble-header')]//button[last()]",
                ],
            )
            .with_role(
                Role::ConversationPanel,
                [
                    "div.msg-overlay-conversation-bubble",
                    "div.msg-convo-wrapper",
                ],
            )
            .with_role(
                Role::PanelHeader,
                [
                    "h2",
                    "header.msg-overlay-bubble-header",
                ],
            )
            .with_role(
                Role::TextBox,
                [
                    "div.msg-form__contenteditable[role='textbox']",
                    "div[role='textbox']",
                ],
            )
            .with_role(Role::ComposeForm, ["form"])
            .with_role(
                Role::SubmitButton,
                [
                    "button[type='submit']",
                    "button.msg-form__send-button",
                ],
            )
    }
}
