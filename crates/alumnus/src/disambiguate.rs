//! Picks the conversation overlay that belongs to the target.
//!
//! Several overlays can be open at once. The composer is chosen by, in
//! order: a header that contains the target's name, the element holding
//! input focus, and finally the first visible text box on the page. The
//! last path is a guess and is logged as such.

use crate::driver::{ElementHandle, UiDriver};
use crate::locator::{LocatorTable, Role};
use crate::resolver::{ElementResolver, Resolution, ResolutionFailure};
use crate::result::{AlumnusError, AlumnusResult};
use serde::Serialize;
use std::fmt;

/// How sure we are that the composer belongs to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// Overlay header contains the target's name
    NameMatch,
    /// Element holding input focus
    Focused,
    /// First visible text box on the page
    Positional,
}

impl fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameMatch => write!(f, "name_match"),
            Self::Focused => write!(f, "focused"),
            Self::Positional => write!(f, "positional"),
        }
    }
}

/// The chosen text-entry control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    /// Text-entry control
    pub textbox: ElementHandle,
    /// Overlay containing it, when known
    pub panel: Option<ElementHandle>,
    /// How it was chosen
    pub confidence: MatchConfidence,
}

/// Result of disambiguation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disambiguation {
    /// A composer was chosen
    Chosen(Composer),
    /// No usable text box anywhere
    Unresolved(ResolutionFailure),
}

#[derive(Debug)]
pub struct Disambiguator<'a, D: UiDriver + ?Sized> {
    driver: &'a D,
    table: &'a LocatorTable,
}

impl<'a, D: UiDriver + ?Sized> Disambiguator<'a, D> {
    #[must_use]
    pub const fn new(driver: &'a D, table: &'a LocatorTable) -> Self {
        Self { driver, table }
    }

    /// Choose the composer for `display_name`
    pub async fn select(&self, display_name: Option<&str>) -> AlumnusResult<Disambiguation> {
        let resolver = ElementResolver::new(self.driver, self.table);

        for name in name_candidates(display_name) {
            if let Some(composer) = self.by_name(&resolver, &name).await? {
                tracing::info!(name = %name, textbox = %composer.textbox, "composer matched by name");
                return Ok(Disambiguation::Chosen(composer));
            }
            tracing::debug!(name = %name, "no overlay header names the target");
        }

        if let Some(composer) = self.by_focus().await? {
            tracing::info!(textbox = %composer.textbox, "composer taken from focus");
            return Ok(Disambiguation::Chosen(composer));
        }

        match resolver.probe(Role::TextBox, None, false).await? {
            Resolution::Found(textbox) => {
                let panel = self.enclosing_panel(&textbox).await?;
                tracing::warn!(
                    textbox = %textbox,
                    confidence = %MatchConfidence::Positional,
                    "composer chosen by position, low confidence"
                );
                Ok(Disambiguation::Chosen(Composer {
                    textbox,
                    panel,
                    confidence: MatchConfidence::Positional,
                }))
            }
            other => {
                let failure = other.failure().unwrap_or(ResolutionFailure::Absent);
                tracing::warn!(%failure, "no text box to write into");
                Ok(Disambiguation::Unresolved(failure))
            }
        }
    }

    async fn by_name(&self, resolver: &ElementResolver<'_, D>, name: &str) -> AlumnusResult<Option<Composer>> {
        let needle = fold(name);
        for panel in resolver.resolve_all_visible(Role::ConversationPanel).await? {
            let title = match self.header_text(&panel).await {
                Ok(title) => title,
                Err(e) if e.is_stale() => continue,
                Err(e) => return Err(e),
            };
            if !fold(&title).contains(&needle) {
                continue;
            }
            if let Some(textbox) = resolver.resolve_within(&panel, Role::TextBox, false).await? {
                return Ok(Some(Composer {
                    textbox,
                    panel: Some(panel),
                    confidence: MatchConfidence::NameMatch,
                }));
            }
            tracing::debug!(panel = %panel, "named overlay has no visible text box");
        }
        Ok(None)
    }

    /// Header text of a panel; the whole panel text when it has no header
    async fn header_text(&self, panel: &ElementHandle) -> AlumnusResult<String> {
        for selector in self.table.get(Role::PanelHeader) {
            let headers = self.driver.find_within(panel, selector).await?;
            let mut joined = String::new();
            for header in headers {
                match self.driver.text(&header).await {
                    Ok(text) => {
                        joined.push_str(&text);
                        joined.push(' ');
                    }
                    Err(e) if e.is_stale() => {}
                    Err(e) => return Err(e),
                }
            }
            if !joined.trim().is_empty() {
                return Ok(joined);
            }
        }
        self.driver.text(panel).await
    }

    async fn by_focus(&self) -> AlumnusResult<Option<Composer>> {
        let Some(focused) = self.driver.focused_element().await? else {
            return Ok(None);
        };
        let usable = async {
            Ok::<bool, AlumnusError>(
                self.driver.is_editable(&focused).await? && self.driver.is_displayed(&focused).await?,
            )
        };
        match usable.await {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(e) if e.is_stale() => return Ok(None),
            Err(e) => return Err(e),
        }
        let panel = self.enclosing_panel(&focused).await?;
        Ok(Some(Composer {
            textbox: focused,
            panel,
            confidence: MatchConfidence::Focused,
        }))
    }

    async fn enclosing_panel(&self, element: &ElementHandle) -> AlumnusResult<Option<ElementHandle>> {
        for selector in self.table.get(Role::ConversationPanel) {
            if selector.is_xpath() {
                continue;
            }
            match self.driver.closest(element, selector).await {
                Ok(Some(panel)) => return Ok(Some(panel)),
                Ok(None) => {}
                Err(e) if e.is_stale() => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

/// Names to look for in overlay headers: the full name, then its first token
fn name_candidates(display_name: Option<&str>) -> Vec<String> {
    let Some(full) = display_name.map(fold).filter(|n| !n.is_empty()) else {
        return Vec::new();
    };
    let first = full.split(' ').next().map(str::to_string);
    let mut names = vec![full];
    if let Some(first) = first.filter(|f| *f != names[0]) {
        names.push(first);
    }
    names
}

/// Lowercase with whitespace runs collapsed to one space
fn fold(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MockNode, MockPage, NodeId};
    use proptest::prelude::*;

    fn table() -> LocatorTable {
        LocatorTable::new()
            .with_role(Role::ConversationPanel, ["div.panel"])
            .with_role(Role::PanelHeader, ["h2"])
            .with_role(Role::TextBox, ["div.box"])
    }

    /// Adds an overlay and returns (panel, textbox)
    fn overlay(page: &mut MockPage, title: &str) -> (NodeId, NodeId) {
        let panel = page.add(MockNode::new("div").matching("div.panel"));
        let _ = page.add(MockNode::new("h2").child_of(panel).with_text(title));
        let textbox = page.add(MockNode::new("div").matching("div.box").child_of(panel).editable());
        (panel, textbox)
    }

    async fn select(driver: &MockDriver, name: Option<&str>) -> Disambiguation {
        let table = table();
        Disambiguator::new(driver, &table).select(name).await.unwrap()
    }

    mod policy_tests {
        use super::*;

        #[tokio::test]
        async fn test_name_match_beats_position() {
            let mut page = MockPage::new();
            let _ = overlay(&mut page, "Mehmet Demir");
            let (panel, textbox) = overlay(&mut page, "Ayşe Yılmaz");
            let driver = MockDriver::with_page(page);

            let Disambiguation::Chosen(composer) = select(&driver, Some("ayşe")).await else {
                panic!("expected a composer");
            };
            assert_eq!(composer.confidence, MatchConfidence::NameMatch);
            assert_eq!(composer.textbox.id, driver.handle(textbox).id);
            assert_eq!(composer.panel.unwrap().id, driver.handle(panel).id);
        }

        #[tokio::test]
        async fn test_full_name_beats_shared_first_name() {
            let mut page = MockPage::new();
            let _ = overlay(&mut page, "Ayşe Demir");
            let (panel, textbox) = overlay(&mut page, "Ayşe  Yılmaz");
            let driver = MockDriver::with_page(page);

            let Disambiguation::Chosen(composer) = select(&driver, Some("Ayşe Yılmaz")).await else {
                panic!("expected a composer");
            };
            assert_eq!(composer.confidence, MatchConfidence::NameMatch);
            assert_eq!(composer.textbox.id, driver.handle(textbox).id);
            assert_eq!(composer.panel.unwrap().id, driver.handle(panel).id);
        }

        #[tokio::test]
        async fn test_first_name_used_when_header_is_short() {
            let mut page = MockPage::new();
            let _ = overlay(&mut page, "Mehmet Demir");
            let (_, textbox) = overlay(&mut page, "Ayşe");
            let driver = MockDriver::with_page(page);

            let Disambiguation::Chosen(composer) = select(&driver, Some("Ayşe Nur Yılmaz")).await else {
                panic!("expected a composer");
            };
            assert_eq!(composer.confidence, MatchConfidence::NameMatch);
            assert_eq!(composer.textbox.id, driver.handle(textbox).id);
        }

        #[test]
        fn test_name_candidates() {
            assert_eq!(name_candidates(Some(" Ayşe  Yılmaz ")), vec!["ayşe yılmaz", "ayşe"]);
            assert_eq!(name_candidates(Some("Ayşe")), vec!["ayşe"]);
            assert!(name_candidates(Some("  ")).is_empty());
            assert!(name_candidates(None).is_empty());
        }

        #[tokio::test]
        async fn test_focus_used_when_name_unknown() {
            let mut page = MockPage::new();
            let _ = overlay(&mut page, "Mehmet Demir");
            let (_, textbox) = overlay(&mut page, "Ayşe Yılmaz");
            let driver = MockDriver::with_page(page);
            driver.set_focus(Some(textbox));

            let Disambiguation::Chosen(composer) = select(&driver, None).await else {
                panic!("expected a composer");
            };
            assert_eq!(composer.confidence, MatchConfidence::Focused);
            assert_eq!(composer.textbox.id, driver.handle(textbox).id);
        }

        #[tokio::test]
        async fn test_focused_non_editable_is_ignored() {
            let mut page = MockPage::new();
            let (first_panel, first_box) = overlay(&mut page, "Mehmet Demir");
            let driver = MockDriver::with_page(page);
            driver.set_focus(Some(first_panel));

            let Disambiguation::Chosen(composer) = select(&driver, Some("Zeynep")).await else {
                panic!("expected a composer");
            };
            assert_eq!(composer.confidence, MatchConfidence::Positional);
            assert_eq!(composer.textbox.id, driver.handle(first_box).id);
        }

        #[tokio::test]
        async fn test_positional_fallback_takes_first_visible() {
            let mut page = MockPage::new();
            let (hidden_panel, _) = overlay(&mut page, "Eski Sohbet");
            page.nodes[hidden_panel].visible = false;
            let (_, textbox) = overlay(&mut page, "Mehmet Demir");
            let driver = MockDriver::with_page(page);

            let Disambiguation::Chosen(composer) = select(&driver, None).await else {
                panic!("expected a composer");
            };
            assert_eq!(composer.confidence, MatchConfidence::Positional);
            assert_eq!(composer.textbox.id, driver.handle(textbox).id);
        }

        #[tokio::test]
        async fn test_no_textbox_reports_absent() {
            let driver = MockDriver::new();
            assert_eq!(
                select(&driver, Some("Ayşe")).await,
                Disambiguation::Unresolved(ResolutionFailure::Absent)
            );
        }

        #[tokio::test]
        async fn test_hidden_textbox_reports_not_interactable() {
            let mut page = MockPage::new();
            let (_, textbox) = overlay(&mut page, "Ayşe");
            page.nodes[textbox].visible = false;
            let driver = MockDriver::with_page(page);
            assert_eq!(
                select(&driver, Some("Ayşe")).await,
                Disambiguation::Unresolved(ResolutionFailure::NotInteractable)
            );
        }
    }

    mod property_tests {
        use super::*;

        proptest! {
            #[test]
            fn prop_name_match_finds_target_among_n(count in 1_usize..6, target_seed in any::<prop::sample::Index>()) {
                let target = target_seed.index(count);
                let mut page = MockPage::new();
                let mut boxes = Vec::new();
                for i in 0..count {
                    let (_, textbox) = overlay(&mut page, &format!("Kişi{i} Soyad"));
                    boxes.push(textbox);
                }
                let driver = MockDriver::with_page(page);
                let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
                let name = format!("kişi{target} soyad");
                let chosen = runtime.block_on(select(&driver, Some(&name)));
                match chosen {
                    Disambiguation::Chosen(composer) => {
                        prop_assert_eq!(composer.confidence, MatchConfidence::NameMatch);
                        prop_assert_eq!(composer.textbox.id, driver.handle(boxes[target]).id);
                    }
                    Disambiguation::Unresolved(failure) => prop_assert!(false, "unresolved: {}", failure),
                }
            }
        }
    }
}
