//! End-to-end dispatch scenarios against the in-memory driver.
//!
//! Each page is scripted with the same locator strings the LinkedIn table
//! ships with, so these runs exercise the real resolver, cleanup and
//! disambiguation paths.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use alumnus::mock::{ClickBehavior, Effect, MockDriver, MockNode, MockPage, NodeId};
use alumnus::{
    AlumnusError, AlumnusResult, DispatchOutcome, DispatchReport, DispatchState, DispatchTarget,
    ElementHandle, FailureReason, Key, LocatorTable, MatchConfidence, MessageDispatcher,
    ResolutionFailure, Selector, Timings, TypingProfile, UiDriver,
};
use async_trait::async_trait;

const PROFILE: &str = "https://www.linkedin.com/in/ayse-yilmaz";
const MESSAGE: &str = "Merhaba Ayşe, nasılsın?\nSevgiler";

const MESSAGE_BUTTON: &str = "//main//button[contains(@class, 'message-anywhere-button')]";
const CONNECT_BUTTON: &str = "//main//button[contains(@aria-label, 'Invite')]";
const MORE_ACTIONS: &str = "//main//button[contains(@aria-label, 'More actions')]";
const DROPDOWN_MESSAGE: &str =
    "//div[contains(@class, 'artdeco-dropdown__content')]//div[@role='button'][.//span[text()='Mesaj']]";
const CHAT_CLOSE: &str = "//button[contains(@class, 'msg-overlay-bubble-header__control--close-btn')]";
const PROFILE_HEADING: &str = "//h1[contains(@class, 'text-heading-xlarge')]";
const PANEL: &str = "div.msg-overlay-conversation-bubble";
const TEXTBOX: &str = "div.msg-form__contenteditable[role='textbox']";
const SUBMIT: &str = "button[type='submit']";

/// Node ids of one scripted conversation overlay
struct Overlay {
    panel: NodeId,
    textbox: NodeId,
    submit: NodeId,
}

/// Add a hidden overlay titled `title` with a close control, a text box and
/// a submit button that enables on input.
fn add_overlay(page: &mut MockPage, title: &str) -> Overlay {
    let panel = page.add(MockNode::new("div").matching(PANEL).hidden());
    let _ = page.add(MockNode::new("h2").child_of(panel).with_text(title));
    let close = page.add(MockNode::new("button").matching(CHAT_CLOSE).child_of(panel));
    let form = page.add(MockNode::new("form").child_of(panel));
    let textbox = page.add(MockNode::new("div").matching(TEXTBOX).child_of(form).editable());
    let submit = page.add(MockNode::new("button").matching(SUBMIT).child_of(form).disabled());
    page.nodes[close].on_click.push(Effect::Hide(panel));
    page.nodes[textbox].on_input.push(Effect::Enable(submit));
    Overlay { panel, textbox, submit }
}

/// A message button that opens every overlay in `opens`
fn add_message_button(page: &mut MockPage, opens: &[NodeId]) -> NodeId {
    let button = page.add(MockNode::new("button").matching(MESSAGE_BUTTON));
    for &panel in opens {
        page.nodes[button].on_click.push(Effect::Show(panel));
    }
    button
}

fn driver_with(page: MockPage) -> MockDriver {
    let driver = MockDriver::new();
    driver.add_page(PROFILE, page);
    driver
}

async fn dispatch<D: UiDriver>(driver: &D, target: &DispatchTarget) -> DispatchReport {
    let table = LocatorTable::linkedin();
    MessageDispatcher::new(driver, &table)
        .with_timings(Timings::instant())
        .with_typing(TypingProfile::instant())
        .dispatch(target)
        .await
}

fn target() -> DispatchTarget {
    DispatchTarget::new(PROFILE, MESSAGE).with_display_name("Ayşe Yılmaz")
}

fn assert_single_terminal(report: &DispatchReport) {
    let terminals: Vec<_> = report.trail.iter().filter(|s| s.is_terminal()).collect();
    assert_eq!(terminals, vec![&report.outcome.state()]);
    assert_eq!(report.trail.last(), Some(&report.outcome.state()));
}

/// Delegates to a [`MockDriver`] until `trigger` has been clicked, then every
/// page query fails like a dropped CDP connection.
struct FailsAfterClick {
    inner: MockDriver,
    trigger: NodeId,
}

impl FailsAfterClick {
    fn tripped(&self) -> bool {
        self.inner.clicks(self.trigger) > 0
    }
}

#[async_trait]
impl UiDriver for FailsAfterClick {
    async fn navigate(&self, url: &str) -> AlumnusResult<()> {
        self.inner.navigate(url).await
    }

    async fn current_url(&self) -> AlumnusResult<String> {
        self.inner.current_url().await
    }

    async fn find_all(&self, selector: &Selector) -> AlumnusResult<Vec<ElementHandle>> {
        if self.tripped() {
            return Err(AlumnusError::driver("connection reset"));
        }
        self.inner.find_all(selector).await
    }

    async fn find_within(&self, scope: &ElementHandle, selector: &Selector) -> AlumnusResult<Vec<ElementHandle>> {
        if self.tripped() {
            return Err(AlumnusError::driver("connection reset"));
        }
        self.inner.find_within(scope, selector).await
    }

    async fn closest(&self, element: &ElementHandle, selector: &Selector) -> AlumnusResult<Option<ElementHandle>> {
        self.inner.closest(element, selector).await
    }

    async fn focused_element(&self) -> AlumnusResult<Option<ElementHandle>> {
        self.inner.focused_element().await
    }

    async fn is_displayed(&self, element: &ElementHandle) -> AlumnusResult<bool> {
        self.inner.is_displayed(element).await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> AlumnusResult<bool> {
        self.inner.is_enabled(element).await
    }

    async fn is_editable(&self, element: &ElementHandle) -> AlumnusResult<bool> {
        self.inner.is_editable(element).await
    }

    async fn text(&self, element: &ElementHandle) -> AlumnusResult<String> {
        self.inner.text(element).await
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> AlumnusResult<()> {
        self.inner.scroll_into_view(element).await
    }

    async fn click(&self, element: &ElementHandle) -> AlumnusResult<()> {
        self.inner.click(element).await
    }

    async fn js_click(&self, element: &ElementHandle) -> AlumnusResult<()> {
        self.inner.js_click(element).await
    }

    async fn clear(&self, element: &ElementHandle) -> AlumnusResult<()> {
        self.inner.clear(element).await
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> AlumnusResult<()> {
        self.inner.type_text(element, text).await
    }

    async fn press_key(&self, element: &ElementHandle, key: Key) -> AlumnusResult<()> {
        self.inner.press_key(element, key).await
    }

    async fn screenshot(&self) -> AlumnusResult<Vec<u8>> {
        self.inner.screenshot().await
    }

    async fn is_alive(&self) -> bool {
        self.inner.is_alive().await
    }

    async fn release_elements(&self) {
        self.inner.release_elements().await;
    }

    async fn close(&self) -> AlumnusResult<()> {
        self.inner.close().await
    }
}

mod scenario_a_sent {
    use super::*;

    #[tokio::test]
    async fn test_message_sent_and_overlays_closed() {
        let mut page = MockPage::new();
        let overlay = add_overlay(&mut page, "Ayşe Yılmaz");
        let _ = add_message_button(&mut page, &[overlay.panel]);
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert_eq!(report.reason, None);
        assert_eq!(report.confidence, Some(MatchConfidence::NameMatch));
        assert_eq!(driver.content(overlay.textbox), MESSAGE);
        assert_eq!(driver.clicks(overlay.submit), 1);
        assert_eq!(driver.visible_count(&Selector::css(PANEL)), 0);
        assert!(report.trail.ends_with(&[DispatchState::Verifying, DispatchState::Sent]));
        assert_single_terminal(&report);
        assert_eq!(report.notes(), "sent");
    }

    #[tokio::test]
    async fn test_engine_error_after_submit_still_sent() {
        let mut page = MockPage::new();
        let overlay = add_overlay(&mut page, "Ayşe Yılmaz");
        let _ = add_message_button(&mut page, &[overlay.panel]);
        let driver = FailsAfterClick {
            inner: driver_with(page),
            trigger: overlay.submit,
        };

        let report = dispatch(&driver, &target()).await;

        assert_eq!(driver.inner.clicks(overlay.submit), 1);
        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert_eq!(report.reason, None);
        assert!(report.trail.ends_with(&[DispatchState::Verifying, DispatchState::Sent]));
        assert_single_terminal(&report);
    }

    #[tokio::test]
    async fn test_profile_heading_supplies_the_name() {
        let mut page = MockPage::new();
        let _ = page.add(
            MockNode::new("h1")
                .matching(PROFILE_HEADING)
                .with_text("Ayşe Nur Yılmaz"),
        );
        let other = add_overlay(&mut page, "Mehmet Demir");
        let wanted = add_overlay(&mut page, "Ayşe Nur Yılmaz");
        let _ = add_message_button(&mut page, &[other.panel, wanted.panel]);
        let driver = driver_with(page);

        let report = dispatch(&driver, &DispatchTarget::new(PROFILE, MESSAGE)).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert_eq!(report.target_name.as_deref(), Some("Ayşe Nur Yılmaz"));
        assert_eq!(driver.content(wanted.textbox), MESSAGE);
        assert_eq!(driver.content(other.textbox), "");
        assert_eq!(driver.clicks(other.submit), 0);
    }

    #[tokio::test]
    async fn test_intercepted_click_falls_back_to_script_click() {
        let mut page = MockPage::new();
        let overlay = add_overlay(&mut page, "Ayşe Yılmaz");
        let button = add_message_button(&mut page, &[overlay.panel]);
        page.nodes[button].click = ClickBehavior::InterceptNative;
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert!(report.fallback_clicks >= 1);
        assert!(driver.was_called("js_click:"));
    }

    #[tokio::test]
    async fn test_message_button_behind_overflow_menu() {
        let mut page = MockPage::new();
        let overlay = add_overlay(&mut page, "Ayşe Yılmaz");
        let more = page.add(MockNode::new("button").matching(MORE_ACTIONS));
        let item = page.add(MockNode::new("div").matching(DROPDOWN_MESSAGE).hidden());
        page.nodes[more].on_click.push(Effect::Show(item));
        page.nodes[item].on_click.push(Effect::Show(overlay.panel));
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert!(report.used_overflow);
        assert_eq!(driver.clicks(more), 1);
        assert_eq!(driver.content(overlay.textbox), MESSAGE);
    }

    #[tokio::test]
    async fn test_stale_overlays_closed_before_navigation() {
        let mut page = MockPage::new();
        let overlay = add_overlay(&mut page, "Ayşe Yılmaz");
        let _ = add_message_button(&mut page, &[overlay.panel]);
        let driver = driver_with(page);

        let mut leftovers = MockPage::new();
        let old = add_overlay(&mut leftovers, "Eski Sohbet");
        leftovers.nodes[old.panel].visible = true;
        driver.add_page("https://www.linkedin.com/feed/", leftovers);
        alumnus::UiDriver::navigate(&driver, "https://www.linkedin.com/feed/")
            .await
            .unwrap();
        assert_eq!(driver.visible_count(&Selector::css(PANEL)), 1);
        let old_close = driver.handle(old.panel + 2);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert_eq!(report.trail.get(1), Some(&DispatchState::Cleaning));
        let history = driver.history();
        let closed = history
            .iter()
            .position(|c| *c == format!("click:{}", old_close.id))
            .expect("leftover overlay closed");
        let navigated = history
            .iter()
            .position(|c| *c == format!("navigate:{PROFILE}"))
            .expect("profile opened");
        assert!(closed < navigated);
    }
}

mod scenario_b_connection_needed {
    use super::*;

    #[tokio::test]
    async fn test_connect_only_profile() {
        let mut page = MockPage::new();
        let _ = page.add(MockNode::new("button").matching(CONNECT_BUTTON));
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::ConnectionNeeded);
        assert_eq!(report.reason, None);
        assert!(!report.used_overflow);
        assert_single_terminal(&report);
        assert_eq!(report.notes(), "connection_needed");
    }

    #[tokio::test]
    async fn test_overflow_menu_without_message_item() {
        let mut page = MockPage::new();
        let _ = page.add(MockNode::new("button").matching(CONNECT_BUTTON).hidden());
        let more = page.add(MockNode::new("button").matching(MORE_ACTIONS));
        let connect_item = page.add(
            MockNode::new("div")
                .matching("//div[contains(@class, 'artdeco-dropdown__content')]//div[@role='button'][.//span[text()='Connect']]")
                .hidden(),
        );
        page.nodes[more].on_click.push(Effect::Show(connect_item));
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::ConnectionNeeded);
        assert!(report.used_overflow);
    }

    #[tokio::test]
    async fn test_no_entry_point_at_all_is_error() {
        let driver = driver_with(MockPage::new());

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Error);
        assert_eq!(report.reason, Some(FailureReason::EntryPointMissing));
        assert_single_terminal(&report);
    }
}

mod scenario_c_no_textbox {
    use super::*;

    #[tokio::test]
    async fn test_textbox_never_appears() {
        let mut page = MockPage::new();
        let panel = page.add(MockNode::new("div").matching(PANEL).hidden());
        let _ = page.add(MockNode::new("h2").child_of(panel).with_text("Ayşe Yılmaz"));
        let _ = add_message_button(&mut page, &[panel]);
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Error);
        assert_eq!(report.reason, Some(FailureReason::TextBox(ResolutionFailure::Absent)));
        assert_eq!(report.notes(), "text box absent");
        assert!(!driver.was_called("clear:"));
    }

    #[tokio::test]
    async fn test_textbox_present_but_not_interactable() {
        let mut page = MockPage::new();
        let overlay = add_overlay(&mut page, "Ayşe Yılmaz");
        page.nodes[overlay.textbox].visible = false;
        let _ = add_message_button(&mut page, &[overlay.panel]);
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Error);
        assert_eq!(
            report.reason,
            Some(FailureReason::TextBox(ResolutionFailure::NotInteractable))
        );
        assert_eq!(report.notes(), "text box present but not interactable");
        assert_eq!(driver.content(overlay.textbox), "");
    }

    #[tokio::test]
    async fn test_disabled_submit_is_never_clicked() {
        let mut page = MockPage::new();
        let overlay = add_overlay(&mut page, "Ayşe Yılmaz");
        page.nodes[overlay.textbox].on_input.clear();
        let _ = add_message_button(&mut page, &[overlay.panel]);
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Error);
        assert_eq!(
            report.reason,
            Some(FailureReason::SubmitButton(ResolutionFailure::NotInteractable))
        );
        assert_eq!(driver.clicks(overlay.submit), 0);
        assert_eq!(driver.visible_count(&Selector::css(PANEL)), 0);
    }

    #[tokio::test]
    async fn test_navigation_failure() {
        let driver = MockDriver::new();
        driver.fail_navigation(PROFILE);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Error);
        assert!(matches!(report.reason, Some(FailureReason::Navigation(_))));
    }
}

mod scenario_d_positional_fallback {
    use super::*;

    #[tokio::test]
    async fn test_first_visible_textbox_used_with_low_confidence() {
        let mut page = MockPage::new();
        let first = add_overlay(&mut page, "Zeynep Kaya");
        let second = add_overlay(&mut page, "Can Öztürk");
        let third = add_overlay(&mut page, "Elif Şahin");
        let _ = add_message_button(&mut page, &[first.panel, second.panel, third.panel]);
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert_eq!(report.confidence, Some(MatchConfidence::Positional));
        assert_eq!(report.notes(), "sent (positional match)");
        assert_eq!(driver.content(first.textbox), MESSAGE);
        assert_eq!(driver.content(second.textbox), "");
        assert_eq!(driver.content(third.textbox), "");
        assert_eq!(driver.clicks(first.submit), 1);
    }

    #[tokio::test]
    async fn test_name_match_wins_over_position() {
        let mut page = MockPage::new();
        let first = add_overlay(&mut page, "Zeynep Kaya");
        let second = add_overlay(&mut page, "Ayşe Yılmaz");
        let third = add_overlay(&mut page, "Elif Şahin");
        let _ = add_message_button(&mut page, &[first.panel, second.panel, third.panel]);
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert_eq!(report.confidence, Some(MatchConfidence::NameMatch));
        assert_eq!(driver.content(first.textbox), "");
        assert_eq!(driver.content(second.textbox), MESSAGE);
        assert_eq!(driver.clicks(third.submit), 0);
    }
    #[tokio::test]
    async fn test_full_name_wins_over_namesake() {
        let mut page = MockPage::new();
        let namesake = add_overlay(&mut page, "Ayşe Demir");
        let wanted = add_overlay(&mut page, "Ayşe Yılmaz");
        let _ = add_message_button(&mut page, &[namesake.panel, wanted.panel]);
        let driver = driver_with(page);

        let report = dispatch(&driver, &target()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert_eq!(report.confidence, Some(MatchConfidence::NameMatch));
        assert_eq!(driver.content(namesake.textbox), "");
        assert_eq!(driver.content(wanted.textbox), MESSAGE);
        assert_eq!(driver.clicks(namesake.submit), 0);
    }
}
