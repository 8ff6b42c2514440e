//! Surface cleanup: close conversation overlays and dismiss pop-ups.

use crate::driver::UiDriver;
use crate::interaction::safe_click;
use crate::locator::{LocatorTable, Role};
use crate::resolver::ElementResolver;
use crate::result::AlumnusResult;
use crate::wait::settle;
use std::time::Duration;

/// Default pass cap
pub const DEFAULT_MAX_PASSES: u32 = 5;

/// Roles swept on every pass, in order
const SWEPT_ROLES: [Role; 2] = [Role::ChatClose, Role::PopupDismiss];

/// What a cleanup run did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupReport {
    /// Passes run, including the final empty one
    pub passes: u32,
    /// Controls clicked successfully
    pub closed: u32,
    /// The pass cap was reached while controls were still showing
    pub exhausted: bool,
}

/// Closes every visible chat-close and popup-dismiss control, repeatedly,
/// until a pass finds nothing or the pass cap is hit.
#[derive(Debug)]
pub struct SurfaceCleaner<'a, D: UiDriver + ?Sized> {
    driver: &'a D,
    table: &'a LocatorTable,
    max_passes: u32,
    click_settle: Duration,
}

impl<'a, D: UiDriver + ?Sized> SurfaceCleaner<'a, D> {
    #[must_use]
    pub const fn new(driver: &'a D, table: &'a LocatorTable) -> Self {
        Self {
            driver,
            table,
            max_passes: DEFAULT_MAX_PASSES,
            click_settle: Duration::ZERO,
        }
    }

    /// Set the pass cap
    #[must_use]
    pub const fn with_max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Set the pause after each click
    #[must_use]
    pub const fn with_click_settle(mut self, settle_for: Duration) -> Self {
        self.click_settle = settle_for;
        self
    }

    pub async fn cleanup_surface(&self) -> AlumnusResult<CleanupReport> {
        let resolver = ElementResolver::new(self.driver, self.table);
        let mut report = CleanupReport::default();

        while report.passes < self.max_passes {
            report.passes += 1;
            let mut seen = 0;

            for role in SWEPT_ROLES {
                for control in resolver.resolve_all_visible(role).await? {
                    seen += 1;
                    let outcome = safe_click(self.driver, &control, Duration::ZERO).await;
                    if outcome.is_success() {
                        report.closed += 1;
                        settle(self.click_settle).await;
                    } else {
                        tracing::debug!(role = %role, control = %control, %outcome, "close control did not respond");
                    }
                }
            }

            if seen == 0 {
                tracing::debug!(passes = report.passes, closed = report.closed, "surface clean");
                return Ok(report);
            }
        }

        report.exhausted = true;
        tracing::warn!(
            passes = report.passes,
            closed = report.closed,
            "cleanup pass cap reached with controls still visible"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{ClickBehavior, Effect, MockDriver, MockNode, MockPage};
    use crate::locator::Selector;

    fn table() -> LocatorTable {
        LocatorTable::new()
            .with_role(Role::ChatClose, ["button.chat-close"])
            .with_role(Role::PopupDismiss, ["button.dismiss"])
            .with_role(Role::ConversationPanel, ["div.panel"])
    }

    fn page_with_overlays(count: usize) -> MockPage {
        let mut page = MockPage::new();
        for _ in 0..count {
            let panel = page.add(MockNode::new("div").matching("div.panel"));
            let _ = page.add(
                MockNode::new("button")
                    .matching("button.chat-close")
                    .child_of(panel)
                    .on_click(Effect::Detach(panel)),
            );
        }
        page
    }

    #[tokio::test]
    async fn test_nothing_to_clean() {
        let driver = MockDriver::new();
        let table = table();
        let report = SurfaceCleaner::new(&driver, &table).cleanup_surface().await.unwrap();
        assert_eq!(
            report,
            CleanupReport {
                passes: 1,
                closed: 0,
                exhausted: false
            }
        );
    }

    #[tokio::test]
    async fn test_closes_every_overlay_and_popup() {
        let mut page = page_with_overlays(3);
        let modal = page.add(MockNode::new("div"));
        let _ = page.add(
            MockNode::new("button")
                .matching("button.dismiss")
                .child_of(modal)
                .on_click(Effect::Detach(modal)),
        );
        let driver = MockDriver::with_page(page);
        let table = table();
        let report = SurfaceCleaner::new(&driver, &table).cleanup_surface().await.unwrap();
        assert_eq!(report.closed, 4);
        assert_eq!(report.passes, 2);
        assert_eq!(driver.visible_count(&Selector::css("div.panel")), 0);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let driver = MockDriver::with_page(page_with_overlays(2));
        let table = table();
        let cleaner = SurfaceCleaner::new(&driver, &table);
        let first = cleaner.cleanup_surface().await.unwrap();
        let second = cleaner.cleanup_surface().await.unwrap();
        assert_eq!(first.closed, 2);
        assert_eq!(second.closed, 0);
        assert_eq!(driver.visible_count(&Selector::css("div.panel")), 0);
    }

    #[tokio::test]
    async fn test_terminates_when_controls_keep_reappearing() {
        let mut page = MockPage::new();
        let _ = page.add(MockNode::new("button").matching("button.dismiss"));
        let driver = MockDriver::with_page(page);
        let table = table();
        let report = SurfaceCleaner::new(&driver, &table)
            .with_max_passes(3)
            .cleanup_surface()
            .await
            .unwrap();
        assert!(report.exhausted);
        assert_eq!(report.passes, 3);
        assert_eq!(report.closed, 3);
    }

    #[tokio::test]
    async fn test_unclickable_control_does_not_abort() {
        let mut page = page_with_overlays(1);
        let _ = page.add(
            MockNode::new("button")
                .matching("button.dismiss")
                .with_click(ClickBehavior::FailAlways),
        );
        let driver = MockDriver::with_page(page);
        let table = table();
        let report = SurfaceCleaner::new(&driver, &table)
            .with_max_passes(2)
            .cleanup_surface()
            .await
            .unwrap();
        assert!(report.exhausted);
        assert_eq!(report.closed, 1);
        assert_eq!(driver.visible_count(&Selector::css("div.panel")), 0);
    }
}
