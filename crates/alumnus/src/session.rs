//! The interaction session: sole owner of the browser for one run.

use crate::cleanup::SurfaceCleaner;
use crate::dispatch::{DispatchReport, DispatchTarget, MessageDispatcher};
use crate::driver::UiDriver;
use crate::interaction::TypingProfile;
use crate::locator::LocatorTable;
use crate::result::AlumnusResult;
use crate::wait::{settle, Timings};
use std::time::Duration;

/// Pause after opening the login check page
const LOGIN_SETTLE: Duration = Duration::from_secs(3);

/// One browser, one control flow.
///
/// Connectivity is probed live on every call to [`Session::is_connected`];
/// it is never cached.
#[derive(Debug)]
pub struct Session<D: UiDriver> {
    driver: D,
    locators: LocatorTable,
    timings: Timings,
    typing: TypingProfile,
    login_settle: Duration,
}

impl<D: UiDriver> Session<D> {
    /// Wrap an already running driver
    #[must_use]
    pub fn new(driver: D, locators: LocatorTable) -> Self {
        Self {
            driver,
            locators,
            timings: Timings::default(),
            typing: TypingProfile::default(),
            login_settle: LOGIN_SETTLE,
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
    pub const fn with_login_settle(mut self, settle_for: Duration) -> Self {
        self.login_settle = settle_for;
        self
    }

    pub const fn driver(&self) -> &D {
        &self.driver
    }

    pub const fn locators(&self) -> &LocatorTable {
        &self.locators
    }

    pub const fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Whether the browser still answers
    pub async fn is_connected(&self) -> bool {
        self.driver.is_alive().await
    }

    /// Open `feed_url` and report whether the site kept us there rather
    /// than redirecting to a login page.
    pub async fn is_logged_in(&self, feed_url: &str) -> AlumnusResult<bool> {
        self.driver.navigate(feed_url).await?;
        settle(self.login_settle).await;
        let url = self.driver.current_url().await?;
        let logged_in = !url.to_lowercase().contains("login");
        tracing::info!(%url, logged_in, "login check");
        Ok(logged_in)
    }

    /// Run one dispatch attempt
    pub async fn dispatch(&self, target: &DispatchTarget) -> DispatchReport {
        MessageDispatcher::new(&self.driver, &self.locators)
            .with_timings(self.timings)
            .with_typing(self.typing.clone())
            .dispatch(target)
            .await
    }

    /// Close every overlay and pop-up on the current page
    pub async fn cleanup(&self) -> AlumnusResult<crate::cleanup::CleanupReport> {
        SurfaceCleaner::new(&self.driver, &self.locators)
            .with_click_settle(self.timings.click_settle())
            .cleanup_surface()
            .await
    }

    /// PNG of the current page
    pub async fn screenshot(&self) -> AlumnusResult<Vec<u8>> {
        self.driver.screenshot().await
    }

    /// Shut the browser down
    pub async fn close(self) -> AlumnusResult<()> {
        tracing::info!("closing browser session");
        self.driver.close().await
    }
}

#[cfg(feature = "browser")]
impl Session<crate::browser::ChromiumDriver> {
    /// Launch Chromium and wrap it in a session
    ///
    /// # Errors
    ///
    /// Returns error if browser cannot be launched
    pub async fn launch(config: crate::browser::BrowserConfig, locators: LocatorTable) -> AlumnusResult<Self> {
        let driver = crate::browser::ChromiumDriver::launch(config).await?;
        Ok(Self::new(driver, locators))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MockPage};

    fn session(driver: MockDriver) -> Session<MockDriver> {
        Session::new(driver, LocatorTable::linkedin())
            .with_timings(Timings::instant())
            .with_typing(TypingProfile::instant())
            .with_login_settle(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_logged_in_when_feed_stays() {
        let driver = MockDriver::new();
        driver.add_page("https://www.linkedin.com/feed/", MockPage::new());
        let session = session(driver);
        assert!(session.is_logged_in("https://www.linkedin.com/feed/").await.unwrap());
    }

    #[tokio::test]
    async fn test_login_redirect_means_logged_out() {
        let driver = MockDriver::new();
        driver.redirect(
            "https://www.linkedin.com/feed/",
            "https://www.linkedin.com/login?session_redirect=feed",
        );
        let session = session(driver);
        assert!(!session.is_logged_in("https://www.linkedin.com/feed/").await.unwrap());
    }

    #[tokio::test]
    async fn test_connected_flag_is_live() {
        let session = session(MockDriver::new());
        assert!(session.is_connected().await);
        session.driver().set_alive(false);
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn test_close_consumes_session() {
        let session = session(MockDriver::new());
        session.close().await.unwrap();
    }
}
