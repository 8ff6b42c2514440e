//! Interaction primitives: the click fallback chain and human-paced typing.

use crate::driver::{ElementHandle, Key, UiDriver};
use crate::result::AlumnusResult;
use crate::wait::settle;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// =============================================================================
// CLICKING
// =============================================================================

/// How a click was delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Native input-event click
    Native,
    /// Programmatic click after the native one failed
    Programmatic,
    /// Every strategy failed
    Failed(String),
}

impl ClickOutcome {
    /// Whether the click landed by any strategy
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ClickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Click strategies, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickStrategy {
    Native,
    Programmatic,
}

const CLICK_CHAIN: [ClickStrategy; 2] = [ClickStrategy::Native, ClickStrategy::Programmatic];

/// Scroll `element` to the viewport center, let it settle, then click it,
/// falling back to a programmatic click. Failures are logged and reported in
/// the outcome, never propagated.
pub async fn safe_click<D: UiDriver + ?Sized>(
    driver: &D,
    element: &ElementHandle,
    settle_for: Duration,
) -> ClickOutcome {
    if let Err(e) = driver.scroll_into_view(element).await {
        tracing::debug!(element = %element, error = %e, "scroll before click failed");
    }
    settle(settle_for).await;

    let mut last_error = String::from("no click strategy attempted");
    for strategy in CLICK_CHAIN {
        let attempt = match strategy {
            ClickStrategy::Native => driver.click(element).await,
            ClickStrategy::Programmatic => driver.js_click(element).await,
        };
        match attempt {
            Ok(()) => {
                return match strategy {
                    ClickStrategy::Native => ClickOutcome::Native,
                    ClickStrategy::Programmatic => {
                        tracing::debug!(element = %element, "clicked via script fallback");
                        ClickOutcome::Programmatic
                    }
                };
            }
            Err(e) => {
                tracing::warn!(element = %element, strategy = ?strategy, error = %e, "click failed");
                last_error = e.to_string();
            }
        }
    }
    ClickOutcome::Failed(last_error)
}

// =============================================================================
// TYPING
// =============================================================================

/// Per-keystroke delay range for human-paced typing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingProfile {
    /// Shortest pause between characters
    pub min_delay_ms: u64,
    /// Longest pause between characters
    pub max_delay_ms: u64,
    /// Texts longer than this many characters are typed faster
    pub long_text_threshold: usize,
    /// Delay multiplier applied to long texts
    pub long_text_factor: f64,
    /// Fixed RNG seed for reproducible cadence
    pub seed: Option<u64>,
}

impl Default for TypingProfile {
    fn default() -> Self {
        Self {
            min_delay_ms: 20,
            max_delay_ms: 80,
            long_text_threshold: 200,
            long_text_factor: 0.25,
            seed: None,
        }
    }
}

impl TypingProfile {
    /// No pauses at all
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
            long_text_threshold: 0,
            long_text_factor: 0.0,
            seed: Some(0),
        }
    }

    /// Set the delay range
    #[must_use]
    pub const fn with_delay_range(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_delay_ms = min_ms;
        self.max_delay_ms = max_ms;
        self
    }

    /// Set the RNG seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Delay before the next keystroke of a text of `len` characters
    fn next_delay(&self, rng: &mut StdRng, len: usize) -> Duration {
        let (low, high) = if self.min_delay_ms <= self.max_delay_ms {
            (self.min_delay_ms, self.max_delay_ms)
        } else {
            (self.max_delay_ms, self.min_delay_ms)
        };
        let mut ms = rng.random_range(low..=high) as f64;
        if len > self.long_text_threshold {
            ms *= self.long_text_factor.clamp(0.0, 1.0);
        }
        Duration::from_millis(ms.round() as u64)
    }
}

/// Type `text` one character at a time with randomized pauses.
///
/// Line breaks are entered as soft breaks so they never submit the form.
pub async fn human_type<D: UiDriver + ?Sized>(
    driver: &D,
    element: &ElementHandle,
    text: &str,
    profile: &TypingProfile,
) -> AlumnusResult<()> {
    let mut rng = profile.rng();
    let len = text.chars().count();
    let mut buf = [0_u8; 4];

    for ch in text.chars() {
        match ch {
            '\r' => continue,
            '\n' => driver.press_key(element, Key::LineBreak).await?,
            _ => driver.type_text(element, ch.encode_utf8(&mut buf)).await?,
        }
        settle(profile.next_delay(&mut rng, len)).await;
    }
    Ok(())
}

/// Type a space and delete it so the page re-validates the field content
pub async fn nudge<D: UiDriver + ?Sized>(driver: &D, element: &ElementHandle) -> AlumnusResult<()> {
    driver.type_text(element, " ").await?;
    driver.press_key(element, Key::Backspace).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{ClickBehavior, MockDriver, MockNode, MockPage};

    mod click_tests {
        use super::*;

        async fn click_with(behavior: ClickBehavior) -> (MockDriver, ClickOutcome) {
            let mut page = MockPage::new();
            let button = page.add(MockNode::new("button").with_click(behavior));
            let driver = MockDriver::with_page(page);
            let outcome = safe_click(&driver, &driver.handle(button), Duration::ZERO).await;
            (driver, outcome)
        }

        #[tokio::test]
        async fn test_native_click() {
            let (driver, outcome) = click_with(ClickBehavior::Accept).await;
            assert_eq!(outcome, ClickOutcome::Native);
            assert!(driver.was_called("scroll:"));
            assert!(!driver.was_called("js_click:"));
        }

        #[tokio::test]
        async fn test_intercepted_falls_back_to_script() {
            let (driver, outcome) = click_with(ClickBehavior::InterceptNative).await;
            assert_eq!(outcome, ClickOutcome::Programmatic);
            assert_eq!(driver.clicks(0), 1);
        }

        #[tokio::test]
        async fn test_total_failure_is_reported_not_raised() {
            let (_, outcome) = click_with(ClickBehavior::FailAlways).await;
            assert!(!outcome.is_success());
            assert!(outcome.to_string().starts_with("failed"));
        }

        #[tokio::test]
        async fn test_stale_element_fails_cleanly() {
            let (_, outcome) = click_with(ClickBehavior::Stale).await;
            assert!(matches!(outcome, ClickOutcome::Failed(reason) if reason.contains("Stale")));
        }
    }

    mod typing_tests {
        use super::*;

        #[tokio::test]
        async fn test_types_every_character() {
            let mut page = MockPage::new();
            let textbox = page.add(MockNode::new("div").editable());
            let driver = MockDriver::with_page(page);
            human_type(&driver, &driver.handle(textbox), "Merhaba Ayşe", &TypingProfile::instant())
                .await
                .unwrap();
            assert_eq!(driver.content(textbox), "Merhaba Ayşe");
        }

        #[tokio::test]
        async fn test_newlines_become_soft_breaks() {
            let mut page = MockPage::new();
            let textbox = page.add(MockNode::new("div").editable());
            let driver = MockDriver::with_page(page);
            human_type(&driver, &driver.handle(textbox), "a\r\nb", &TypingProfile::instant())
                .await
                .unwrap();
            assert_eq!(driver.content(textbox), "a\nb");
            assert!(driver.was_called("key:node-0-0:LineBreak"));
        }

        #[tokio::test]
        async fn test_nudge_leaves_content_unchanged() {
            let mut page = MockPage::new();
            let textbox = page.add(MockNode::new("div").editable().with_content("hi"));
            let driver = MockDriver::with_page(page);
            nudge(&driver, &driver.handle(textbox)).await.unwrap();
            assert_eq!(driver.content(textbox), "hi");
        }

        #[test]
        fn test_delay_within_range() {
            let profile = TypingProfile::default().with_seed(7);
            let mut rng = profile.rng();
            for _ in 0..100 {
                let delay = profile.next_delay(&mut rng, 10);
                assert!((20..=80).contains(&(delay.as_millis() as u64)));
            }
        }

        #[test]
        fn test_long_text_is_faster() {
            let profile = TypingProfile::default().with_seed(7);
            let mut rng = profile.rng();
            for _ in 0..100 {
                assert!(profile.next_delay(&mut rng, 1_000) <= Duration::from_millis(20));
            }
        }

        #[test]
        fn test_inverted_range_is_tolerated() {
            let profile = TypingProfile::default().with_delay_range(50, 10).with_seed(1);
            let mut rng = profile.rng();
            let delay = profile.next_delay(&mut rng, 1);
            assert!((10..=50).contains(&(delay.as_millis() as u64)));
        }
    }
}
