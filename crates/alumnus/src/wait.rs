//! Bounded waiting.
//!
//! Every wait in the dispatch workflow is a poll with a deadline. Fixed
//! sleeps exist only as [`settle`] for animations and page settling.

use crate::result::AlumnusResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default wait budget for element polling (8 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 8_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a wait operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Whether the condition held before the deadline
    pub success: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the condition was evaluated
    pub attempts: u32,
}

// =============================================================================
// WAITING
// =============================================================================

/// Poll `condition` until it holds or the timeout elapses.
///
/// The condition is evaluated at least once, even with a zero timeout.
/// Errors from the condition propagate immediately.
pub async fn bounded_wait<F, Fut>(options: WaitOptions, mut condition: F) -> AlumnusResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AlumnusResult<bool>>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts = 0;

    loop {
        attempts += 1;
        if condition().await? {
            return Ok(WaitResult {
                success: true,
                elapsed: start.elapsed(),
                attempts,
            });
        }
        if start.elapsed() >= timeout {
            return Ok(WaitResult {
                success: false,
                elapsed: start.elapsed(),
                attempts,
            });
        }
        tokio::time::sleep(options.poll_interval().min(timeout.saturating_sub(start.elapsed())))
            .await;
    }
}

/// Poll a lookup until `done` accepts its value or the timeout elapses,
/// returning the last value seen.
pub async fn poll_until<T, F, Fut, P>(options: WaitOptions, mut lookup: F, done: P) -> AlumnusResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AlumnusResult<T>>,
    P: Fn(&T) -> bool,
{
    let start = Instant::now();
    let timeout = options.timeout();

    loop {
        let value = lookup().await?;
        if done(&value) || start.elapsed() >= timeout {
            return Ok(value);
        }
        tokio::time::sleep(options.poll_interval().min(timeout.saturating_sub(start.elapsed())))
            .await;
    }
}

/// Fixed pause for animations and page settling
pub async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

// =============================================================================
// TIMINGS
// =============================================================================

/// Settle and wait budgets used by the dispatch workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Pause after a profile page loads
    pub page_settle_ms: u64,
    /// Pause after clicking the message entry point
    pub conversation_open_ms: u64,
    /// Pause between scrolling an element into view and clicking it
    pub click_settle_ms: u64,
    /// Pause after submitting before the closing cleanup
    pub send_settle_ms: u64,
    /// Budget for polling an element into existence
    pub wait_budget_ms: u64,
    /// Interval between polls
    pub poll_interval_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            page_settle_ms: 5_000,
            conversation_open_ms: 3_000,
            click_settle_ms: 300,
            send_settle_ms: 2_000,
            wait_budget_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Timings {
    /// Zero settles and a single poll; for tests against the mock driver
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            page_settle_ms: 0,
            conversation_open_ms: 0,
            click_settle_ms: 0,
            send_settle_ms: 0,
            wait_budget_ms: 0,
            poll_interval_ms: 1,
        }
    }

    /// Wait options for element polling
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.wait_budget_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    #[must_use]
    pub const fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    #[must_use]
    pub const fn conversation_open(&self) -> Duration {
        Duration::from_millis(self.conversation_open_ms)
    }

    #[must_use]
    pub const fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }

    #[must_use]
    pub const fn send_settle(&self) -> Duration {
        Duration::from_millis(self.send_settle_ms)
    }
}
