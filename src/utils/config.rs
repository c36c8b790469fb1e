//! Extractor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
);

/// Default pause between paged API requests when none is configured
pub const DEFAULT_PAGE_SLEEP: Duration = Duration::from_millis(500);

/// Extractor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorSettings {
    /// User agent sent with every request
    pub user_agent: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Pause between listing pages (first page is never delayed).
    /// `None` means the default of half a second.
    pub sleep_interval_requests: Option<Duration>,

    /// Retry budget for rate-limited API calls
    pub extractor_retries: usize,

    /// Initial backoff after a 429, doubled on every further attempt
    pub retry_backoff: Duration,

    /// Upper bound for a single backoff sleep
    pub max_backoff: Duration,

    /// Yield listing page fetch errors instead of ending the listing quietly
    pub fatal_page_errors: bool,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            sleep_interval_requests: None,
            extractor_retries: 3,
            retry_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(16),
            fatal_page_errors: false,
        }
    }
}

impl ExtractorSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.extractor_retries,
            initial_backoff: self.retry_backoff,
            max_backoff: self.max_backoff,
        }
    }

    pub fn page_policy(&self) -> PagePolicy {
        PagePolicy {
            delay: self.sleep_interval_requests.unwrap_or(DEFAULT_PAGE_SLEEP),
            page_size: None,
            fatal_errors: self.fatal_page_errors,
        }
    }
}

/// Exponential backoff for rate-limited requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31) as u32).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Throttling and termination rules for paged listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    /// Pause before every page after the first
    pub delay: Duration,
    /// Known page size; a shorter page ends the listing
    pub page_size: Option<usize>,
    /// Whether a failed page is yielded as an error or silently ends the listing
    pub fatal_errors: bool,
}

impl PagePolicy {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }
}
