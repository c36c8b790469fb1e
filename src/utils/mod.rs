//! Utility modules for error handling, configuration and page scraping

pub mod config;
pub mod error;
pub mod html;
pub mod parse;

// Re-export for convenience
pub use config::{ExtractorSettings, PagePolicy, RetryPolicy};
pub use error::{ExtractError, Result};
