use crate::extractor::models::Extraction;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Core trait for all site extractors
///
/// An extractor owns one URL family of one site. The registry asks every
/// extractor in turn whether it is `suitable` and runs the first that is.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns a unique identifier for this extractor (e.g., "Erome", "RedGifsUser")
    fn id(&self) -> &'static str;

    /// Short human readable description
    fn description(&self) -> &'static str;

    /// Checks if this extractor can handle the given URL.
    ///
    /// Must be free of side effects.
    fn suitable(&self, url: &str) -> bool;

    /// Fetches the page(s) behind `url` and builds the normalized record
    async fn extract(&self, url: &str) -> Result<Extraction>;
}
