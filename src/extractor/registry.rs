use crate::extractor::http::HttpFetcher;
use crate::extractor::models::{Extraction, UrlReference};
use crate::extractor::native::{
    boy18tube, erome, redgifs, Boy18TubeExtractor, EromeExtractor, EromeProfileExtractor,
    RedGifsApi, RedGifsExtractor, RedGifsNicheExtractor, RedGifsSearchExtractor,
    RedGifsUserExtractor,
};
use crate::extractor::traits::Extractor;
use crate::utils::config::ExtractorSettings;
use crate::utils::error::{ExtractError, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Where each site is reached. Tests point these at a mock server.
#[derive(Debug, Clone)]
pub struct SiteEndpoints {
    pub redgifs_api: String,
    pub erome: String,
    pub boy18tube: String,
}

impl Default for SiteEndpoints {
    fn default() -> Self {
        Self {
            redgifs_api: redgifs::api::API_BASE.to_string(),
            erome: erome::BASE_URL.to_string(),
            boy18tube: boy18tube::BASE_URL.to_string(),
        }
    }
}

/// The Extractor Registry
///
/// Holds the available extractors in precedence order and routes each URL
/// to the first one whose `suitable(url)` accepts it. Single-item
/// extractors come before the collection extractors of the same site.
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create a registry from an explicit, ordered list
    pub fn new(extractors: Vec<Arc<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    /// Every supported site, reached at its public address
    pub fn with_defaults(settings: &ExtractorSettings) -> Result<Self> {
        Self::with_endpoints(settings, &SiteEndpoints::default())
    }

    /// Every supported site, reached at `endpoints`
    pub fn with_endpoints(settings: &ExtractorSettings, endpoints: &SiteEndpoints) -> Result<Self> {
        let http = HttpFetcher::new(settings)?;
        let api = RedGifsApi::with_base_url(
            http.clone(),
            settings.retry_policy(),
            &endpoints.redgifs_api,
        );

        let extractors: Vec<Arc<dyn Extractor>> = vec![
            Arc::new(RedGifsExtractor::new(api.clone())),
            Arc::new(RedGifsSearchExtractor::new(api.clone(), settings)),
            Arc::new(RedGifsUserExtractor::new(api.clone(), settings)),
            Arc::new(RedGifsNicheExtractor::new(api, settings)),
            Arc::new(EromeExtractor::with_base_url(http.clone(), &endpoints.erome)),
            Arc::new(EromeProfileExtractor::with_base_url(
                http.clone(),
                settings,
                &endpoints.erome,
            )),
            Arc::new(Boy18TubeExtractor::with_base_url(http, &endpoints.boy18tube)),
        ];
        Ok(Self::new(extractors))
    }

    pub fn extractors(&self) -> &[Arc<dyn Extractor>] {
        &self.extractors
    }

    /// Find the best extractor for a given URL
    pub fn find_extractor(&self, url: &str) -> Option<&Arc<dyn Extractor>> {
        let found = self.extractors.iter().find(|e| e.suitable(url));
        if let Some(extractor) = found {
            debug!("Routing to extractor: {}", extractor.id());
        }
        found
    }

    /// Extractor registered under `id`
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Extractor>> {
        self.extractors.iter().find(|e| e.id() == id)
    }

    /// Extract `url` with the first suitable extractor
    pub async fn extract(&self, url: &str) -> Result<Extraction> {
        let extractor = self
            .find_extractor(url)
            .ok_or_else(|| ExtractError::Unsupported(url.to_string()))?;
        info!("[{}] Extracting {}", extractor.id(), url);
        extractor.extract(url).await
    }

    /// Follow a URL entry of a playlist, preferring the extractor it names
    pub async fn resolve(&self, reference: &UrlReference) -> Result<Extraction> {
        match self.get(&reference.ie_key) {
            Some(extractor) if extractor.suitable(&reference.url) => {
                info!("[{}] Resolving {}", extractor.id(), reference.url);
                extractor.extract(&reference.url).await
            }
            _ => self.extract(&reference.url).await,
        }
    }
}
