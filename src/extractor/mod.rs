pub mod fallback;
pub mod http;
pub mod models;
pub mod native;
pub mod paging;
pub mod registry;
pub mod traits;

pub use http::HttpFetcher;
pub use models::{Entries, Entry, Extraction, Format, MediaItem, Playlist, UrlReference};
pub use registry::{ExtractorRegistry, SiteEndpoints};
pub use traits::Extractor;
