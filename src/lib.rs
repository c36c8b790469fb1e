//! Siteloader library

pub mod extractor;
pub mod utils;

// Re-export main types for easier use
pub use extractor::{
    Entries, Entry, Extraction, Extractor, ExtractorRegistry, Format, MediaItem, Playlist,
    SiteEndpoints, UrlReference,
};
pub use utils::{ExtractError, ExtractorSettings};
