//! Page scraping: the listing extractor, the detail-page enricher and the
//! fetch/text helpers they share.

pub mod base;
pub mod detail;
pub mod listing;

pub use base::{HttpFetcher, PageFetcher};
