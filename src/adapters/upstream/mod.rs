//! Upstream schedule source: HTTP client and payload mapping.

pub mod http_fetcher;
pub mod mapper;

pub use http_fetcher::HttpFetcher;
