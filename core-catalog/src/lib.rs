//! # Catalog Module
//!
//! Everything the session needs to list clips:
//! - The catalog data model ([`SoundItem`], [`Page`], [`CatalogQuery`])
//! - The [`CatalogService`] seam with HTTP and in-memory implementations
//! - [`CatalogFetcher`], which stamps every fetch with a sequence number so
//!   late replies can be told apart from the latest one

pub mod error;
pub mod fetcher;
pub mod http;
pub mod model;
pub mod service;

pub use error::{CatalogError, Result};
pub use fetcher::{CatalogFetcher, FetchOutcome, FetchTicket};
pub use http::HttpCatalogService;
pub use model::{append_unique, page_count_for, CatalogQuery, ItemKey, Page, SoundId, SoundItem};
pub use service::{CatalogService, InMemoryCatalog};
