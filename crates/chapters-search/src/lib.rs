//! Chapters Search: Open Library keyword search and cover URLs.
//!
//! Results are handed back to the caller as-is; nothing here touches the
//! local catalog.

pub mod error;
pub mod http;
pub mod isbn;
pub mod openlibrary;

pub use error::{Result, SearchError};
pub use isbn::Isbn;
pub use openlibrary::{CoverSize, OpenLibraryClient, SearchDoc, SearchResponse, TrendingWork};
