use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::CatalogSource;
use crate::config::SyncConfig;
use crate::error::{CatalogError, Result};
use crate::models::wire::{parse_authors, parse_books};
use crate::models::{AuthorRecord, BookRecord, Provenance};

/// Fetches snapshots from the configured JSON endpoints. One GET per call,
/// bounded by the client timeout.
pub struct RemoteSource {
    client: reqwest::Client,
    books_url: String,
    authors_url: String,
}

impl RemoteSource {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        Self::with_urls(&config.books_url, &config.authors_url, config.timeout())
    }

    pub fn with_urls(
        books_url: impl Into<String>,
        authors_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chapters/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| CatalogError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            books_url: books_url.into(),
            authors_url: authors_url.into(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!(url, "fetching remote snapshot");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Network(format!(
                "GET {url} returned HTTP {}",
                status.as_u16()
            )));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl CatalogSource for RemoteSource {
    fn provenance(&self) -> Provenance {
        Provenance::Remote
    }

    async fn fetch_books(&self) -> Result<Vec<BookRecord>> {
        let body = self.get_text(&self.books_url).await?;
        parse_books(&body, Provenance::Remote)
    }

    async fn fetch_authors(&self) -> Result<Vec<AuthorRecord>> {
        let body = self.get_text(&self.authors_url).await?;
        parse_authors(&body, Provenance::Remote)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;

    use super::*;

    fn source(base: &str) -> RemoteSource {
        RemoteSource::with_urls(
            format!("{base}/books.json"),
            format!("{base}/authors.json"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_books_ok() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/books.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"books":[{"id":1,"title":"Dune","author":"Frank Herbert",
                "category":"Science Fiction","description":"...","coverImage":"http://x/d.jpg"}]}"#,
            )
            .create_async()
            .await;

        let books = source(&server.url()).fetch_books().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune");
    }

    #[tokio::test]
    async fn test_fetch_authors_ok() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/authors.json")
            .with_status(200)
            .with_body(r#"{"authors":[{"id":3,"name":"Dan Brown","description":"",
                "profileImage":"http://x/db.jpg","isPopular":true}]}"#)
            .create_async()
            .await;

        let authors = source(&server.url()).fetch_authors().await.unwrap();
        assert!(authors[0].is_popular);
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/books.json")
            .with_status(503)
            .create_async()
            .await;

        let err = source(&server.url()).fetch_books().await.unwrap_err();
        assert!(matches!(err, CatalogError::Network(ref msg) if msg.contains("503")));
        assert!(err.triggers_fallback());
    }

    #[tokio::test]
    async fn test_malformed_body_is_remote_parse_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/books.json")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = source(&server.url()).fetch_books().await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse { origin: Provenance::Remote, .. }));
        assert!(err.triggers_fallback());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let src = RemoteSource::with_urls(
            "http://127.0.0.1:9/books.json",
            "http://127.0.0.1:9/authors.json",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = src.fetch_books().await.unwrap_err();
        assert!(matches!(err, CatalogError::Network(_)));
    }
}
