use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chapters_core::SearchConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SearchError};
use crate::http::RateLimitedClient;
use crate::isbn::Isbn;

const SEARCH_FIELDS: &str = "key,title,author_name,first_publish_year,isbn,cover_i,publisher,language,number_of_pages_median,subject,ratings_average";
const USER_AGENT: &str = concat!("chapters-search/", env!("CARGO_PKG_VERSION"));

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub docs: Vec<SearchDoc>,
}

/// One hit from `search.json`. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchDoc {
    pub key: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Vec<String>,
    pub first_publish_year: Option<i32>,
    #[serde(default)]
    pub isbn: Vec<String>,
    #[serde(rename = "cover_i")]
    pub cover_id: Option<i64>,
    #[serde(default)]
    pub publisher: Vec<String>,
    #[serde(default)]
    pub language: Vec<String>,
    #[serde(rename = "number_of_pages_median")]
    pub pages: Option<u32>,
    #[serde(default, rename = "subject")]
    pub subjects: Vec<String>,
    pub ratings_average: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub works: Vec<TrendingWork>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendingWork {
    pub key: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Vec<String>,
    /// The subjects endpoint nests names here instead of `author_name`.
    #[serde(default, skip_serializing)]
    authors: Vec<WorkAuthor>,
    pub cover_id: Option<i64>,
    pub first_publish_year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct WorkAuthor {
    name: String,
}

impl TrendingWork {
    pub fn author_names(&self) -> Vec<&str> {
        self.author_name.iter().map(String::as_str).collect()
    }

    /// Move nested author names into `author_name` so both endpoint shapes
    /// serialize the same way.
    fn flatten_authors(mut self) -> Self {
        if self.author_name.is_empty() {
            self.author_name = self.authors.drain(..).map(|a| a.name).collect();
        }
        self
    }
}

// ─── Cover sizes ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverSize {
    S,
    #[default]
    M,
    L,
}

impl fmt::Display for CoverSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
        })
    }
}

impl FromStr for CoverSize {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "S" => Ok(Self::S),
            "M" => Ok(Self::M),
            "L" => Ok(Self::L),
            _ => Err(SearchError::InvalidQuery(format!("unknown cover size: {s}"))),
        }
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Keyword search against Open Library. Results are returned to the caller
/// and never written to the local catalog.
pub struct OpenLibraryClient {
    client: RateLimitedClient,
    base_url: String,
    covers_base_url: String,
    default_limit: u32,
    cover_size: CoverSize,
}

impl OpenLibraryClient {
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let cover_size = config.cover_size.parse::<CoverSize>().unwrap_or_else(|e| {
            warn!(error = %e, "falling back to medium covers");
            CoverSize::M
        });
        Ok(Self {
            client: RateLimitedClient::new(
                Duration::from_millis(200),
                2,
                USER_AGENT,
                config.timeout(),
            )?,
            base_url: config.base_url.clone(),
            covers_base_url: config.covers_base_url.trim_end_matches('/').to_string(),
            default_limit: config.default_limit,
            cover_size,
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_tests(base_url: String) -> Self {
        Self {
            client: RateLimitedClient::new(
                Duration::from_millis(1),
                0,
                USER_AGENT,
                Duration::from_secs(5),
            )
            .expect("test client"),
            base_url,
            covers_base_url: "https://covers.openlibrary.org".to_string(),
            default_limit: 20,
            cover_size: CoverSize::M,
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Free-text search. `limit` of `None` uses the configured default.
    pub async fn search(&self, query: &str, limit: Option<u32>) -> Result<SearchResponse> {
        let query = non_empty(query, "search query")?;
        let limit = limit.unwrap_or(self.default_limit).to_string();
        let url = self.endpoint(
            &["search.json"],
            &[("q", query), ("limit", limit.as_str()), ("fields", SEARCH_FIELDS)],
        )?;
        self.fetch_search(url).await
    }

    pub async fn search_by_author(&self, author: &str, limit: Option<u32>) -> Result<SearchResponse> {
        let author = non_empty(author, "author name")?;
        let limit = limit.unwrap_or(self.default_limit).to_string();
        let url = self.endpoint(
            &["search.json"],
            &[("author", author), ("limit", limit.as_str()), ("fields", SEARCH_FIELDS)],
        )?;
        self.fetch_search(url).await
    }

    pub async fn search_by_isbn(&self, isbn: &str) -> Result<SearchResponse> {
        let isbn = Isbn::parse(isbn)?;
        let url = self.endpoint(
            &["search.json"],
            &[("isbn", isbn.isbn13.as_str()), ("fields", SEARCH_FIELDS)],
        )?;
        self.fetch_search(url).await
    }

    /// Works from the fiction subject listing.
    pub async fn trending(&self, limit: Option<u32>) -> Result<Vec<TrendingWork>> {
        let limit = limit.unwrap_or(self.default_limit).to_string();
        let url = self.endpoint(&["subjects", "fiction.json"], &[("limit", limit.as_str())])?;
        let resp: TrendingResponse = self.client.get_json(url.as_str()).await?;
        debug!(count = resp.works.len(), "trending works");
        Ok(resp.works.into_iter().map(TrendingWork::flatten_authors).collect())
    }

    /// `None` when the hit has no cover id.
    pub fn cover_url(&self, cover_id: Option<i64>, size: Option<CoverSize>) -> Option<String> {
        let size = size.unwrap_or(self.cover_size);
        cover_id.map(|id| format!("{}/b/id/{id}-{size}.jpg", self.covers_base_url))
    }

    pub fn cover_url_by_isbn(&self, isbn: &str, size: Option<CoverSize>) -> String {
        let size = size.unwrap_or(self.cover_size);
        format!("{}/b/isbn/{isbn}-{size}.jpg", self.covers_base_url)
    }

    async fn fetch_search(&self, url: Url) -> Result<SearchResponse> {
        let resp: SearchResponse = self.client.get_json(url.as_str()).await?;
        debug!(found = resp.num_found, returned = resp.docs.len(), "search complete");
        Ok(resp)
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = parse_base_url(&self.base_url)?;
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| SearchError::Parse("invalid Open Library base URL".to_string()))?;
            segs.pop_if_empty();
            segs.extend(segments);
        }
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }
}

fn non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SearchError::InvalidQuery(format!("{what} is empty")));
    }
    Ok(trimmed)
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    Url::parse(base_url).map_err(|e| SearchError::Parse(format!("invalid URL {base_url}: {e}")))
}
