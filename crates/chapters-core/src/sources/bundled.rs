use std::borrow::Cow;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::error;

use super::CatalogSource;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::models::wire::{parse_authors, parse_books};
use crate::models::{AuthorRecord, BookRecord, EntityKind, Provenance};

const EMBEDDED_BOOKS: &str = include_str!("../../assets/books.json");
const EMBEDDED_AUTHORS: &str = include_str!("../../assets/authors.json");

#[derive(Debug, Clone)]
enum AssetLocation {
    Embedded,
    Directory(PathBuf),
}

/// The snapshot shipped with the application. A read or parse failure here
/// is a packaging fault: it is logged and returned, never swallowed.
#[derive(Debug, Clone)]
pub struct BundledSource {
    location: AssetLocation,
}

impl BundledSource {
    pub fn embedded() -> Self {
        Self {
            location: AssetLocation::Embedded,
        }
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            location: AssetLocation::Directory(dir.into()),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        match &config.assets_dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::embedded(),
        }
    }

    async fn read(&self, kind: EntityKind) -> Result<Cow<'static, str>> {
        match &self.location {
            AssetLocation::Embedded => Ok(Cow::Borrowed(match kind {
                EntityKind::Books => EMBEDDED_BOOKS,
                EntityKind::Authors => EMBEDDED_AUTHORS,
            })),
            AssetLocation::Directory(dir) => {
                let path = dir.join(kind.asset_name());
                let text = tokio::fs::read_to_string(&path).await.inspect_err(|e| {
                    error!(path = %path.display(), error = %e, "bundled snapshot unreadable");
                })?;
                Ok(Cow::Owned(text))
            }
        }
    }
}

impl Default for BundledSource {
    fn default() -> Self {
        Self::embedded()
    }
}

#[async_trait]
impl CatalogSource for BundledSource {
    fn provenance(&self) -> Provenance {
        Provenance::Bundled
    }

    async fn fetch_books(&self) -> Result<Vec<BookRecord>> {
        let text = self.read(EntityKind::Books).await?;
        parse_books(&text, Provenance::Bundled).inspect_err(|e| {
            error!(kind = %EntityKind::Books, error = %e, "bundled snapshot is malformed");
        })
    }

    async fn fetch_authors(&self) -> Result<Vec<AuthorRecord>> {
        let text = self.read(EntityKind::Authors).await?;
        parse_authors(&text, Provenance::Bundled).inspect_err(|e| {
            error!(kind = %EntityKind::Authors, error = %e, "bundled snapshot is malformed");
        })
    }
}
