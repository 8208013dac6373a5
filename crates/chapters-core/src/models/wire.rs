//! Raw snapshot records as served by the remote endpoints and the bundled
//! assets. Field names follow the wire format; [`crate::sync::normalize`]
//! maps them onto the store models.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CatalogError, Result};
use crate::models::Provenance;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(rename = "coverImage", default, deserialize_with = "null_as_empty")]
    pub cover_image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(rename = "profileImage", default, deserialize_with = "null_as_empty")]
    pub profile_image: String,
    #[serde(rename = "isPopular", default, deserialize_with = "null_as_default")]
    pub is_popular: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooksEnvelope {
    pub books: Vec<BookRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorsEnvelope {
    pub authors: Vec<AuthorRecord>,
}

pub fn parse_books(json: &str, origin: Provenance) -> Result<Vec<BookRecord>> {
    serde_json::from_str::<BooksEnvelope>(json)
        .map(|env| env.books)
        .map_err(|e| CatalogError::parse(origin, e))
}

pub fn parse_authors(json: &str, origin: Provenance) -> Result<Vec<AuthorRecord>> {
    serde_json::from_str::<AuthorsEnvelope>(json)
        .map(|env| env.authors)
        .map_err(|e| CatalogError::parse(origin, e))
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_books_envelope() {
        let json = r#"{"books":[{"id":1,"title":"Dune","author":"Frank Herbert",
            "category":"Science Fiction","description":"...","coverImage":"http://x/d.jpg"}]}"#;
        let books = parse_books(json, Provenance::Remote).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].cover_image, "http://x/d.jpg");
    }

    #[test]
    fn test_only_id_is_required() {
        let json = r#"{"books":[{"id":9,"title":null}]}"#;
        let books = parse_books(json, Provenance::Remote).unwrap();
        assert_eq!(books[0].id, 9);
        assert!(books[0].title.is_empty());
        assert!(books[0].cover_image.is_empty());
    }

    #[test]
    fn test_missing_id_is_parse_error() {
        let json = r#"{"books":[{"title":"No id"}]}"#;
        let err = parse_books(json, Provenance::Remote).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { origin: Provenance::Remote, .. }));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let json = r#"{"authors":[{"id":"one","name":"Dan Brown"}]}"#;
        let err = parse_authors(json, Provenance::Bundled).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { origin: Provenance::Bundled, .. }));
    }

    #[test]
    fn test_is_popular_defaults_false() {
        let json = r#"{"authors":[{"id":2,"name":"Ali Hazelwood","description":"",
            "profileImage":"asset://authors/alihazelwood.jpg"}]}"#;
        let authors = parse_authors(json, Provenance::Remote).unwrap();
        assert!(!authors[0].is_popular);
        assert_eq!(authors[0].profile_image, "asset://authors/alihazelwood.jpg");
    }
}
