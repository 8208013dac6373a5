use serde::{Deserialize, Serialize};

/// A catalog book as stored in the local cache.
///
/// `author` is a display name, not a key: an author's books are found by
/// exact string equality with [`Author::name`](super::Author::name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub category: String,
    pub description: String,
    pub cover_image_url: String,

    #[serde(default)]
    pub is_favorite: bool,
}

impl Book {
    pub fn new(
        id: i64,
        title: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            category: category.into(),
            description: String::new(),
            cover_image_url: String::new(),
            is_favorite: false,
        }
    }
}

/// Predicates a book query can be narrowed by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BookFilter {
    #[default]
    All,
    Favorites,
    Category(String),
    Author(String),
}

impl std::fmt::Display for BookFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Favorites => write!(f, "favorites"),
            Self::Category(c) => write!(f, "category={c}"),
            Self::Author(a) => write!(f, "author={a}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_new_defaults() {
        let book = Book::new(7, "Dune", "Frank Herbert", "Science Fiction");
        assert!(!book.is_favorite);
        assert!(book.description.is_empty());
        assert!(book.cover_image_url.is_empty());
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(BookFilter::default().to_string(), "all");
        assert_eq!(BookFilter::Category("Mystery".into()).to_string(), "category=Mystery");
    }
}
