use serde::{Deserialize, Serialize};

/// A catalog author as stored in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub profile_image_url: String,

    #[serde(default)]
    pub is_popular: bool,
}

impl Author {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            profile_image_url: String::new(),
            is_popular: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthorFilter {
    #[default]
    All,
    Popular,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_new() {
        let author = Author::new(3, "Dan Brown");
        assert_eq!(author.name, "Dan Brown");
        assert!(!author.is_popular);
        assert!(author.profile_image_url.is_empty());
        assert_eq!(AuthorFilter::default(), AuthorFilter::All);
    }
}
