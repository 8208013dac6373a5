use crate::models::{Author, AuthorRecord, Book, BookRecord};

impl From<BookRecord> for Book {
    fn from(r: BookRecord) -> Self {
        Self {
            id: r.id,
            title: r.title,
            author: r.author,
            category: r.category,
            description: r.description,
            cover_image_url: r.cover_image,
            is_favorite: false,
        }
    }
}

impl From<AuthorRecord> for Author {
    fn from(r: AuthorRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            profile_image_url: r.profile_image,
            is_popular: r.is_popular,
        }
    }
}

pub fn normalize_books(records: Vec<BookRecord>) -> Vec<Book> {
    records.into_iter().map(Book::from).collect()
}

pub fn normalize_authors(records: Vec<AuthorRecord>) -> Vec<Author> {
    records.into_iter().map(Author::from).collect()
}
