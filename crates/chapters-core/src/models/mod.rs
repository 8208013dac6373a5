pub mod author;
pub mod book;
pub mod kind;
pub mod wire;

pub use author::*;
pub use book::*;
pub use kind::*;
pub use wire::{AuthorRecord, BookRecord};
