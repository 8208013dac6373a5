pub mod changes;
pub mod database;
pub mod repositories;
pub mod store;
pub mod subscription;

pub use changes::ChangeBus;
pub use store::CatalogStore;
pub use subscription::Subscription;
