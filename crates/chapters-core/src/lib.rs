pub mod config;
pub mod connectivity;
pub mod error;
pub mod favorites;
pub mod models;
pub mod sources;
pub mod storage;
pub mod sync;

pub use config::{AppConfig, SearchConfig, StorageConfig, SyncConfig};
pub use error::{CatalogError, ExitCode, Result};
pub use models::*;

pub use connectivity::{ConnectivityProbe, FixedProbe, TcpProbe};
pub use favorites::FavoriteSet;
pub use sources::{BundledSource, CatalogSource, RemoteSource};
pub use storage::database::{ConnectionPool, SCHEMA_VERSION, open_database, open_in_memory};
pub use storage::{CatalogStore, Subscription};
pub use sync::{CatalogRepository, SyncReport};
