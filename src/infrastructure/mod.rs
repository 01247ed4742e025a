pub mod database;
pub mod entsoe;
pub mod memory;

pub use database::repositories::SeaOrmRepositoryProvider;
pub use database::{init_database, DatabaseConfig};
pub use entsoe::EntsoeHttpCollector;
pub use memory::InMemoryRepositoryProvider;
