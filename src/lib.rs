//! # ENTSO-E Energy Data Service
//!
//! Continuously mirrors European electricity market data (load, load
//! forecasts, day-ahead prices) from the ENTSO-E Transparency Platform into
//! a TimescaleDB store, with gap-aware real-time collection, resumable
//! historical backfills, scheduled jobs, and self-monitoring.
//!
//! ## Architecture
//!
//! - **shared**: cross-cutting utilities (errors, clock, shutdown)
//! - **domain**: area registry, decoded market documents, repository and
//!   collector ports
//! - **application**: document transformers and the collection / backfill /
//!   scheduler / monitoring services
//! - **infrastructure**: SeaORM entities, migrations and repositories, the
//!   HTTP collector, an in-memory repository provider
//! - **config**: application configuration (TOML-based)

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

// Re-export commonly used types at crate root
pub use application::processing::{GlMarketDocumentProcessor, PublicationMarketDocumentProcessor};
pub use application::services::{
    BackfillService, CollectionResult, EntsoeDataService, MonitoringService, SchedulerService,
};
pub use config::{default_config_path, AppConfig};
pub use domain::{AreaCode, EntsoeCollector, RepositoryProvider};
pub use infrastructure::{
    init_database, DatabaseConfig, EntsoeHttpCollector, InMemoryRepositoryProvider,
    SeaOrmRepositoryProvider,
};
