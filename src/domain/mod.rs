//! Core domain types and ports.
//!
//! - **area**: bidding-zone registry (EIC codes ↔ short names)
//! - **documents**: decoded ENTSO-E market documents (collector output)
//! - **collector**: upstream API port, one method per endpoint
//! - **repositories**: persistence ports for data points, progress, metrics

pub mod area;
pub mod collector;
pub mod documents;
pub mod repositories;

pub use area::AreaCode;
pub use collector::EntsoeCollector;
pub use documents::{
    DocumentType, DomainId, GlMarketDocument, LoadTimeSeries, PriceTimeSeries, ProcessType,
    PublicationMarketDocument, SeriesPeriod, SeriesPoint, TimeInterval,
};
pub use repositories::{
    BackfillProgressRepository, CollectionMetricsRepository, EnergyDataRepository,
    EnergyPriceRepository, PointKey, RepositoryProvider, SchedulerJobRepository,
};
