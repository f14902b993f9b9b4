pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with, DbPool, PoolSettings};
pub use repositories::{
    AnalysisRecord, AnalysisResultRepository, NewAnalysisRecord, NewOfferBatch, OfferRepository,
    OfferRow, OrderSource, RepositoryError,
};
