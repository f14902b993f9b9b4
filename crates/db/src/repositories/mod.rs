use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use offerly_core::analysis::AnalysisType;
use offerly_core::program::ProgramId;
use offerly_core::templates::Goal;

pub mod analysis;
pub mod memory;
pub mod offer;
pub mod orders;

pub use analysis::SqlAnalysisResultRepository;
pub use memory::{InMemoryAnalysisResultRepository, InMemoryOfferRepository, InMemoryOrderSource};
pub use offer::SqlOfferRepository;
pub use orders::SqlOrderSource;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A persisted analysis document for one (program, analysis type).
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRecord {
    pub id: i64,
    pub loyalty_program_id: ProgramId,
    pub analysis_type: AnalysisType,
    pub analysis_json: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewAnalysisRecord {
    pub loyalty_program_id: ProgramId,
    pub analysis_type: AnalysisType,
    pub analysis_json: Value,
}

/// One persisted offer suggestion row. A generation pass writes one row per
/// goal the template serves; rows from the same pass share `generation_ref`.
#[derive(Clone, Debug, PartialEq)]
pub struct OfferRow {
    pub id: i64,
    pub loyalty_program_id: ProgramId,
    pub template_id: i64,
    pub goal_id: i64,
    pub goal_name: String,
    pub generation_ref: Uuid,
    pub offers: Value,
    pub forecast: Value,
    pub created_at: DateTime<Utc>,
}

/// A full generation batch for one template, fanned out over its goals.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOfferBatch {
    pub loyalty_program_id: ProgramId,
    pub template_id: i64,
    pub goals: Vec<Goal>,
    pub generation_ref: Uuid,
    pub offers: Value,
    pub forecast: Value,
}

/// Source of raw POS order blobs for a loyalty program.
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn fetch_raw_orders(&self, program: ProgramId) -> Result<Vec<Value>, RepositoryError>;
}

#[async_trait]
pub trait AnalysisResultRepository: Send + Sync {
    /// Persists a new analysis document, returning its row id.
    async fn save(&self, record: NewAnalysisRecord) -> Result<i64, RepositoryError>;

    /// Most recent document for a (program, analysis type), if any.
    async fn get_latest(
        &self,
        program: ProgramId,
        analysis_type: AnalysisType,
    ) -> Result<Option<AnalysisRecord>, RepositoryError>;
}

#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Persists one row per goal in the batch, returning the new row ids in
    /// goal order.
    async fn save_batch(&self, batch: NewOfferBatch) -> Result<Vec<i64>, RepositoryError>;

    /// Most recent suggestion row for a (program, template), if any.
    async fn get_latest(
        &self,
        program: ProgramId,
        template_id: i64,
    ) -> Result<Option<OfferRow>, RepositoryError>;

    /// Replaces the forecast on the single most recent suggestion row for a
    /// (program, template). Returns the number of rows updated (0 or 1).
    async fn update_forecast_for_latest(
        &self,
        program: ProgramId,
        template_id: i64,
        forecast: &Value,
    ) -> Result<u64, RepositoryError>;
}
