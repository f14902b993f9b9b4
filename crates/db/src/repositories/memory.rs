use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use offerly_core::analysis::AnalysisType;
use offerly_core::program::ProgramId;

use super::{
    AnalysisRecord, AnalysisResultRepository, NewAnalysisRecord, NewOfferBatch, OfferRepository,
    OfferRow, OrderSource, RepositoryError,
};

/// In-memory order source keyed by program id.
#[derive(Default)]
pub struct InMemoryOrderSource {
    orders: RwLock<HashMap<i64, Vec<Value>>>,
}

impl InMemoryOrderSource {
    pub async fn push_orders(&self, program: ProgramId, blobs: Vec<Value>) {
        let mut orders = self.orders.write().await;
        orders.entry(program.0).or_default().extend(blobs);
    }
}

#[async_trait::async_trait]
impl OrderSource for InMemoryOrderSource {
    async fn fetch_raw_orders(&self, program: ProgramId) -> Result<Vec<Value>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&program.0).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryAnalysisResultRepository {
    records: RwLock<Vec<AnalysisRecord>>,
}

#[async_trait::async_trait]
impl AnalysisResultRepository for InMemoryAnalysisResultRepository {
    async fn save(&self, record: NewAnalysisRecord) -> Result<i64, RepositoryError> {
        let mut records = self.records.write().await;
        let id = records.len() as i64 + 1;
        records.push(AnalysisRecord {
            id,
            loyalty_program_id: record.loyalty_program_id,
            analysis_type: record.analysis_type,
            analysis_json: record.analysis_json,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get_latest(
        &self,
        program: ProgramId,
        analysis_type: AnalysisType,
    ) -> Result<Option<AnalysisRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| {
                record.loyalty_program_id == program && record.analysis_type == analysis_type
            })
            .max_by_key(|record| record.id)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryOfferRepository {
    rows: RwLock<Vec<OfferRow>>,
}

impl InMemoryOfferRepository {
    /// Every stored row for a program/template pair, in insert order.
    pub async fn rows_for(&self, program: ProgramId, template_id: i64) -> Vec<OfferRow> {
        let rows = self.rows.read().await;
        rows.iter()
            .filter(|row| row.loyalty_program_id == program && row.template_id == template_id)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl OfferRepository for InMemoryOfferRepository {
    async fn save_batch(&self, batch: NewOfferBatch) -> Result<Vec<i64>, RepositoryError> {
        let mut rows = self.rows.write().await;
        let mut ids = Vec::with_capacity(batch.goals.len());
        for goal in &batch.goals {
            let id = rows.len() as i64 + 1;
            rows.push(OfferRow {
                id,
                loyalty_program_id: batch.loyalty_program_id,
                template_id: batch.template_id,
                goal_id: goal.id(),
                goal_name: goal.name().to_string(),
                generation_ref: batch.generation_ref,
                offers: batch.offers.clone(),
                forecast: batch.forecast.clone(),
                created_at: Utc::now(),
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get_latest(
        &self,
        program: ProgramId,
        template_id: i64,
    ) -> Result<Option<OfferRow>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| row.loyalty_program_id == program && row.template_id == template_id)
            .max_by_key(|row| row.id)
            .cloned())
    }

    async fn update_forecast_for_latest(
        &self,
        program: ProgramId,
        template_id: i64,
        forecast: &Value,
    ) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.write().await;
        let target = rows
            .iter_mut()
            .filter(|row| row.loyalty_program_id == program && row.template_id == template_id)
            .max_by_key(|row| row.id);
        match target {
            Some(row) => {
                row.forecast = forecast.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
