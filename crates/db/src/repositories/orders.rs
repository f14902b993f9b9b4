use serde_json::Value;
use sqlx::Row;

use offerly_core::program::ProgramId;

use super::{OrderSource, RepositoryError};
use crate::DbPool;

pub struct SqlOrderSource {
    pool: DbPool,
}

impl SqlOrderSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderSource for SqlOrderSource {
    async fn fetch_raw_orders(&self, program: ProgramId) -> Result<Vec<Value>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT pos_raw_data
             FROM orders
             WHERE loyalty_program_id = ?
             ORDER BY id ASC",
        )
        .bind(program.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let raw = row.try_get::<String, _>("pos_raw_data")?;
                serde_json::from_str(&raw).map_err(|error| {
                    RepositoryError::Decode(format!("invalid order blob: {error}"))
                })
            })
            .collect()
    }
}
