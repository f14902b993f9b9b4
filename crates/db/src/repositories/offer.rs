use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use offerly_core::program::ProgramId;
use serde_json::Value;

use super::{NewOfferBatch, OfferRepository, OfferRow, RepositoryError};
use crate::DbPool;

pub struct SqlOfferRepository {
    pool: DbPool,
}

impl SqlOfferRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OfferRepository for SqlOfferRepository {
    async fn save_batch(&self, batch: NewOfferBatch) -> Result<Vec<i64>, RepositoryError> {
        let offers_json = encode_json("offers", &batch.offers)?;
        let forecast_json = encode_json("forecast", &batch.forecast)?;
        let created_at = Utc::now().to_rfc3339();

        // One transaction per batch so a generation pass is either fully
        // persisted across its goals or not at all.
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(batch.goals.len());
        for goal in &batch.goals {
            let row = sqlx::query(
                "INSERT INTO offer_suggestions (
                    loyalty_program_id,
                    template_id,
                    goal_id,
                    goal_name,
                    generation_ref,
                    offers_json,
                    forecast_json,
                    created_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 RETURNING id",
            )
            .bind(batch.loyalty_program_id.0)
            .bind(batch.template_id)
            .bind(goal.id())
            .bind(goal.name())
            .bind(batch.generation_ref.to_string())
            .bind(&offers_json)
            .bind(&forecast_json)
            .bind(&created_at)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(row.try_get("id")?);
        }
        tx.commit().await?;

        Ok(ids)
    }

    async fn get_latest(
        &self,
        program: ProgramId,
        template_id: i64,
    ) -> Result<Option<OfferRow>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                loyalty_program_id,
                template_id,
                goal_id,
                goal_name,
                generation_ref,
                offers_json,
                forecast_json,
                created_at
             FROM offer_suggestions
             WHERE loyalty_program_id = ? AND template_id = ?
             ORDER BY id DESC
             LIMIT 1",
        )
        .bind(program.0)
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(offer_from_row).transpose()
    }

    async fn update_forecast_for_latest(
        &self,
        program: ProgramId,
        template_id: i64,
        forecast: &Value,
    ) -> Result<u64, RepositoryError> {
        let forecast_json = encode_json("forecast", forecast)?;

        let result = sqlx::query(
            "UPDATE offer_suggestions
             SET forecast_json = ?
             WHERE id = (
                SELECT id FROM offer_suggestions
                WHERE loyalty_program_id = ? AND template_id = ?
                ORDER BY id DESC
                LIMIT 1
             )",
        )
        .bind(forecast_json)
        .bind(program.0)
        .bind(template_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn encode_json(field: &str, value: &Value) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|error| RepositoryError::Decode(format!("unserializable {field}: {error}")))
}

fn offer_from_row(row: SqliteRow) -> Result<OfferRow, RepositoryError> {
    let generation_raw = row.try_get::<String, _>("generation_ref")?;
    let generation_ref = Uuid::parse_str(&generation_raw).map_err(|error| {
        RepositoryError::Decode(format!("invalid generation ref `{generation_raw}`: {error}"))
    })?;

    let offers_raw = row.try_get::<String, _>("offers_json")?;
    let offers = serde_json::from_str(&offers_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid offers payload: {error}")))?;

    let forecast_raw = row.try_get::<String, _>("forecast_json")?;
    let forecast = serde_json::from_str(&forecast_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid forecast payload: {error}")))?;

    let created_raw = row.try_get::<String, _>("created_at")?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| {
            RepositoryError::Decode(format!("invalid timestamp `{created_raw}`: {error}"))
        })?;

    Ok(OfferRow {
        id: row.try_get("id")?,
        loyalty_program_id: ProgramId(row.try_get("loyalty_program_id")?),
        template_id: row.try_get("template_id")?,
        goal_id: row.try_get("goal_id")?,
        goal_name: row.try_get("goal_name")?,
        generation_ref,
        offers,
        forecast,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use offerly_core::program::ProgramId;
    use offerly_core::templates::Goal;

    use super::SqlOfferRepository;
    use crate::migrations;
    use crate::repositories::{NewOfferBatch, OfferRepository};
    use crate::{connect_with, DbPool, PoolSettings};

    #[tokio::test]
    async fn batch_rows_share_a_generation_ref() {
        let pool = setup_pool().await;
        let repo = SqlOfferRepository::new(pool.clone());
        let generation_ref = Uuid::new_v4();

        let ids = repo
            .save_batch(NewOfferBatch {
                loyalty_program_id: ProgramId(7),
                template_id: 1,
                goals: vec![Goal::IncreaseAov, Goal::IncreaseOccupancy],
                generation_ref,
                offers: json!({"offers": []}),
                forecast: json!({"target": 0, "budget": 0, "predicted_redemptions": 0, "roi": "0x"}),
            })
            .await
            .expect("save batch");
        assert_eq!(ids.len(), 2);

        let latest = repo.get_latest(ProgramId(7), 1).await.expect("get latest").expect("row");
        assert_eq!(latest.generation_ref, generation_ref);
        assert_eq!(latest.goal_id, Goal::IncreaseOccupancy.id());

        pool.close().await;
    }

    #[tokio::test]
    async fn forecast_update_touches_only_the_latest_row() {
        let pool = setup_pool().await;
        let repo = SqlOfferRepository::new(pool.clone());

        for _ in 0..2 {
            repo.save_batch(NewOfferBatch {
                loyalty_program_id: ProgramId(7),
                template_id: 3,
                goals: vec![Goal::RepeatCustomers],
                generation_ref: Uuid::new_v4(),
                offers: json!({"offers": []}),
                forecast: json!({"target": 0, "budget": 0, "predicted_redemptions": 0, "roi": "0x"}),
            })
            .await
            .expect("save batch");
        }

        let forecast =
            json!({"target": 50, "budget": 2000, "predicted_redemptions": 20, "roi": "1.5x"});
        let updated = repo
            .update_forecast_for_latest(ProgramId(7), 3, &forecast)
            .await
            .expect("update forecast");
        assert_eq!(updated, 1);

        let latest = repo.get_latest(ProgramId(7), 3).await.expect("get latest").expect("row");
        assert_eq!(latest.forecast, forecast);

        pool.close().await;
    }

    #[tokio::test]
    async fn forecast_update_with_no_rows_is_a_no_op() {
        let pool = setup_pool().await;
        let repo = SqlOfferRepository::new(pool.clone());

        let updated = repo
            .update_forecast_for_latest(ProgramId(1), 1, &json!({"target": 1}))
            .await
            .expect("update forecast");
        assert_eq!(updated, 0);

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool =
            connect_with("sqlite::memory:?cache=shared", PoolSettings::single_connection())
                .await
                .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }
}
