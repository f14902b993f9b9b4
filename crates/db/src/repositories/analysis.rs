use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use offerly_core::analysis::AnalysisType;
use offerly_core::program::ProgramId;

use super::{AnalysisRecord, AnalysisResultRepository, NewAnalysisRecord, RepositoryError};
use crate::DbPool;

pub struct SqlAnalysisResultRepository {
    pool: DbPool,
}

impl SqlAnalysisResultRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AnalysisResultRepository for SqlAnalysisResultRepository {
    async fn save(&self, record: NewAnalysisRecord) -> Result<i64, RepositoryError> {
        let analysis_json = serde_json::to_string(&record.analysis_json)
            .map_err(|error| RepositoryError::Decode(format!("unserializable document: {error}")))?;

        let row = sqlx::query(
            "INSERT INTO analysis_results (
                loyalty_program_id,
                analysis_type,
                analysis_json,
                created_at
             ) VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(record.loyalty_program_id.0)
        .bind(record.analysis_type.id())
        .bind(analysis_json)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn get_latest(
        &self,
        program: ProgramId,
        analysis_type: AnalysisType,
    ) -> Result<Option<AnalysisRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, loyalty_program_id, analysis_type, analysis_json, created_at
             FROM analysis_results
             WHERE loyalty_program_id = ? AND analysis_type = ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(program.0)
        .bind(analysis_type.id())
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }
}

fn record_from_row(row: SqliteRow) -> Result<AnalysisRecord, RepositoryError> {
    let type_raw = row.try_get::<i64, _>("analysis_type")?;
    let analysis_type = AnalysisType::from_id(type_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown analysis type `{type_raw}`")))?;

    let json_raw = row.try_get::<String, _>("analysis_json")?;
    let analysis_json = serde_json::from_str(&json_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid analysis document: {error}")))?;

    let created_raw = row.try_get::<String, _>("created_at")?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| {
            RepositoryError::Decode(format!("invalid timestamp `{created_raw}`: {error}"))
        })?;

    Ok(AnalysisRecord {
        id: row.try_get("id")?,
        loyalty_program_id: ProgramId(row.try_get("loyalty_program_id")?),
        analysis_type,
        analysis_json,
        created_at,
    })
}
