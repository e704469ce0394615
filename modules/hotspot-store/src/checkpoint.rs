use sqlx::PgPool;

use crate::error::Result;

const CHECKPOINT_NAME: &str = "clustering";

/// Persists the boundary of the last completed cycle so a restart resumes
/// from the next unprocessed window.
pub struct PgCheckpointStore {
    pool: PgPool,
}

impl PgCheckpointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn load(&self) -> Result<Option<i64>> {
        let boundary = sqlx::query_scalar::<_, i64>("SELECT boundary FROM cycle_checkpoint WHERE name = $1")
            .bind(CHECKPOINT_NAME)
            .fetch_optional(&self.pool)
            .await?;
        Ok(boundary)
    }

    pub async fn save(&self, boundary: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cycle_checkpoint (name, boundary) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET boundary = EXCLUDED.boundary
            "#,
        )
        .bind(CHECKPOINT_NAME)
        .bind(boundary)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
