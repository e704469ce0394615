// Reads one ingestion window of raw messages from Postgres.

use hotspot_common::RawMessage;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::error::Result;

/// Raw columns, rendered as text so that malformed rows surface as parse
/// failures on our side rather than decode errors in the driver.
#[derive(Debug, Clone, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    time: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
    text: Option<String>,
    author: Option<String>,
    exact: Option<String>,
}

impl MessageRow {
    fn parse(&self) -> hotspot_common::Result<RawMessage> {
        RawMessage::parse(
            self.time.as_deref().unwrap_or_default(),
            self.lat.as_deref().unwrap_or_default(),
            self.lon.as_deref().unwrap_or_default(),
            self.text.as_deref().unwrap_or_default(),
            self.author.as_deref().unwrap_or_default(),
            self.exact.as_deref().unwrap_or_default(),
        )
    }
}

pub struct PgMessageSource {
    pool: PgPool,
}

impl PgMessageSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Messages with `start <= time < end` (epoch seconds), oldest first.
    /// Rows that do not parse are logged and skipped.
    pub async fn fetch_window(&self, start: i64, end: i64) -> Result<Vec<RawMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id,
                   EXTRACT(EPOCH FROM time)::BIGINT::TEXT AS time,
                   lat::TEXT AS lat,
                   lon::TEXT AS lon,
                   text,
                   author,
                   exact::TEXT AS exact
            FROM messages
            WHERE time >= to_timestamp($1) AND time < to_timestamp($2)
            ORDER BY time ASC, id ASC
            "#,
        )
        .bind(start as f64)
        .bind(end as f64)
        .fetch_all(&self.pool)
        .await?;

        let fetched = rows.len();
        let messages: Vec<RawMessage> = rows
            .iter()
            .filter_map(|row| match row.parse() {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(row = row.id, error = %e, "Skipping malformed message row");
                    None
                }
            })
            .collect();

        debug!(start, end, fetched, kept = messages.len(), "Fetched message window");
        Ok(messages)
    }
}
