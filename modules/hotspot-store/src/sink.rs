// Publishes the cluster set by building shadow tables and swapping them in.

use chrono::{DateTime, Utc};
use hotspot_common::ClusterSummary;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{info, warn};

use crate::error::{Result, StoreError};

/// Rows per multi-row INSERT, well under the bind parameter limit.
const INSERT_CHUNK: usize = 1000;

const DUPLICATE_TABLE: &str = "42P07";

pub struct PgClusterSink {
    pool: PgPool,
}

impl PgClusterSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the published cluster set. Readers see either the previous set
    /// or the new one, never a mix.
    ///
    /// A shadow table left behind by an aborted cycle is dropped and
    /// recreated once; a second conflict is returned as
    /// [`StoreError::Conflict`].
    pub async fn replace_clusters(&self, summaries: &[ClusterSummary]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if let Err(e) = create_shadow_tables(&mut tx).await {
            if !is_duplicate_table(&e) {
                return Err(e.into());
            }
            tx.rollback().await?;
            warn!("Shadow tables already exist, dropping and recreating");
            sqlx::query("DROP TABLE IF EXISTS events_new, event_messages_new")
                .execute(&self.pool)
                .await?;

            tx = self.pool.begin().await?;
            create_shadow_tables(&mut tx).await.map_err(|e| {
                if is_duplicate_table(&e) {
                    StoreError::Conflict(e.to_string())
                } else {
                    StoreError::Database(e)
                }
            })?;
        }

        let rows = insert_summaries(&mut tx, summaries).await?;

        sqlx::query("DROP TABLE IF EXISTS events_old, event_messages_old")
            .execute(&mut *tx)
            .await?;
        sqlx::query("ALTER TABLE events RENAME TO events_old")
            .execute(&mut *tx)
            .await?;
        sqlx::query("ALTER TABLE event_messages RENAME TO event_messages_old")
            .execute(&mut *tx)
            .await?;
        sqlx::query("ALTER TABLE events_new RENAME TO events")
            .execute(&mut *tx)
            .await?;
        sqlx::query("ALTER TABLE event_messages_new RENAME TO event_messages")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DROP TABLE events_old, event_messages_old")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(events = summaries.len(), messages = rows, "Published clusters");
        Ok(())
    }
}

async fn create_shadow_tables(tx: &mut Transaction<'_, Postgres>) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("CREATE TABLE events_new (LIKE events INCLUDING ALL)")
        .execute(&mut **tx)
        .await?;
    sqlx::query("CREATE TABLE event_messages_new (LIKE event_messages INCLUDING ALL)")
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn is_duplicate_table(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == DUPLICATE_TABLE)
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(StoreError::Timestamp(secs))
}

struct EventRow {
    id: i64,
    lon: f64,
    lat: f64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    authors: i32,
}

struct EventMessageRow<'a> {
    event_id: i64,
    time: DateTime<Utc>,
    lat: f64,
    lon: f64,
    exact: bool,
    text: &'a str,
}

/// Insert every summary into the shadow tables. Event ids are 1-based in
/// publication order. Returns the number of member rows written.
async fn insert_summaries(tx: &mut Transaction<'_, Postgres>, summaries: &[ClusterSummary]) -> Result<usize> {
    let mut events = Vec::with_capacity(summaries.len());
    let mut members = Vec::new();
    for (i, summary) in summaries.iter().enumerate() {
        let id = i as i64 + 1;
        events.push(EventRow {
            id,
            lon: summary.lon,
            lat: summary.lat,
            start_time: timestamp(summary.start_time)?,
            end_time: timestamp(summary.end_time)?,
            authors: i32::try_from(summary.authors).unwrap_or(i32::MAX),
        });
        for member in &summary.members {
            members.push(EventMessageRow {
                event_id: id,
                time: timestamp(member.time)?,
                lat: member.lat,
                lon: member.lon,
                exact: member.exact,
                text: &member.text,
            });
        }
    }

    for chunk in events.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO events_new (id, lon, lat, start_time, end_time, authors) ");
        qb.push_values(chunk, |mut b, e| {
            b.push_bind(e.id)
                .push_bind(e.lon)
                .push_bind(e.lat)
                .push_bind(e.start_time)
                .push_bind(e.end_time)
                .push_bind(e.authors);
        });
        qb.build().execute(&mut **tx).await?;
    }

    for chunk in members.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO event_messages_new (event_id, time, lat, lon, exact, text) ");
        qb.push_values(chunk, |mut b, m| {
            b.push_bind(m.event_id)
                .push_bind(m.time)
                .push_bind(m.lat)
                .push_bind(m.lon)
                .push_bind(m.exact)
                .push_bind(m.text);
        });
        qb.build().execute(&mut **tx).await?;
    }

    Ok(members.len())
}
