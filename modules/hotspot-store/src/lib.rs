pub mod checkpoint;
pub mod error;
pub mod sink;
pub mod source;
#[cfg(feature = "test-utils")]
pub mod testutil;

pub use checkpoint::PgCheckpointStore;
pub use error::{Result, StoreError};
pub use sink::PgClusterSink;
pub use source::PgMessageSource;

use sqlx::PgPool;

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
