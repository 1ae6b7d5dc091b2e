//! Enrichment loader: classifier output into `raw.yolo_detections`.

use sqlx::PgPool;
use tgwh_core::DetectionRow;

use crate::LoadError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichSummary {
    pub inserted: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// Insert detection rows, skipping any `image_name` already present.
///
/// All rows share one transaction. Each row runs under its own savepoint, so
/// a row the store rejects is rolled back alone and the rest still commit.
/// Rows that fail validation never reach the store.
///
/// # Errors
///
/// Returns [`LoadError::StoreUnavailable`] if the transaction cannot be
/// opened or committed, or the connection drops mid-load.
pub async fn load_detections(
    pool: &PgPool,
    rows: &[DetectionRow],
) -> Result<EnrichSummary, LoadError> {
    let mut summary = EnrichSummary::default();
    if rows.is_empty() {
        tracing::info!("no detection rows to load");
        return Ok(summary);
    }

    let mut tx = pool.begin().await?;

    for row in rows {
        if let Err(e) = row.validate() {
            tracing::warn!(image = %row.image_name, error = %e, "skipping invalid detection");
            summary.failed += 1;
            continue;
        }

        let mut savepoint = sqlx::Connection::begin(&mut *tx).await?;
        match tgwh_db::insert_detection(&mut *savepoint, row).await {
            Ok(inserted) => {
                savepoint.commit().await?;
                if inserted {
                    summary.inserted += 1;
                } else {
                    summary.already_present += 1;
                }
            }
            Err(e) if tgwh_db::is_store_unavailable(&e) => {
                return Err(LoadError::StoreUnavailable(e));
            }
            Err(e) => {
                savepoint.rollback().await?;
                tracing::warn!(image = %row.image_name, error = %e, "store rejected detection");
                summary.failed += 1;
            }
        }
    }

    tx.commit().await?;

    tracing::info!(
        inserted = summary.inserted,
        already_present = summary.already_present,
        failed = summary.failed,
        "detections loaded"
    );

    Ok(summary)
}
