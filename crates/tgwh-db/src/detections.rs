//! Database operations for the `raw.yolo_detections` table.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use tgwh_core::DetectionRow;

use crate::DbError;

/// A row from `raw.yolo_detections`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DetectionRecordRow {
    pub image_name: String,
    pub detected_objects: String,
    pub image_category: String,
    pub confidence_score: f64,
    pub loaded_at: DateTime<Utc>,
}

/// Insert one detection row unless `image_name` is already present.
///
/// Returns `true` if the row was inserted, `false` if it already existed.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the statement fails, including CHECK
/// constraint violations on category or confidence.
pub async fn insert_detection<'e, E>(executor: E, row: &DetectionRow) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let affected = sqlx::query(
        "INSERT INTO raw.yolo_detections \
             (image_name, detected_objects, image_category, confidence_score) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (image_name) DO NOTHING",
    )
    .bind(&row.image_name)
    .bind(row.detected_objects())
    .bind(row.image_category.as_str())
    .bind(row.confidence_score)
    .execute(executor)
    .await?
    .rows_affected();

    Ok(affected == 1)
}

/// Total number of rows in `raw.yolo_detections`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_detections(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM raw.yolo_detections")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Fetch one detection row by image name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_detection(
    pool: &PgPool,
    image_name: &str,
) -> Result<Option<DetectionRecordRow>, DbError> {
    let row = sqlx::query_as::<_, DetectionRecordRow>(
        "SELECT image_name, detected_objects, image_category, confidence_score, loaded_at \
         FROM raw.yolo_detections \
         WHERE image_name = $1",
    )
    .bind(image_name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
