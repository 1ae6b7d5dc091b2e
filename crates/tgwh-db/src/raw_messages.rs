//! Database operations for the `raw.telegram_messages` table.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use tgwh_core::MessageRecord;

use crate::DbError;

/// A row from `raw.telegram_messages`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawMessageRow {
    pub channel_name: String,
    pub message_id: i64,
    pub message_date: Option<DateTime<Utc>>,
    pub message_text: Option<String>,
    pub has_media: bool,
    pub image_path: Option<String>,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub loaded_at: DateTime<Utc>,
}

/// Insert a batch of records, skipping any `(channel_name, message_id)` that
/// is already present. Existing rows are never updated.
///
/// Returns the number of rows actually inserted. The whole batch is one
/// `INSERT … SELECT * FROM UNNEST(…)` statement, so it either applies in full
/// or not at all. Callers must not pass the same key twice in one batch.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the statement fails.
pub async fn insert_raw_messages<'e, E>(
    executor: E,
    records: &[MessageRecord],
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    if records.is_empty() {
        return Ok(0);
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut channel_names: Vec<String> = Vec::with_capacity(records.len());
    let mut message_ids: Vec<i64> = Vec::with_capacity(records.len());
    let mut message_dates: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(records.len());
    let mut message_texts: Vec<Option<String>> = Vec::with_capacity(records.len());
    let mut has_medias: Vec<bool> = Vec::with_capacity(records.len());
    let mut image_paths: Vec<Option<String>> = Vec::with_capacity(records.len());
    let mut views: Vec<Option<i64>> = Vec::with_capacity(records.len());
    let mut forwards: Vec<Option<i64>> = Vec::with_capacity(records.len());

    for record in records {
        channel_names.push(record.channel_name.clone());
        message_ids.push(record.message_id);
        message_dates.push(record.message_timestamp);
        message_texts.push(record.message_text.clone());
        has_medias.push(record.has_media);
        image_paths.push(record.image_path.clone());
        views.push(record.view_count);
        forwards.push(record.forward_count);
    }

    let inserted = sqlx::query(
        "INSERT INTO raw.telegram_messages \
             (channel_name, message_id, message_date, message_text, has_media, \
              image_path, views, forwards) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::int8[], $3::timestamptz[], $4::text[], $5::bool[], \
              $6::text[], $7::int8[], $8::int8[]) \
         ON CONFLICT (channel_name, message_id) DO NOTHING",
    )
    .bind(&channel_names)
    .bind(&message_ids)
    .bind(&message_dates)
    .bind(&message_texts)
    .bind(&has_medias)
    .bind(&image_paths)
    .bind(&views)
    .bind(&forwards)
    .execute(executor)
    .await?
    .rows_affected();

    Ok(inserted)
}

/// Total number of rows in `raw.telegram_messages`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_raw_messages(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM raw.telegram_messages")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Fetch one row by natural key, or `None` if it has not been loaded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_raw_message(
    pool: &PgPool,
    channel_name: &str,
    message_id: i64,
) -> Result<Option<RawMessageRow>, DbError> {
    let row = sqlx::query_as::<_, RawMessageRow>(
        "SELECT channel_name, message_id, message_date, message_text, has_media, \
                image_path, views, forwards, loaded_at \
         FROM raw.telegram_messages \
         WHERE channel_name = $1 AND message_id = $2",
    )
    .bind(channel_name)
    .bind(message_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// All rows for a channel, newest message first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_channel_messages(
    pool: &PgPool,
    channel_name: &str,
) -> Result<Vec<RawMessageRow>, DbError> {
    let rows = sqlx::query_as::<_, RawMessageRow>(
        "SELECT channel_name, message_id, message_date, message_text, has_media, \
                image_path, views, forwards, loaded_at \
         FROM raw.telegram_messages \
         WHERE channel_name = $1 \
         ORDER BY message_id DESC",
    )
    .bind(channel_name)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
