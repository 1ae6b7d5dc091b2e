//! Raw loader: every landed batch into `raw.telegram_messages`.

use std::collections::HashSet;
use std::path::Path;

use sqlx::PgPool;
use tgwh_core::MessageRecord;
use tgwh_lake::{discover_batches, read_batch};

use crate::LoadError;

/// Counters for one [`load_all`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub batches_found: usize,
    pub batches_processed: usize,
    pub batches_skipped: usize,
    pub rows_parsed: usize,
    pub rows_invalid: usize,
    pub rows_inserted: u64,
    pub rows_already_present: u64,
}

/// Load every batch under `message_root` into the raw store.
///
/// The schema is created first if absent. Batches are visited in sorted path
/// order with no watermark, so every call replays the whole lake; conflict
/// skipping on `(channel_name, message_id)` makes that idempotent.
///
/// Unreadable or malformed batches, batches with no valid rows, and batches
/// the store rejects are logged and skipped. Invalid elements inside a batch
/// are dropped and the rest of the batch is loaded.
///
/// # Errors
///
/// Returns [`LoadError::StoreUnavailable`] if the store cannot be reached,
/// [`LoadError::Migration`] if the schema cannot be ensured, or
/// [`LoadError::Lake`] if the lake tree itself cannot be walked.
pub async fn load_all(pool: &PgPool, message_root: &Path) -> Result<LoadSummary, LoadError> {
    let applied = tgwh_db::run_migrations(pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied raw schema migrations");
    }

    let batches = discover_batches(message_root)?;
    let mut summary = LoadSummary {
        batches_found: batches.len(),
        ..LoadSummary::default()
    };

    for path in &batches {
        let parsed = match read_batch(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable batch");
                summary.batches_skipped += 1;
                continue;
            }
        };

        for bad in &parsed.invalid {
            tracing::warn!(
                path = %path.display(),
                index = bad.index,
                reason = %bad.reason,
                "dropping malformed record"
            );
        }
        summary.rows_invalid += parsed.invalid.len();

        let records = dedup_first_wins(parsed.records);
        summary.rows_parsed += records.len();

        if records.is_empty() {
            tracing::warn!(path = %path.display(), "batch has no valid rows, skipping");
            summary.batches_skipped += 1;
            continue;
        }

        match tgwh_db::insert_raw_messages(pool, &records).await {
            Ok(inserted) => {
                let total = records.len() as u64;
                summary.rows_inserted += inserted;
                summary.rows_already_present += total.saturating_sub(inserted);
                summary.batches_processed += 1;
                tracing::debug!(
                    path = %path.display(),
                    rows = total,
                    inserted,
                    "batch loaded"
                );
            }
            Err(e) if tgwh_db::is_store_unavailable(&e) => {
                tracing::error!(path = %path.display(), error = %e, "raw store unavailable");
                return Err(LoadError::StoreUnavailable(e));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "store rejected batch, skipping");
                summary.batches_skipped += 1;
            }
        }
    }

    tracing::info!(
        found = summary.batches_found,
        processed = summary.batches_processed,
        skipped = summary.batches_skipped,
        inserted = summary.rows_inserted,
        already_present = summary.rows_already_present,
        invalid = summary.rows_invalid,
        "raw load finished"
    );

    Ok(summary)
}

/// Drop repeats of a natural key within one batch, keeping the first.
///
/// A single `INSERT … ON CONFLICT DO NOTHING` still fails if the same key
/// appears twice in its own input.
fn dedup_first_wins(records: Vec<MessageRecord>) -> Vec<MessageRecord> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(records.len());
        records.iter().map(|r| seen.insert(r.natural_key())).collect()
    };
    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, first)| first.then_some(record))
        .collect()
}
