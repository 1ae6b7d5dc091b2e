//! Landing writer: one immutable JSON array per (day, channel).

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use tgwh_core::MessageRecord;

use crate::{LakeError, LakeLayout};

/// Result of landing one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBatch {
    pub path: PathBuf,
    pub record_count: usize,
}

#[derive(Debug, Clone)]
pub struct LandingWriter {
    layout: LakeLayout,
}

impl LandingWriter {
    #[must_use]
    pub fn new(layout: LakeLayout) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn layout(&self) -> &LakeLayout {
        &self.layout
    }

    /// Land `records` for `channel` on `day`, replacing any earlier batch for
    /// the same (day, channel).
    ///
    /// Records are validated first; nothing is written if any record fails.
    /// The file is written to a temporary sibling and renamed into place, so a
    /// reader sees either the previous batch or the complete new one.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::InvalidRecord`] or [`LakeError::ChannelMismatch`]
    /// for a bad record, [`LakeError::Encode`] if serialization fails, and
    /// [`LakeError::Io`] on filesystem failure.
    pub fn write(
        &self,
        channel: &str,
        day: NaiveDate,
        records: &[MessageRecord],
    ) -> Result<WrittenBatch, LakeError> {
        for (index, record) in records.iter().enumerate() {
            if record.channel_name != channel {
                return Err(LakeError::ChannelMismatch {
                    expected: channel.to_string(),
                    found: record.channel_name.clone(),
                    index,
                });
            }
            record
                .validate()
                .map_err(|source| LakeError::InvalidRecord {
                    channel: channel.to_string(),
                    index,
                    source,
                })?;
        }

        let body = serde_json::to_vec_pretty(records).map_err(|source| LakeError::Encode {
            channel: channel.to_string(),
            source,
        })?;

        let dir = self.layout.day_dir(day);
        std::fs::create_dir_all(&dir).map_err(|e| LakeError::io(&dir, e))?;

        let path = self.layout.batch_path(day, channel);
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{channel}."))
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| LakeError::io(&dir, e))?;
        tmp.write_all(&body)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| LakeError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| LakeError::io(&path, e.error))?;

        tracing::info!(
            channel,
            path = %path.display(),
            records = records.len(),
            "landed batch"
        );

        Ok(WrittenBatch {
            path,
            record_count: records.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(channel: &str, id: i64) -> MessageRecord {
        MessageRecord {
            message_id: id,
            channel_name: channel.to_string(),
            message_timestamp: None,
            message_text: Some(format!("post {id}")),
            view_count: Some(10),
            forward_count: Some(0),
            has_media: false,
            image_path: None,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn write_lands_records_in_fetch_order() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LandingWriter::new(LakeLayout::under(dir.path()));
        let records = vec![record("chanA", 3), record("chanA", 1), record("chanA", 2)];

        let written = writer.write("chanA", day(), &records).unwrap();

        assert_eq!(written.record_count, 3);
        assert!(written.path.ends_with("telegram_messages/2024-01-01/chanA.json"));
        let back: Vec<MessageRecord> =
            serde_json::from_slice(&std::fs::read(&written.path).unwrap()).unwrap();
        let ids: Vec<i64> = back.iter().map(|r| r.message_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn rewrite_replaces_whole_batch_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LandingWriter::new(LakeLayout::under(dir.path()));
        writer
            .write("chanA", day(), &[record("chanA", 1), record("chanA", 2)])
            .unwrap();
        let written = writer.write("chanA", day(), &[record("chanA", 9)]).unwrap();

        let back: Vec<MessageRecord> =
            serde_json::from_slice(&std::fs::read(&written.path).unwrap()).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].message_id, 9);

        let entries: Vec<_> = std::fs::read_dir(written.path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("chanA.json")]);
    }

    #[test]
    fn empty_batch_is_written_as_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LandingWriter::new(LakeLayout::under(dir.path()));
        let written = writer.write("chanA", day(), &[]).unwrap();
        assert_eq!(written.record_count, 0);
        assert_eq!(std::fs::read_to_string(&written.path).unwrap(), "[]");
    }

    #[test]
    fn invalid_record_aborts_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LandingWriter::new(LakeLayout::under(dir.path()));
        let mut bad = record("chanA", 2);
        bad.view_count = Some(-5);

        let err = writer
            .write("chanA", day(), &[record("chanA", 1), bad])
            .unwrap_err();

        assert!(matches!(err, LakeError::InvalidRecord { index: 1, .. }));
        assert!(!writer.layout().batch_path(day(), "chanA").exists());
    }

    #[test]
    fn record_from_another_channel_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LandingWriter::new(LakeLayout::under(dir.path()));
        let err = writer
            .write("chanA", day(), &[record("chanB", 1)])
            .unwrap_err();
        assert!(matches!(err, LakeError::ChannelMismatch { .. }));
    }
}
