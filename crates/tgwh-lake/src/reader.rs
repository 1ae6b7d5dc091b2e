//! Batch discovery and parsing for the raw loader.

use std::path::{Path, PathBuf};

use tgwh_core::MessageRecord;
use walkdir::WalkDir;

use crate::LakeError;

/// An array element that could not be turned into a valid [`MessageRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidElement {
    pub index: usize,
    pub reason: String,
}

/// A batch file parsed element by element.
#[derive(Debug)]
pub struct ParsedBatch {
    pub path: PathBuf,
    pub records: Vec<MessageRecord>,
    pub invalid: Vec<InvalidElement>,
}

/// Every `*.json` batch under `message_root`, in sorted path order.
///
/// A missing root yields an empty list. Hidden files (in-flight temp files
/// from the writer) are ignored. No modification-time filtering is applied.
///
/// # Errors
///
/// Returns [`LakeError::Walk`] if a directory in the tree cannot be read.
pub fn discover_batches(message_root: &Path) -> Result<Vec<PathBuf>, LakeError> {
    if !message_root.exists() {
        tracing::warn!(path = %message_root.display(), "lake root does not exist");
        return Ok(Vec::new());
    }

    let mut batches = Vec::new();
    for entry in WalkDir::new(message_root).sort_by_file_name() {
        let entry = entry.map_err(|source| LakeError::Walk {
            path: message_root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        if entry.path().extension().is_some_and(|ext| ext == "json") {
            batches.push(entry.into_path());
        }
    }

    batches.sort();
    Ok(batches)
}

/// Read one batch file.
///
/// The file must hold a JSON array. Each element is decoded and validated on
/// its own: bad elements are reported in [`ParsedBatch::invalid`] and do not
/// affect their neighbours.
///
/// # Errors
///
/// Returns [`LakeError::Io`] if the file cannot be read,
/// [`LakeError::MalformedBatch`] if it is not valid JSON, and
/// [`LakeError::NotAnArray`] if the top-level value is not an array.
pub fn read_batch(path: &Path) -> Result<ParsedBatch, LakeError> {
    let bytes = std::fs::read(path).map_err(|e| LakeError::io(path, e))?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|source| LakeError::MalformedBatch {
            path: path.to_path_buf(),
            source,
        })?;

    let serde_json::Value::Array(elements) = value else {
        return Err(LakeError::NotAnArray {
            path: path.to_path_buf(),
        });
    };

    let mut records = Vec::with_capacity(elements.len());
    let mut invalid = Vec::new();

    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<MessageRecord>(element) {
            Ok(record) => match record.validate() {
                Ok(()) => records.push(record),
                Err(e) => invalid.push(InvalidElement {
                    index,
                    reason: e.to_string(),
                }),
            },
            Err(e) => invalid.push(InvalidElement {
                index,
                reason: e.to_string(),
            }),
        }
    }

    Ok(ParsedBatch {
        path: path.to_path_buf(),
        records,
        invalid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, body: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn discover_is_sorted_recursive_and_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "2024-01-02/b.json", "[]");
        write(root, "2024-01-01/z.json", "[]");
        write(root, "2024-01-01/a.json", "[]");
        write(root, "2024-01-01/notes.txt", "ignore me");
        write(root, "2024-01-01/.a.json.tmp", "[]");
        write(root, "2024-01-01/.hidden.json", "[]");

        let found = discover_batches(root).unwrap();
        let rel: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("2024-01-01/a.json"),
                PathBuf::from("2024-01-01/z.json"),
                PathBuf::from("2024-01-02/b.json"),
            ]
        );
    }

    #[test]
    fn discover_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let found = discover_batches(&dir.path().join("nope")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn read_batch_keeps_good_elements_and_reports_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "2024-01-01/chanA.json",
            r#"[
                {"message_id": 1, "channel_name": "chanA", "message_date": "2024-01-01T10:00:00+00:00",
                 "message_text": "hi", "views": 5, "forwards": 0, "has_media": false, "image_path": null},
                {"message_id": "two", "channel_name": "chanA", "has_media": false},
                {"message_id": 3, "channel_name": "chanA", "message_date": null,
                 "message_text": null, "views": -4, "forwards": null, "has_media": false, "image_path": null},
                {"message_id": 4, "channel_name": "chanA", "message_date": null,
                 "message_text": null, "views": null, "forwards": null, "has_media": true,
                 "image_path": "images/chanA/4.jpg"}
            ]"#,
        );

        let parsed = read_batch(&path).unwrap();
        let ids: Vec<i64> = parsed.records.iter().map(|r| r.message_id).collect();
        assert_eq!(ids, vec![1, 4]);
        let bad: Vec<usize> = parsed.invalid.iter().map(|i| i.index).collect();
        assert_eq!(bad, vec![1, 2]);
    }

    #[test]
    fn read_batch_accepts_timestamps_with_and_without_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "2024-01-01/chanB.json",
            r#"[
                {"message_id": 1, "channel_name": "chanB", "message_date": "2024-01-01T10:00:00",
                 "message_text": null, "views": null, "forwards": null, "has_media": false, "image_path": null},
                {"message_id": 2, "channel_name": "chanB", "message_date": "2024-01-01 10:00:00+00:00",
                 "message_text": null, "views": null, "forwards": null, "has_media": false, "image_path": null}
            ]"#,
        );

        let parsed = read_batch(&path).unwrap();
        assert!(parsed.invalid.is_empty(), "{:?}", parsed.invalid);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(
            parsed.records[0].message_timestamp,
            parsed.records[1].message_timestamp
        );
        assert!(parsed.records[0].message_timestamp.is_some());
    }

    #[test]
    fn read_batch_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "x.json", r#"{"message_id": 1}"#);
        assert!(matches!(
            read_batch(&path).unwrap_err(),
            LakeError::NotAnArray { .. }
        ));
    }

    #[test]
    fn read_batch_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "x.json", "[{\"message_id\": 1,");
        assert!(matches!(
            read_batch(&path).unwrap_err(),
            LakeError::MalformedBatch { .. }
        ));
    }

    #[test]
    fn read_batch_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_batch(&dir.path().join("gone.json")).unwrap_err(),
            LakeError::Io { .. }
        ));
    }
}
