//! Reader for the classifier's CSV output.
//!
//! Header: `image_name,detected_objects,image_category,confidence_score`.

use std::path::Path;

use serde::Deserialize;
use tgwh_core::{DetectionRow, ImageCategory};

use crate::LoadError;

#[derive(Debug, Deserialize)]
struct CsvDetection {
    image_name: String,
    #[serde(default)]
    detected_objects: String,
    image_category: String,
    confidence_score: f64,
}

/// Parsed detections plus the data lines that could not be used.
#[derive(Debug, Default)]
pub struct DetectionsFile {
    pub rows: Vec<DetectionRow>,
    /// `(line, reason)` for each skipped line.
    pub invalid: Vec<(u64, String)>,
}

/// Read a detections CSV. Bad lines are reported, not fatal.
///
/// # Errors
///
/// Returns [`LoadError::DetectionsFile`] if the file cannot be opened or its
/// header cannot be read.
pub fn read_detections_csv(path: &Path) -> Result<DetectionsFile, LoadError> {
    let file_error = |source: csv::Error| LoadError::DetectionsFile {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(file_error)?;
    let headers = reader.headers().map_err(file_error)?.clone();

    let mut out = DetectionsFile::default();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(0, csv::Position::line);
                tracing::warn!(path = %path.display(), line, error = %e, "skipping unreadable detection line");
                out.invalid.push((line, e.to_string()));
                continue;
            }
        };
        let line = record.position().map_or(0, csv::Position::line);

        let raw: CsvDetection = match record.deserialize(Some(&headers)) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), line, error = %e, "skipping malformed detection line");
                out.invalid.push((line, e.to_string()));
                continue;
            }
        };

        let category = match raw.image_category.parse::<ImageCategory>() {
            Ok(category) => category,
            Err(e) => {
                tracing::warn!(path = %path.display(), line, image = %raw.image_name, error = %e, "skipping detection");
                out.invalid.push((line, e.to_string()));
                continue;
            }
        };

        out.rows.push(DetectionRow {
            detected_object_labels: DetectionRow::parse_labels(&raw.detected_objects),
            image_name: raw.image_name,
            image_category: category,
            confidence_score: raw.confidence_score,
        });
    }

    tracing::debug!(
        path = %path.display(),
        rows = out.rows.len(),
        invalid = out.invalid.len(),
        "read detections file"
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn csv_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_rows_with_quoted_label_lists() {
        let file = csv_file(
            "image_name,detected_objects,image_category,confidence_score\n\
             12.jpg,\"bottle,person\",promotional,0.874\n\
             13.jpg,,other,0.0\n",
        );

        let parsed = read_detections_csv(file.path()).unwrap();

        assert!(parsed.invalid.is_empty());
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].detected_objects(), "bottle,person");
        assert_eq!(parsed.rows[0].image_category, ImageCategory::Promotional);
        assert!(parsed.rows[1].detected_object_labels.is_empty());
        assert_eq!(parsed.rows[1].image_category, ImageCategory::Other);
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let file = csv_file(
            "image_name,detected_objects,image_category,confidence_score\n\
             1.jpg,cup,product_display,high\n\
             2.jpg,person,banner,0.5\n\
             3.jpg,person,lifestyle,0.61\n",
        );

        let parsed = read_detections_csv(file.path()).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].image_name, "3.jpg");
        assert_eq!(parsed.invalid.len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = read_detections_csv(Path::new("/no/such/detections.csv"));
        assert!(matches!(result, Err(LoadError::DetectionsFile { .. })));
    }
}
