//! The scraped post record shared by the scraper, the lake, and the loader.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::CoreError;

/// One scraped channel post.
///
/// Serialized field names follow the landing file format (`message_date`,
/// `views`, `forwards`). `(channel_name, message_id)` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: i64,
    pub channel_name: String,
    #[serde(
        rename = "message_date",
        default,
        deserialize_with = "deserialize_message_date"
    )]
    pub message_timestamp: Option<DateTime<Utc>>,
    pub message_text: Option<String>,
    #[serde(rename = "views")]
    pub view_count: Option<i64>,
    #[serde(rename = "forwards")]
    pub forward_count: Option<i64>,
    pub has_media: bool,
    pub image_path: Option<String>,
}

impl MessageRecord {
    /// Check the record invariants that the type system does not express.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidMessage`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), CoreError> {
        let fail = |reason: &str| {
            Err(CoreError::InvalidMessage {
                channel: self.channel_name.clone(),
                message_id: self.message_id,
                reason: reason.to_string(),
            })
        };

        if self.message_id <= 0 {
            return fail("message_id must be positive");
        }
        if self.channel_name.trim().is_empty() {
            return fail("channel_name must be non-empty");
        }
        if self.view_count.is_some_and(|v| v < 0) {
            return fail("views must be non-negative");
        }
        if self.forward_count.is_some_and(|v| v < 0) {
            return fail("forwards must be non-negative");
        }
        if self.image_path.is_some() && !self.has_media {
            return fail("image_path is set but has_media is false");
        }

        Ok(())
    }

    /// The `(channel_name, message_id)` natural key.
    #[must_use]
    pub fn natural_key(&self) -> (&str, i64) {
        (self.channel_name.as_str(), self.message_id)
    }
}

/// Accepts ISO-8601 with an offset, or without one (read as UTC).
fn deserialize_message_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_message_date(&raw)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid message_date \"{raw}\"")))
}

fn parse_message_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = raw.parse::<DateTime<FixedOffset>>() {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(id: i64) -> MessageRecord {
        MessageRecord {
            message_id: id,
            channel_name: "chanA".to_string(),
            message_timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
            message_text: Some("Paracetamol 500mg in stock".to_string()),
            view_count: Some(120),
            forward_count: Some(3),
            has_media: false,
            image_path: None,
        }
    }

    #[test]
    fn serializes_with_landing_file_keys() {
        let value = serde_json::to_value(record(7)).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "message_id",
            "channel_name",
            "message_date",
            "message_text",
            "views",
            "forwards",
            "has_media",
            "image_path",
        ] {
            assert!(obj.contains_key(key), "missing key {key}");
        }
        assert_eq!(obj.len(), 8);
    }

    #[test]
    fn deserializes_offset_timestamps_and_nulls() {
        let json = r#"{
            "message_id": 42,
            "channel_name": "CheMed123",
            "message_date": "2024-01-01T13:00:00+03:00",
            "message_text": null,
            "views": null,
            "forwards": null,
            "has_media": true,
            "image_path": "data/raw/images/CheMed123/42.jpg"
        }"#;
        let rec: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            rec.message_timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
        assert!(rec.message_text.is_none());
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn timestamps_without_offset_are_read_as_utc() {
        let expected = Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        for date in ["2024-01-01T10:00:00", "2024-01-01 10:00:00", "2024-01-01 10:00:00+00:00"] {
            let json = format!(
                r#"{{"message_id": 1, "channel_name": "chanA", "message_date": "{date}", "has_media": false}}"#
            );
            let rec: MessageRecord = serde_json::from_str(&json).unwrap();
            assert_eq!(rec.message_timestamp, expected, "{date}");
        }
    }

    #[test]
    fn absent_or_garbled_message_date() {
        let absent: MessageRecord =
            serde_json::from_str(r#"{"message_id": 1, "channel_name": "chanA", "has_media": false}"#)
                .unwrap();
        assert!(absent.message_timestamp.is_none());

        let garbled = r#"{"message_id": 1, "channel_name": "chanA", "message_date": "yesterday", "has_media": false}"#;
        assert!(serde_json::from_str::<MessageRecord>(garbled).is_err());
    }

    #[test]
    fn missing_has_media_is_a_parse_error() {
        let json = r#"{"message_id": 1, "channel_name": "chanA"}"#;
        assert!(serde_json::from_str::<MessageRecord>(json).is_err());
    }

    #[test]
    fn validate_rejects_negative_views() {
        let mut rec = record(1);
        rec.view_count = Some(-1);
        let err = rec.validate().unwrap_err();
        assert!(err.to_string().contains("views"));
    }

    #[test]
    fn validate_rejects_image_without_media() {
        let mut rec = record(1);
        rec.image_path = Some("x.jpg".to_string());
        assert!(rec.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_id() {
        assert!(record(0).validate().is_err());
        assert!(record(1).validate().is_ok());
    }

    #[test]
    fn natural_key_pairs_channel_and_id() {
        assert_eq!(record(9).natural_key(), ("chanA", 9));
    }
}
