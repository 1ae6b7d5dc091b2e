use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Directory layout of the lake.
///
/// ```text
/// {message_root}/{YYYY-MM-DD}/{channel}.json
/// {image_root}/{channel}/{message_id}.jpg
/// ```
#[derive(Debug, Clone)]
pub struct LakeLayout {
    message_root: PathBuf,
    image_root: PathBuf,
}

impl LakeLayout {
    #[must_use]
    pub fn new(message_root: impl Into<PathBuf>, image_root: impl Into<PathBuf>) -> Self {
        Self {
            message_root: message_root.into(),
            image_root: image_root.into(),
        }
    }

    /// Standard layout under a single data root: `telegram_messages/` and `images/`.
    #[must_use]
    pub fn under(data_root: &Path) -> Self {
        Self::new(
            data_root.join("telegram_messages"),
            data_root.join("images"),
        )
    }

    #[must_use]
    pub fn message_root(&self) -> &Path {
        &self.message_root
    }

    #[must_use]
    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    #[must_use]
    pub fn day_dir(&self, day: NaiveDate) -> PathBuf {
        self.message_root.join(day.format("%Y-%m-%d").to_string())
    }

    #[must_use]
    pub fn batch_path(&self, day: NaiveDate, channel: &str) -> PathBuf {
        self.day_dir(day).join(format!("{channel}.json"))
    }

    #[must_use]
    pub fn image_path(&self, channel: &str, message_id: i64) -> PathBuf {
        self.image_root
            .join(channel)
            .join(format!("{message_id}.jpg"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_path_is_day_then_channel() {
        let layout = LakeLayout::under(Path::new("data/raw"));
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(
            layout.batch_path(day, "CheMed123"),
            PathBuf::from("data/raw/telegram_messages/2024-01-05/CheMed123.json")
        );
    }

    #[test]
    fn image_path_is_channel_then_id() {
        let layout = LakeLayout::under(Path::new("data/raw"));
        assert_eq!(
            layout.image_path("lobelia4cosmetics", 812),
            PathBuf::from("data/raw/images/lobelia4cosmetics/812.jpg")
        );
    }
}
