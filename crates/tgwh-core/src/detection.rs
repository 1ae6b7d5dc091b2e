//! Object-detection results for scraped images and the category rule applied
//! to their labels.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Labels treated as a person being present.
pub const PERSON_LABELS: &[&str] = &["person"];

/// Labels treated as a product being present.
pub const PRODUCT_LABELS: &[&str] = &["bottle", "cup", "container"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCategory {
    Promotional,
    ProductDisplay,
    Lifestyle,
    Other,
}

impl ImageCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ImageCategory::Promotional => "promotional",
            ImageCategory::ProductDisplay => "product_display",
            ImageCategory::Lifestyle => "lifestyle",
            ImageCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "promotional" => Ok(ImageCategory::Promotional),
            "product_display" => Ok(ImageCategory::ProductDisplay),
            "lifestyle" => Ok(ImageCategory::Lifestyle),
            "other" => Ok(ImageCategory::Other),
            other => Err(CoreError::UnknownCategory(other.to_string())),
        }
    }
}

/// Categorise an image from its detected labels.
///
/// A person plus a product is `promotional`, a product alone is
/// `product_display`, a person alone is `lifestyle`, anything else is `other`.
#[must_use]
pub fn classify_labels(labels: &BTreeSet<String>) -> ImageCategory {
    let has_person = labels.iter().any(|l| PERSON_LABELS.contains(&l.as_str()));
    let has_product = labels.iter().any(|l| PRODUCT_LABELS.contains(&l.as_str()));

    match (has_person, has_product) {
        (true, true) => ImageCategory::Promotional,
        (false, true) => ImageCategory::ProductDisplay,
        (true, false) => ImageCategory::Lifestyle,
        (false, false) => ImageCategory::Other,
    }
}

/// One analysed image, keyed by `image_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRow {
    pub image_name: String,
    pub detected_object_labels: BTreeSet<String>,
    pub image_category: ImageCategory,
    pub confidence_score: f64,
}

impl DetectionRow {
    /// Build a row from raw detector output, deriving the category from the
    /// labels.
    #[must_use]
    pub fn from_detections<I, S>(image_name: impl Into<String>, labels: I, confidence: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let detected_object_labels: BTreeSet<String> = labels
            .into_iter()
            .map(Into::into)
            .filter(|l: &String| !l.trim().is_empty())
            .collect();
        let image_category = classify_labels(&detected_object_labels);
        Self {
            image_name: image_name.into(),
            detected_object_labels,
            image_category,
            confidence_score: confidence,
        }
    }

    /// Labels as stored: sorted and comma-joined.
    #[must_use]
    pub fn detected_objects(&self) -> String {
        self.detected_object_labels
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse a stored `detected_objects` string back into a label set.
    #[must_use]
    pub fn parse_labels(joined: &str) -> BTreeSet<String> {
        joined
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDetection`] for an empty image name or a
    /// confidence that is not a finite value in `[0, 1]`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.image_name.trim().is_empty() {
            return Err(CoreError::InvalidDetection {
                image_name: self.image_name.clone(),
                reason: "image_name must be non-empty".to_string(),
            });
        }
        if !self.confidence_score.is_finite() || !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(CoreError::InvalidDetection {
                image_name: self.image_name.clone(),
                reason: format!(
                    "confidence_score {} is outside [0, 1]",
                    self.confidence_score
                ),
            });
        }
        Ok(())
    }
}
