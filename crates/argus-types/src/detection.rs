use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// One classification of a detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    pub confidence: f32,
}

impl Label {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// One labeled, localized object returned by the detector for a single frame.
///
/// Labels are ordered by descending confidence; the first one is "primary".
/// `tracking_id` correlates detections of the same physical object across
/// frames and is absent when the detector runs without tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub tracking_id: Option<i32>,
    pub bounding_box: Rect,
    pub labels: Vec<Label>,
}

impl DetectionResult {
    pub fn new(tracking_id: Option<i32>, bounding_box: Rect, mut labels: Vec<Label>) -> Self {
        labels.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self {
            tracking_id,
            bounding_box,
            labels,
        }
    }

    pub fn primary_label(&self) -> Option<&Label> {
        self.labels.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_sorted_by_descending_confidence() {
        let result = DetectionResult::new(
            Some(3),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            vec![
                Label::new("mug", 0.4),
                Label::new("cup", 0.9),
                Label::new("bowl", 0.7),
            ],
        );
        let texts: Vec<&str> = result.labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["cup", "bowl", "mug"]);
        assert_eq!(result.primary_label().unwrap().text, "cup");
    }

    #[test]
    fn primary_label_absent_for_unlabeled_result() {
        let result = DetectionResult::new(None, Rect::new(0.0, 0.0, 1.0, 1.0), Vec::new());
        assert!(result.primary_label().is_none());
    }
}
