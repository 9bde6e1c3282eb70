use crate::config::RecognitionConfig;
use serde::{Deserialize, Serialize};

/// One character box reported by the detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Left edge of the box in pixels
    pub x1: i32,
}

impl Detection {
    pub fn new(label: impl Into<String>, x1: i32) -> Self {
        Self {
            label: label.into(),
            x1,
        }
    }
}

/// Shape rules for a plate number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatePolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub separator: Option<char>,
}

impl PlatePolicy {
    /// Lenient policy: length only
    pub fn lenient(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
            separator: None,
        }
    }

    /// Trim, upper-case and check the character set. Letters, digits and the
    /// configured separator are the only characters a plate may contain.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let plate = raw.trim().to_uppercase();
        if plate.is_empty() {
            return None;
        }
        let valid = plate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || Some(c) == self.separator);
        valid.then_some(plate)
    }

    /// Normalize and additionally enforce length and separator rules
    pub fn validate(&self, raw: &str) -> Option<String> {
        let plate = self.normalize(raw)?;
        let length = plate.chars().count();
        if length < self.min_length || length > self.max_length {
            return None;
        }
        if let Some(separator) = self.separator {
            if !plate.contains(separator) {
                return None;
            }
        }
        Some(plate)
    }
}

impl Default for PlatePolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 8,
            separator: Some('-'),
        }
    }
}

impl From<&RecognitionConfig> for PlatePolicy {
    fn from(config: &RecognitionConfig) -> Self {
        Self {
            min_length: config.min_length,
            max_length: config.max_length,
            separator: config.separator,
        }
    }
}

/// Read detections left to right and return the plate if it passes `policy`.
///
/// Boxes are ordered by `x1`; boxes sharing an `x1` are ordered by label so the
/// result depends only on the set of detections, not on the order they arrived in.
pub fn assemble_plate(detections: &[Detection], policy: &PlatePolicy) -> Option<String> {
    if detections.is_empty() {
        return None;
    }

    let mut ordered: Vec<&Detection> = detections.iter().collect();
    ordered.sort_by(|a, b| a.x1.cmp(&b.x1).then_with(|| a.label.cmp(&b.label)));

    let candidate: String = ordered.iter().map(|d| d.label.as_str()).collect();
    policy.validate(&candidate)
}
