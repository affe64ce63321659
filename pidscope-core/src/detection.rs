//! Per-frame detection records

use crate::element::ElementId;
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detection as handed over by a detector. Every field is optional so that a
/// malformed record can be carried through deserialization and dropped later
/// instead of failing the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    #[serde(default, alias = "name", alias = "class")]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default, alias = "bbox", alias = "highlight_coordinates")]
    pub bounding_box: Option<[f32; 4]>,
    /// Identity attached by an earlier enrichment step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ElementId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, confidence: f32, bounding_box: [f32; 4]) -> Self {
        Self {
            label: Some(label.into()),
            confidence: Some(confidence),
            bounding_box: Some(bounding_box),
            id: None,
            details: BTreeMap::new(),
        }
    }

    /// Center/size form, as returned by hosted inference APIs.
    pub fn from_center(
        label: impl Into<String>,
        confidence: f32,
        cx: f32,
        cy: f32,
        width: f32,
        height: f32,
    ) -> Self {
        let bbox = BoundingBox::from_center(cx, cy, width, height);
        Self::new(label, confidence, bbox.to_array())
    }

    pub fn with_id(mut self, id: ElementId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Check required fields and box shape.
    pub fn validate(&self) -> Result<Detection> {
        let label = self
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| Error::InvalidDetection("missing label".to_string()))?;

        let confidence = self
            .confidence
            .ok_or_else(|| Error::InvalidDetection(format!("'{}' has no confidence", label)))?;
        if !confidence.is_finite() || confidence < 0.0 {
            return Err(Error::InvalidDetection(format!(
                "'{}' has invalid confidence {}",
                label, confidence
            )));
        }

        let coords = self
            .bounding_box
            .ok_or_else(|| Error::InvalidDetection(format!("'{}' has no bounding box", label)))?;
        let bounding_box = BoundingBox::from_array(coords);
        if !bounding_box.is_well_formed() {
            return Err(Error::InvalidDetection(format!(
                "'{}' has malformed bounding box {:?}",
                label, coords
            )));
        }

        Ok(Detection {
            label: label.to_string(),
            confidence,
            bounding_box,
            id: self.id,
            details: self.details.clone(),
        })
    }
}

/// A well-formed detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    /// As reported by the detector: fraction or percentage.
    pub confidence: f32,
    pub bounding_box: BoundingBox,
    pub id: Option<ElementId>,
    pub details: BTreeMap<String, String>,
}

impl Detection {
    pub fn normalized_confidence(&self) -> f32 {
        normalize_confidence(self.confidence)
    }
}

/// Map a confidence given either as a fraction in `[0, 1]` or a percentage in
/// `[0, 100]` onto `[0, 1]`.
pub fn normalize_confidence(confidence: f32) -> f32 {
    if !confidence.is_finite() {
        return 0.0;
    }
    let fraction = if confidence <= 1.0 {
        confidence
    } else {
        confidence / 100.0
    };
    fraction.clamp(0.0, 1.0)
}
