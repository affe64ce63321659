//! Tracked element and highlight records

use crate::category::Category;
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque element identity. Minted once per element and never reissued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ElementId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for ElementId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Attribute key under which the detector confidence is stored.
pub const CONFIDENCE_KEY: &str = "Confidence";

/// An element that persists across detection cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedElement {
    pub id: ElementId,
    pub name: String,
    /// Fixed at creation.
    pub category: Category,
    pub details: BTreeMap<String, String>,
    pub bounding_box: BoundingBox,
}

impl TrackedElement {
    /// Confidence recorded in `details`, if parseable.
    pub fn confidence(&self) -> Option<f32> {
        self.details
            .get(CONFIDENCE_KEY)
            .and_then(|c| c.trim().parse::<f32>().ok())
    }

    /// Text block shown in the details panel.
    pub fn details_text(&self) -> String {
        let details = self
            .details
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Name: {}\nCategory: {}\nDetails:\n{}",
            self.name, self.category, details
        )
    }
}

/// Visual and selection counterpart of a [`TrackedElement`].
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub id: ElementId,
    pub name: String,
    pub bounding_box: BoundingBox,
    pub selected: bool,
}
