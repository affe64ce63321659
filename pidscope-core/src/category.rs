//! Label to category classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name of the catch-all category.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Built-in P&ID symbol table, in lookup priority order.
pub const BUILTIN_CATEGORIES: &[(&str, &[&str])] = &[
    ("Pumps", &["Centrifugal Pump", "Reciprocating Pump", "Diaphragm Pump"]),
    ("Tanks", &["Atmospheric Tank", "Pressurized Tank", "Underground Tank"]),
    (
        "Gate Valves",
        &[
            "Gate Valve",
            "Manual Operated Valve",
            "Self-Operating Gate Valve",
            "Closed Gate Valve",
            "Pneumatic Valve",
            "Rotary Valve",
            "Closed Rotary Valve",
        ],
    ),
    ("Ball Valves", &["Ball Valve", "Hydraulic"]),
    (
        "Globe Valves",
        &[
            "Globe Valve",
            "Hand Operated",
            "Pneumatic",
            "Motor",
            "Hydraulic",
            "Closed Globe Valve",
        ],
    ),
    ("Other Valves", &["Two-way Valve", "Needle Valve", "Post Indicator Valve"]),
    ("Plug Valves", &["Plug Valve", "Motor"]),
    ("Butterfly Valves", &["Butterfly Valve", "Pneumatic", "Lift"]),
    ("Check Valves", &["Check Valve", "Stop Check"]),
    ("Diaphragm Valves", &["Diaphragm Valve", "Motor"]),
    (
        "Fittings",
        &[
            "Open Spacer",
            "Closed Spectacle Blind",
            "Open Spectacle Blind",
            "Reducer",
            "Plug",
        ],
    ),
    ("Specialty items", &["Filter"]),
    ("Equipement", &["Scale"]),
    ("Safety", &["Fire Hydrant"]),
    (
        "Information",
        &[
            "Indicator",
            "On Central Control Panel",
            "On Local Control Panel",
            "Station",
            "Shared Indicator",
            "Level Gauge",
        ],
    ),
];

/// Result of classifying an element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Known(String),
    Unknown,
}

impl Category {
    pub fn name(&self) -> &str {
        match self {
            Category::Known(name) => name,
            Category::Unknown => UNKNOWN_CATEGORY,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Category::Known(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A user-supplied category appended after the built-in table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,
    pub elements: Vec<String>,
}

/// Ordered category table. The first category listing a name wins, so a
/// name declared under several categories always resolves the same way.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: Vec<(String, Vec<String>)>,
}

impl CategoryTable {
    pub fn builtin() -> Self {
        let entries = BUILTIN_CATEGORIES
            .iter()
            .map(|(category, names)| {
                (
                    category.to_string(),
                    names.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Built-in table followed by `extra`. Built-ins keep priority.
    pub fn with_extra(extra: &[CategoryDefinition]) -> Self {
        let mut table = Self::builtin();
        for def in extra {
            if let Some((_, names)) = table.entries.iter_mut().find(|(c, _)| *c == def.name) {
                names.extend(def.elements.iter().cloned());
            } else {
                table.entries.push((def.name.clone(), def.elements.clone()));
            }
        }
        table
    }

    pub fn classify(&self, name: &str) -> Category {
        let name = name.trim();
        self.entries
            .iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .map(|(category, _)| Category::Known(category.clone()))
            .unwrap_or(Category::Unknown)
    }

    /// Category names in lookup order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}
