//! pidscope-core: shared domain types for pidscope
//!
//! Bounding-box geometry, the P&ID category table, detection and element
//! records, configuration and the core error type.

pub mod category;
pub mod config;
pub mod detection;
pub mod element;
pub mod error;
pub mod geometry;

pub use category::{Category, CategoryDefinition, CategoryTable};
pub use config::{AppConfig, DetectionConfig, DetectionSource, RegistryConfig};
pub use detection::{normalize_confidence, Detection, RawDetection};
pub use element::{ElementId, Highlight, TrackedElement};
pub use error::{Error, Result};
pub use geometry::{iou, BoundingBox};
