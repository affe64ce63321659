//! pidscope-eye: live element tracking for schematic detection
//!
//! Reconciles per-frame detection batches into a stable registry of elements
//! and highlights, keeps the element list and overlay selection in sync, and
//! runs the detector on a background task that hands batches to the single
//! registry owner.

pub mod detector;
pub mod driver;
pub mod error;
pub mod overlay;
pub mod pipeline;
pub mod presentation;
pub mod registry;
pub mod snapshot;

pub use detector::{Detector, ReplayDetector, SimulatedDetector};
pub use driver::RegistryDriver;
pub use error::EyeError;
pub use overlay::{overlay_items, OverlayItem, Viewport};
pub use pipeline::{spawn_detection_loop, CancellationToken, DetectionBatch, LoopOptions};
pub use presentation::{
    BroadcastAdapter, ElementTree, NullAdapter, PresentationAdapter, RegistryEvent,
};
pub use registry::{ElementRegistry, ReconcileReport};
pub use snapshot::{export_snapshot, ElementRecord, Snapshot};
