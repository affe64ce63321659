//! Detection sources feeding the reconciliation loop

use crate::error::EyeError;
use async_trait::async_trait;
use pidscope_core::config::{DetectionConfig, DetectionSource};
use pidscope_core::RawDetection;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info};

/// Produces one batch of raw detections per call.
#[async_trait]
pub trait Detector: Send {
    fn name(&self) -> &str;

    /// Detect elements in the current frame.
    async fn detect(&mut self) -> Result<Vec<RawDetection>, EyeError>;

    /// Release any held resources. Called once when the loop exits.
    async fn release(&mut self) -> Result<(), EyeError> {
        Ok(())
    }
}

struct SimulatedElement {
    label: &'static str,
    confidence: f32,
    bounding_box: [f32; 4],
    details: &'static [(&'static str, &'static str)],
}

const SIMULATED_SCHEMATIC: &[SimulatedElement] = &[
    SimulatedElement {
        label: "Atmospheric Tank",
        confidence: 0.95,
        bounding_box: [50.0, 50.0, 150.0, 150.0],
        details: &[("Capacity", "500L"), ("Material", "Stainless Steel")],
    },
    SimulatedElement {
        label: "Pressurized Tank",
        confidence: 0.9,
        bounding_box: [200.0, 100.0, 300.0, 200.0],
        details: &[("Capacity", "1000L"), ("Material", "Carbon Steel")],
    },
    SimulatedElement {
        label: "Centrifugal Pump",
        confidence: 0.85,
        bounding_box: [350.0, 150.0, 450.0, 250.0],
        details: &[("Flow Rate", "150L/min"), ("Power", "5HP")],
    },
];

/// Fixed three-element schematic with optional box jitter and random
/// dropout of individual detections.
pub struct SimulatedDetector {
    jitter: f32,
    dropout: f64,
    rng: StdRng,
}

impl SimulatedDetector {
    pub fn new(jitter: f32, dropout: f64, seed: u64) -> Self {
        Self {
            jitter: jitter.max(0.0),
            dropout: dropout.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn offset(&mut self) -> f32 {
        if self.jitter > 0.0 {
            self.rng.gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        }
    }
}

#[async_trait]
impl Detector for SimulatedDetector {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn detect(&mut self) -> Result<Vec<RawDetection>, EyeError> {
        let mut batch = Vec::with_capacity(SIMULATED_SCHEMATIC.len());
        for element in SIMULATED_SCHEMATIC {
            if self.dropout > 0.0 && self.rng.gen_bool(self.dropout) {
                continue;
            }
            let (dx, dy) = (self.offset(), self.offset());
            let [x1, y1, x2, y2] = element.bounding_box;
            let mut detection = RawDetection::new(
                element.label,
                element.confidence,
                [x1 + dx, y1 + dy, x2 + dx, y2 + dy],
            );
            for (key, value) in element.details {
                detection = detection.with_detail(*key, *value);
            }
            batch.push(detection);
        }
        Ok(batch)
    }
}

/// Replays recorded batches in order, then yields empty batches.
#[derive(Debug)]
pub struct ReplayDetector {
    batches: VecDeque<Vec<RawDetection>>,
}

impl ReplayDetector {
    pub fn new(batches: Vec<Vec<RawDetection>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }

    /// Load a JSON array of batches, each an array of detection records.
    pub fn from_file(path: &Path) -> Result<Self, EyeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EyeError::Detector(format!("Failed to read replay file {:?}: {}", path, e))
        })?;
        let batches: Vec<Vec<RawDetection>> = serde_json::from_str(&content)?;
        info!("Loaded {} replay batches from {:?}", batches.len(), path);
        Ok(Self::new(batches))
    }

    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

#[async_trait]
impl Detector for ReplayDetector {
    fn name(&self) -> &str {
        "replay"
    }

    async fn detect(&mut self) -> Result<Vec<RawDetection>, EyeError> {
        match self.batches.pop_front() {
            Some(batch) => Ok(batch),
            None => {
                debug!("Replay exhausted");
                Ok(Vec::new())
            }
        }
    }
}

/// Build the detector selected in the configuration.
pub fn from_config(config: &DetectionConfig) -> Result<Box<dyn Detector>, EyeError> {
    config.validate().map_err(EyeError::Config)?;
    match &config.source {
        DetectionSource::Simulated { jitter, dropout } => Ok(Box::new(SimulatedDetector::new(
            *jitter,
            *dropout,
            config.seed,
        ))),
        DetectionSource::Replay { path } => Ok(Box::new(ReplayDetector::from_file(path)?)),
    }
}
