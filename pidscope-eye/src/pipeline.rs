//! Background detection loop and its handoff to the registry owner
//!
//! The detector runs on its own task and never touches the registry. Each
//! cycle's output is sent as a [`DetectionBatch`] over a bounded channel; the
//! single owner of the registry applies batches in order.

use crate::detector::Detector;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pidscope_core::config::DetectionConfig;
use pidscope_core::RawDetection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Shared stop flag for the detection loop and the driver.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<RwLock<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.cancelled.write() = true;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.read()
    }
}

/// Output of one detection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBatch {
    /// Monotonic cycle number, starting at 0
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub detections: Vec<RawDetection>,
}

/// Loop settings derived from [`DetectionConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopOptions {
    pub interval: Duration,
    pub channel_capacity: usize,
    /// Stop after this many cycles; run until cancelled when `None`
    pub max_cycles: Option<u64>,
}

impl From<&DetectionConfig> for LoopOptions {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms.max(1)),
            channel_capacity: config.channel_capacity.max(1),
            max_cycles: None,
        }
    }
}

/// Spawn the detection loop on the runtime.
///
/// The loop ends when the token is cancelled, the cycle budget is spent, or
/// the receiver is dropped. A batch produced after cancellation is discarded.
/// A failing detection cycle is reported as an empty batch. The detector is
/// released before the task finishes.
pub fn spawn_detection_loop(
    mut detector: Box<dyn Detector>,
    options: LoopOptions,
    token: CancellationToken,
) -> (mpsc::Receiver<DetectionBatch>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(options.channel_capacity.max(1));

    let handle = tokio::spawn(async move {
        info!(
            "Starting {} detection loop every {:?}",
            detector.name(),
            options.interval
        );

        let mut ticker = tokio::time::interval(options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sequence: u64 = 0;

        loop {
            if options.max_cycles.is_some_and(|max| sequence >= max) {
                debug!("Detection cycle budget of {} spent", sequence);
                break;
            }

            ticker.tick().await;
            if token.is_cancelled() {
                break;
            }

            let detections = match detector.detect().await {
                Ok(detections) => detections,
                Err(e) => {
                    warn!("Detection cycle {} failed: {}", sequence, e);
                    Vec::new()
                }
            };

            if token.is_cancelled() {
                debug!("Discarding batch {} after cancellation", sequence);
                break;
            }

            let batch = DetectionBatch {
                sequence,
                captured_at: Utc::now(),
                detections,
            };
            if tx.send(batch).await.is_err() {
                warn!("Batch receiver dropped, stopping detection loop");
                break;
            }
            sequence += 1;
        }

        if let Err(e) = detector.release().await {
            error!("Failed to release {} detector: {}", detector.name(), e);
        }
        info!("Detection loop stopped after {} batches", sequence);
    });

    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_options_from_config() {
        let options = LoopOptions::from(&DetectionConfig {
            interval_ms: 0,
            channel_capacity: 0,
            ..DetectionConfig::default()
        });
        assert_eq!(options.interval, Duration::from_millis(1));
        assert_eq!(options.channel_capacity, 1);
        assert_eq!(options.max_cycles, None);
    }
}
