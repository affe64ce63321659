//! Single owner of the registry, applying detection batches in order

use crate::pipeline::{CancellationToken, DetectionBatch};
use crate::presentation::PresentationAdapter;
use crate::registry::{ElementRegistry, ReconcileReport};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct RegistryDriver<A: PresentationAdapter> {
    registry: ElementRegistry<A>,
    next_sequence: u64,
    applied: u64,
}

impl<A: PresentationAdapter> RegistryDriver<A> {
    pub fn new(registry: ElementRegistry<A>) -> Self {
        Self {
            registry,
            next_sequence: 0,
            applied: 0,
        }
    }

    /// Apply one batch. Batches older than the last applied one are skipped.
    pub fn apply(&mut self, batch: DetectionBatch) -> Option<ReconcileReport> {
        if batch.sequence < self.next_sequence {
            warn!(
                "Skipping stale batch {} (expected {} or later)",
                batch.sequence, self.next_sequence
            );
            return None;
        }

        self.next_sequence = batch.sequence + 1;
        self.applied += 1;
        let report = self.registry.reconcile(batch.detections);
        if report.has_changes() {
            debug!(
                "Batch {} captured at {}: +{} -{} ~{}",
                batch.sequence,
                batch.captured_at,
                report.added.len(),
                report.removed.len(),
                report.updated
            );
        }
        Some(report)
    }

    /// Apply batches until the channel closes or the token is cancelled.
    /// A batch received after cancellation is not applied.
    pub async fn drive(
        &mut self,
        mut rx: mpsc::Receiver<DetectionBatch>,
        token: CancellationToken,
    ) -> u64 {
        while let Some(batch) = rx.recv().await {
            if token.is_cancelled() {
                debug!("Dropping batch {} after cancellation", batch.sequence);
                break;
            }
            self.apply(batch);
        }
        info!(
            "Registry driver stopped after {} batches, {} elements tracked",
            self.applied,
            self.registry.len()
        );
        self.applied
    }

    /// Number of batches applied so far.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn registry(&self) -> &ElementRegistry<A> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ElementRegistry<A> {
        &mut self.registry
    }

    pub fn into_registry(self) -> ElementRegistry<A> {
        self.registry
    }
}
