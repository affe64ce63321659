//! Per-cycle reconciliation of a detection batch against the registry

use super::{ElementRegistry, MissKey};
use crate::presentation::PresentationAdapter;
use pidscope_core::{iou, BoundingBox, Category, Detection, ElementId, RawDetection};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// What one reconciliation cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Newly tracked elements
    pub added: Vec<ElementId>,
    /// Elements evicted after reaching the miss tolerance
    pub removed: Vec<ElementId>,
    /// Re-detected elements whose box moved
    pub updated: usize,
    /// Elements absent from this batch but still tracked
    pub missing: usize,
    /// Detections discarded as duplicates of a live element
    pub suppressed: usize,
    /// Malformed detections skipped
    pub dropped: usize,
}

impl ReconcileReport {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || self.updated > 0
    }
}

/// A detection with its identity resolved.
struct Assigned {
    detection: Detection,
    key: MissKey,
    /// Identity already live before this batch
    existing: bool,
}

impl<A: PresentationAdapter> ElementRegistry<A> {
    /// Merge one detection batch into the registry.
    ///
    /// Elements missing from the batch are kept until they have been missing
    /// for `miss_tolerance` consecutive calls. Re-detected elements keep their
    /// identity and only have their box updated. New detections overlapping a
    /// live element above the duplicate threshold are discarded. Malformed
    /// records are skipped; this never fails.
    pub fn reconcile<I>(&mut self, batch: I) -> ReconcileReport
    where
        I: IntoIterator<Item = RawDetection>,
    {
        let mut report = ReconcileReport::default();

        let mut detections = Vec::new();
        for raw in batch {
            match raw.validate() {
                Ok(detection) => detections.push(detection),
                Err(e) => {
                    warn!("Dropping detection: {}", e);
                    report.dropped += 1;
                }
            }
        }

        // Identities tracked before this batch, in highlight order
        let current: Vec<MissKey> = self
            .highlights
            .iter()
            .filter_map(|h| self.element(&h.id))
            .map(MissKey::of)
            .collect();

        let (assigned, duplicates) = self.assign_identities(detections);
        report.suppressed += duplicates;

        let incoming: HashSet<&MissKey> = assigned.iter().map(|a| &a.key).collect();
        let to_remove: Vec<MissKey> = current
            .iter()
            .filter(|key| !incoming.contains(key))
            .cloned()
            .collect();

        for key in to_remove {
            let count = self.missing.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count >= self.config.miss_tolerance {
                debug!(
                    "{} ({}) missing for {} cycles, evicting",
                    key.name, key.id, count
                );
                self.missing.remove(&key);
                if self.evict(key.category.name(), &key.id).is_some() {
                    report.removed.push(key.id);
                }
            } else {
                report.missing += 1;
            }
        }

        // A reappearance cancels accumulated misses
        for a in &assigned {
            self.missing.remove(&a.key);
        }

        let (existing, new): (Vec<Assigned>, Vec<Assigned>) =
            assigned.into_iter().partition(|a| a.existing);

        for a in existing {
            if self.update_position(&a.key.id, a.detection.bounding_box) {
                report.updated += 1;
            }
        }

        for a in new {
            if let Some(other) = self.overlapping_highlight(&a.detection.bounding_box, &a.key.id)
            {
                debug!(
                    "Suppressing {} as a duplicate of {}",
                    a.detection.label, other
                );
                report.suppressed += 1;
                continue;
            }
            report.added.push(a.key.id);
            self.insert(a.detection, a.key.id, a.key.category);
        }

        debug!(
            "Reconciled: {} added, {} removed, {} moved, {} missing, {} suppressed, {} dropped",
            report.added.len(),
            report.removed.len(),
            report.updated,
            report.missing,
            report.suppressed,
            report.dropped
        );
        report
    }

    /// Resolve every detection to an identity. A carried id that is live is
    /// reused; an id-less detection adopts the live element of the same name
    /// with the highest overlap above the duplicate threshold; anything else
    /// gets a fresh id and is classified. Each live element is claimed at most
    /// once per batch; further claims are counted as duplicates.
    fn assign_identities(&self, detections: Vec<Detection>) -> (Vec<Assigned>, usize) {
        let threshold = self.config.duplicate_iou_threshold;
        let live: HashMap<ElementId, MissKey> = self
            .elements()
            .map(|e| (e.id, MissKey::of(e)))
            .collect();
        let mut claimed: HashSet<ElementId> = HashSet::new();
        let mut assigned = Vec::with_capacity(detections.len());
        let mut duplicates = 0;

        for detection in detections {
            let carried = detection.id.filter(|id| {
                if self.retired.contains(id) {
                    debug!("Ignoring retired id {} on {}", id, detection.label);
                    false
                } else {
                    true
                }
            });

            let reused = match carried {
                Some(id) => Some(id),
                None => self
                    .elements()
                    .filter(|e| e.name == detection.label && !claimed.contains(&e.id))
                    .map(|e| (e.id, iou(&e.bounding_box, &detection.bounding_box)))
                    .filter(|(_, overlap)| *overlap > threshold)
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(id, _)| id),
            };

            if let Some(id) = reused {
                if !claimed.insert(id) {
                    debug!("{} claimed twice in one batch, dropping copy", id);
                    duplicates += 1;
                    continue;
                }
                if let Some(key) = live.get(&id) {
                    assigned.push(Assigned {
                        detection,
                        key: key.clone(),
                        existing: true,
                    });
                    continue;
                }
                // Carried id not seen before: a new element under that id
                let category = self.table.classify(&detection.label);
                assigned.push(Assigned {
                    key: MissKey {
                        category,
                        name: detection.label.clone(),
                        id,
                    },
                    detection,
                    existing: false,
                });
                continue;
            }

            let id = ElementId::new();
            claimed.insert(id);
            let category: Category = self.table.classify(&detection.label);
            assigned.push(Assigned {
                key: MissKey {
                    category,
                    name: detection.label.clone(),
                    id,
                },
                detection,
                existing: false,
            });
        }

        (assigned, duplicates)
    }

    /// First live highlight, other than `id`, overlapping `bbox` above the
    /// duplicate threshold.
    fn overlapping_highlight(&self, bbox: &BoundingBox, id: &ElementId) -> Option<ElementId> {
        let threshold = self.config.duplicate_iou_threshold;
        self.highlights
            .iter()
            .filter(|h| h.id != *id)
            .find(|h| iou(&h.bounding_box, bbox) > threshold)
            .map(|h| h.id)
    }

    /// Move an element and its highlight. Skipped when the new box would
    /// collide with another live element. Returns whether the box changed.
    fn update_position(&mut self, id: &ElementId, bbox: BoundingBox) -> bool {
        let Some(highlight) = self.highlights.iter().find(|h| h.id == *id) else {
            return false;
        };
        if highlight.bounding_box == bbox {
            return false;
        }
        if let Some(other) = self.overlapping_highlight(&bbox, id) {
            debug!("Keeping {} in place, new box overlaps {}", id, other);
            return false;
        }

        if let Some(highlight) = self.highlights.iter_mut().find(|h| h.id == *id) {
            highlight.bounding_box = bbox;
        }
        if let Some(element) = self
            .elements
            .values_mut()
            .flatten()
            .find(|e| e.id == *id)
        {
            element.bounding_box = bbox;
        }
        true
    }
}
