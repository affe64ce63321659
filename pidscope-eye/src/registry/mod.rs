//! Element registry: the authoritative set of tracked elements and their
//! highlights.
//!
//! The registry is owned by a single presentation context and mutated only
//! through [`ElementRegistry::reconcile`], [`ElementRegistry::remove`] and the
//! selection operations. Every mutation is mirrored to the
//! [`PresentationAdapter`] it was built with, which keeps the element list and
//! the overlay consistent with each other.

mod reconcile;
mod selection;

pub use reconcile::ReconcileReport;

use crate::presentation::{NullAdapter, PresentationAdapter};
use pidscope_core::config::RegistryConfig;
use pidscope_core::element::CONFIDENCE_KEY;
use pidscope_core::{Category, CategoryTable, Detection, ElementId, Highlight, TrackedElement};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Key of the missing-frame table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MissKey {
    pub category: Category,
    pub name: String,
    pub id: ElementId,
}

impl MissKey {
    fn of(element: &TrackedElement) -> Self {
        Self {
            category: element.category.clone(),
            name: element.name.clone(),
            id: element.id,
        }
    }
}

pub struct ElementRegistry<A = NullAdapter> {
    config: RegistryConfig,
    table: CategoryTable,
    /// Category name → elements in insertion order
    elements: BTreeMap<String, Vec<TrackedElement>>,
    /// One per element, in insertion order (render and hit-test order)
    highlights: Vec<Highlight>,
    /// Consecutive missed cycles per element
    missing: HashMap<MissKey, u32>,
    /// Ids of evicted or removed elements
    retired: HashSet<ElementId>,
    adapter: A,
}

impl ElementRegistry<NullAdapter> {
    /// Registry without presentation side effects.
    pub fn detached(config: RegistryConfig) -> Self {
        Self::new(config, NullAdapter)
    }
}

impl<A: PresentationAdapter> ElementRegistry<A> {
    pub fn new(config: RegistryConfig, adapter: A) -> Self {
        Self::with_table(config, CategoryTable::builtin(), adapter)
    }

    pub fn with_table(config: RegistryConfig, table: CategoryTable, adapter: A) -> Self {
        Self {
            config,
            table,
            elements: BTreeMap::new(),
            highlights: Vec::new(),
            missing: HashMap::new(),
            retired: HashSet::new(),
            adapter,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    pub fn classify(&self, name: &str) -> Category {
        self.table.classify(name)
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    /// Category names that currently hold at least one element.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    pub fn elements(&self) -> impl Iterator<Item = &TrackedElement> {
        self.elements.values().flatten()
    }

    pub fn elements_in(&self, category: &str) -> &[TrackedElement] {
        self.elements
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn element(&self, id: &ElementId) -> Option<&TrackedElement> {
        self.elements().find(|e| e.id == *id)
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn highlight(&self, id: &ElementId) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == *id)
    }

    /// Consecutive cycles `id` has been missing, if it is currently missing.
    pub fn miss_count(&self, id: &ElementId) -> Option<u32> {
        self.missing
            .iter()
            .find(|(key, _)| key.id == *id)
            .map(|(_, count)| *count)
    }

    pub fn is_retired(&self, id: &ElementId) -> bool {
        self.retired.contains(id)
    }

    /// Remove an element on external request. Removing an element that is not
    /// live is a no-op. Returns whether anything was removed.
    pub fn remove(&mut self, category: &str, name: &str, id: &ElementId) -> bool {
        let removed = self.evict(category, id);
        if removed.is_none() {
            debug!("Remove of {} ({}) in {} ignored, not live", name, id, category);
        }
        removed.is_some()
    }

    /// Create the element and its highlight, then notify.
    fn insert(&mut self, detection: Detection, id: ElementId, category: Category) {
        let mut details = detection.details;
        details.insert(CONFIDENCE_KEY.to_string(), detection.confidence.to_string());

        let element = TrackedElement {
            id,
            name: detection.label,
            category,
            details,
            bounding_box: detection.bounding_box,
        };

        self.highlights.push(Highlight {
            id,
            name: element.name.clone(),
            bounding_box: element.bounding_box,
            selected: false,
        });
        self.adapter
            .on_element_added(&element.category, &element.name, &element.id);
        debug!("Tracking {} ({}) in {}", element.name, id, element.category);

        self.elements
            .entry(element.category.name().to_string())
            .or_default()
            .push(element);
    }

    /// Drop the element, its highlight and its miss counter together.
    fn evict(&mut self, category: &str, id: &ElementId) -> Option<TrackedElement> {
        let bucket = self.elements.get_mut(category)?;
        let index = bucket.iter().position(|e| e.id == *id)?;
        let element = bucket.remove(index);
        if bucket.is_empty() {
            self.elements.remove(category);
        }

        let was_selected = self
            .highlights
            .iter()
            .any(|h| h.id == *id && h.selected);
        self.highlights.retain(|h| h.id != *id);
        self.missing.retain(|key, _| key.id != *id);
        self.retired.insert(*id);

        self.adapter
            .on_element_removed(&element.category, &element.name, &element.id);
        if was_selected {
            self.adapter.on_selection_changed(None, "");
        }
        debug!("Stopped tracking {} ({})", element.name, id);
        Some(element)
    }
}
