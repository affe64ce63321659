//! Presentation-side collaborators notified by the element registry

use pidscope_core::{Category, ElementId};
use serde::Serialize;
use tokio::sync::broadcast;

/// Receives registry side effects. Implementations render the element list,
/// the details panel and the overlay emphasis.
pub trait PresentationAdapter: Send {
    fn on_element_added(&mut self, category: &Category, name: &str, id: &ElementId);

    fn on_element_removed(&mut self, category: &Category, name: &str, id: &ElementId);

    /// `id` is `None` when nothing is selected, in which case `details` is empty.
    fn on_selection_changed(&mut self, id: Option<&ElementId>, details: &str);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAdapter;

impl PresentationAdapter for NullAdapter {
    fn on_element_added(&mut self, _: &Category, _: &str, _: &ElementId) {}
    fn on_element_removed(&mut self, _: &Category, _: &str, _: &ElementId) {}
    fn on_selection_changed(&mut self, _: Option<&ElementId>, _: &str) {}
}

impl<A: PresentationAdapter + ?Sized> PresentationAdapter for Box<A> {
    fn on_element_added(&mut self, category: &Category, name: &str, id: &ElementId) {
        (**self).on_element_added(category, name, id)
    }

    fn on_element_removed(&mut self, category: &Category, name: &str, id: &ElementId) {
        (**self).on_element_removed(category, name, id)
    }

    fn on_selection_changed(&mut self, id: Option<&ElementId>, details: &str) {
        (**self).on_selection_changed(id, details)
    }
}

/// Fan out to two adapters, e.g. the element tree and an event stream.
impl<A: PresentationAdapter, B: PresentationAdapter> PresentationAdapter for (A, B) {
    fn on_element_added(&mut self, category: &Category, name: &str, id: &ElementId) {
        self.0.on_element_added(category, name, id);
        self.1.on_element_added(category, name, id);
    }

    fn on_element_removed(&mut self, category: &Category, name: &str, id: &ElementId) {
        self.0.on_element_removed(category, name, id);
        self.1.on_element_removed(category, name, id);
    }

    fn on_selection_changed(&mut self, id: Option<&ElementId>, details: &str) {
        self.0.on_selection_changed(id, details);
        self.1.on_selection_changed(id, details);
    }
}

/// Registry notification as a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    ElementAdded {
        category: String,
        name: String,
        id: ElementId,
    },
    ElementRemoved {
        category: String,
        name: String,
        id: ElementId,
    },
    SelectionChanged {
        id: Option<ElementId>,
        details: String,
    },
}

/// Publishes notifications on a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastAdapter {
    sender: broadcast::Sender<RegistryEvent>,
}

impl BroadcastAdapter {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<RegistryEvent>) {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, event: RegistryEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

impl PresentationAdapter for BroadcastAdapter {
    fn on_element_added(&mut self, category: &Category, name: &str, id: &ElementId) {
        self.publish(RegistryEvent::ElementAdded {
            category: category.name().to_string(),
            name: name.to_string(),
            id: *id,
        });
    }

    fn on_element_removed(&mut self, category: &Category, name: &str, id: &ElementId) {
        self.publish(RegistryEvent::ElementRemoved {
            category: category.name().to_string(),
            name: name.to_string(),
            id: *id,
        });
    }

    fn on_selection_changed(&mut self, id: Option<&ElementId>, details: &str) {
        self.publish(RegistryEvent::SelectionChanged {
            id: id.copied(),
            details: details.to_string(),
        });
    }
}

/// Entry of the hierarchical element list.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub name: String,
    pub id: ElementId,
}

/// Category → element list model backing the tree view and details panel.
/// Categories appear in first-seen order and disappear when emptied.
#[derive(Debug, Default, Clone)]
pub struct ElementTree {
    nodes: Vec<(String, Vec<TreeEntry>)>,
    selected: Option<ElementId>,
    details: String,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|(c, _)| c.as_str())
    }

    pub fn entries(&self, category: &str) -> &[TreeEntry] {
        self.nodes
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[])
    }

    /// Category holding `id`, as needed to route a list click back to the registry.
    pub fn category_of(&self, id: &ElementId) -> Option<&str> {
        self.nodes
            .iter()
            .find(|(_, entries)| entries.iter().any(|e| e.id == *id))
            .map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn selected(&self) -> Option<&ElementId> {
        self.selected.as_ref()
    }

    pub fn details(&self) -> &str {
        &self.details
    }
}

impl PresentationAdapter for ElementTree {
    fn on_element_added(&mut self, category: &Category, name: &str, id: &ElementId) {
        let category = category.name();
        let index = match self.nodes.iter().position(|(c, _)| c == category) {
            Some(index) => index,
            None => {
                self.nodes.push((category.to_string(), Vec::new()));
                self.nodes.len() - 1
            }
        };
        let entries = &mut self.nodes[index].1;
        if !entries.iter().any(|e| e.id == *id) {
            entries.push(TreeEntry {
                name: name.to_string(),
                id: *id,
            });
        }
    }

    fn on_element_removed(&mut self, category: &Category, _name: &str, id: &ElementId) {
        let category = category.name();
        if let Some(index) = self.nodes.iter().position(|(c, _)| c == category) {
            self.nodes[index].1.retain(|e| e.id != *id);
            if self.nodes[index].1.is_empty() {
                self.nodes.remove(index);
            }
        }
        if self.selected == Some(*id) {
            self.selected = None;
            self.details.clear();
        }
    }

    fn on_selection_changed(&mut self, id: Option<&ElementId>, details: &str) {
        self.selected = id.copied();
        self.details = details.to_string();
    }
}
