//! Terminal presentation: logs every registry notification and keeps the
//! element list for the final summary.

use pidscope_core::{Category, ElementId};
use pidscope_eye::presentation::{ElementTree, PresentationAdapter};
use tracing::info;

#[derive(Debug, Default)]
pub struct LoggingAdapter {
    tree: ElementTree,
}

impl LoggingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// Indented category → element listing.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for category in self.tree.categories() {
            out.push_str(category);
            out.push('\n');
            for entry in self.tree.entries(category) {
                let marker = if self.tree.selected() == Some(&entry.id) {
                    '*'
                } else {
                    ' '
                };
                out.push_str(&format!("  {} {} [{}]\n", marker, entry.name, entry.id));
            }
        }
        out
    }
}

impl PresentationAdapter for LoggingAdapter {
    fn on_element_added(&mut self, category: &Category, name: &str, id: &ElementId) {
        info!("+ {} / {} ({})", category, name, id);
        self.tree.on_element_added(category, name, id);
    }

    fn on_element_removed(&mut self, category: &Category, name: &str, id: &ElementId) {
        info!("- {} / {} ({})", category, name, id);
        self.tree.on_element_removed(category, name, id);
    }

    fn on_selection_changed(&mut self, id: Option<&ElementId>, details: &str) {
        match id {
            Some(id) => info!("Selected {}", id),
            None => info!("Selection cleared"),
        }
        self.tree.on_selection_changed(id, details);
    }
}
