//! Selection shared by the overlay and the element list

use super::ElementRegistry;
use crate::presentation::PresentationAdapter;
use pidscope_core::{ElementId, Highlight, TrackedElement};
use tracing::debug;

impl<A: PresentationAdapter> ElementRegistry<A> {
    /// Select the element with `id`, deselecting every other highlight.
    ///
    /// Returns the details text shown for the element. An id that is not
    /// live leaves nothing selected.
    pub fn select(&mut self, id: &ElementId) -> Option<String> {
        for highlight in &mut self.highlights {
            highlight.selected = highlight.id == *id;
        }

        match self.element(id).map(TrackedElement::details_text) {
            Some(details) => {
                self.adapter.on_selection_changed(Some(id), &details);
                Some(details)
            }
            None => {
                debug!("Selected id {} is not live, clearing selection", id);
                self.adapter.on_selection_changed(None, "");
                None
            }
        }
    }

    /// Selection coming from the element list. Routes to [`Self::select`] when
    /// `id` lives in `category`, otherwise clears the selection.
    pub fn select_from_list(&mut self, category: &str, id: &ElementId) -> Option<String> {
        if self.elements_in(category).iter().any(|e| e.id == *id) {
            self.select(id)
        } else {
            debug!("No element {} under {}, clearing selection", id, category);
            self.clear_selection();
            None
        }
    }

    /// Selection coming from a click on the overlay, in frame coordinates.
    /// A click that hits no highlight leaves the selection unchanged.
    pub fn select_at(&mut self, x: f32, y: f32) -> Option<ElementId> {
        let id = self.highlight_at(x, y)?.id;
        self.select(&id);
        Some(id)
    }

    pub fn clear_selection(&mut self) {
        for highlight in &mut self.highlights {
            highlight.selected = false;
        }
        self.adapter.on_selection_changed(None, "");
    }

    /// First highlight, in insertion order, containing the frame point.
    pub fn highlight_at(&self, x: f32, y: f32) -> Option<&Highlight> {
        self.highlights
            .iter()
            .find(|h| h.bounding_box.contains(x, y))
    }

    pub fn selected(&self) -> Option<&ElementId> {
        self.highlights.iter().find(|h| h.selected).map(|h| &h.id)
    }

    pub fn selected_element(&self) -> Option<&TrackedElement> {
        self.selected().and_then(|id| self.element(id))
    }
}
