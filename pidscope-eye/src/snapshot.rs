//! Export of the tracked elements to a JSON file

use crate::error::EyeError;
use crate::presentation::PresentationAdapter;
use crate::registry::ElementRegistry;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

/// Exported element: no transient id or box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementRecord {
    pub name: String,
    pub details: BTreeMap<String, String>,
}

/// Category name → elements.
pub type Snapshot = BTreeMap<String, Vec<ElementRecord>>;

pub fn snapshot<A: PresentationAdapter>(registry: &ElementRegistry<A>) -> Snapshot {
    registry
        .categories()
        .map(|category| {
            let records = registry
                .elements_in(category)
                .iter()
                .map(|e| ElementRecord {
                    name: e.name.clone(),
                    details: e.details.clone(),
                })
                .collect();
            (category.to_string(), records)
        })
        .collect()
}

/// Write the snapshot as pretty JSON, creating parent directories.
pub fn export_snapshot<A: PresentationAdapter>(
    registry: &ElementRegistry<A>,
    path: &Path,
) -> Result<Snapshot, EyeError> {
    let snapshot = snapshot(registry);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(&snapshot)?;
    std::fs::write(path, json)
        .map_err(|e| EyeError::Export(format!("Failed to write {:?}: {}", path, e)))?;

    info!(
        "Exported {} elements in {} categories to {:?}",
        snapshot.values().map(Vec::len).sum::<usize>(),
        snapshot.len(),
        path
    );
    Ok(snapshot)
}

/// Element count per category, for summaries.
pub fn category_counts(snapshot: &Snapshot) -> HashMap<&str, usize> {
    snapshot
        .iter()
        .map(|(category, records)| (category.as_str(), records.len()))
        .collect()
}
