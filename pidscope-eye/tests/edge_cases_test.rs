//! Malformed and degenerate input handling

use pidscope_core::config::RegistryConfig;
use pidscope_core::{ElementId, RawDetection};
use pidscope_eye::registry::ElementRegistry;

#[test]
fn test_malformed_records_are_dropped() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    let batch = vec![
        RawDetection::default(),
        RawDetection {
            label: Some("Gate Valve".to_string()),
            confidence: Some(0.7),
            bounding_box: None,
            ..RawDetection::default()
        },
        RawDetection::new("Gate Valve", 0.7, [10.0, 10.0, 10.0, 20.0]),
        RawDetection::new("Gate Valve", f32::NAN, [10.0, 10.0, 20.0, 20.0]),
        RawDetection::new("", 0.7, [10.0, 10.0, 20.0, 20.0]),
        RawDetection::new("Gate Valve", 0.7, [30.0, 30.0, 60.0, 60.0]),
    ];

    let report = registry.reconcile(batch);
    assert_eq!(report.dropped, 5);
    assert_eq!(report.added.len(), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_malformed_json_records_are_dropped() {
    let batch: Vec<RawDetection> = serde_json::from_str(
        r#"[
            {"label": "Ball Valve", "confidence": 0.9, "bounding_box": [0, 0, 20, 20]},
            {"label": "Ball Valve", "confidence": 0.9},
            {"confidence": 0.9, "bounding_box": [40, 40, 60, 60]},
            {"class": "Reciprocating Pump", "confidence": 91.5, "bbox": [100, 100, 140, 130]}
        ]"#,
    )
    .unwrap();

    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    let report = registry.reconcile(batch);
    assert_eq!(report.dropped, 2);
    assert_eq!(registry.len(), 2);

    let pump = registry.elements_in("Pumps");
    assert_eq!(pump.len(), 1);
    assert_eq!(pump[0].confidence(), Some(91.5));
}

#[test]
fn test_batch_of_only_malformed_counts_as_miss() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    let id = registry
        .reconcile(vec![RawDetection::new("Filter", 0.9, [0.0, 0.0, 10.0, 10.0])])
        .added[0];

    let report = registry.reconcile(vec![RawDetection::default()]);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.missing, 1);
    assert_eq!(registry.miss_count(&id), Some(1));
}

#[test]
fn test_unknown_label_goes_to_unknown_category() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    registry.reconcile(vec![RawDetection::new("Flux Capacitor", 0.3, [0.0, 0.0, 5.0, 5.0])]);
    assert_eq!(registry.categories().collect::<Vec<_>>(), vec!["Unknown"]);
    assert!(!registry.elements().next().unwrap().category.is_known());
}

#[test]
fn test_empty_registry_operations_are_noops() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    let report = registry.reconcile(Vec::new());
    assert!(!report.has_changes());
    assert!(registry.select(&ElementId::new()).is_none());
    assert!(registry.select_at(1.0, 1.0).is_none());
    assert!(!registry.remove("Tanks", "Atmospheric Tank", &ElementId::new()));
    assert!(registry.elements_in("Tanks").is_empty());
}

#[test]
fn test_same_label_far_apart_are_distinct_elements() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    let report = registry.reconcile(vec![
        RawDetection::new("Gate Valve", 0.8, [0.0, 0.0, 20.0, 20.0]),
        RawDetection::new("Gate Valve", 0.8, [100.0, 0.0, 120.0, 20.0]),
    ]);
    assert_eq!(report.added.len(), 2);

    let again = registry.reconcile(vec![
        RawDetection::new("Gate Valve", 0.8, [101.0, 0.0, 121.0, 20.0]),
        RawDetection::new("Gate Valve", 0.8, [1.0, 0.0, 21.0, 20.0]),
    ]);
    assert!(again.added.is_empty());
    assert_eq!(again.updated, 2);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_move_onto_another_element_is_skipped() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    let report = registry.reconcile(vec![
        RawDetection::new("Filter", 0.8, [0.0, 0.0, 20.0, 20.0]),
        RawDetection::new("Strainer", 0.8, [8.0, 0.0, 28.0, 20.0]),
    ]);
    let filter = report.added[0];

    // Moves 3px right: still matches itself, but would overlap Strainer above 0.5
    let again = registry.reconcile(vec![
        RawDetection::new("Filter", 0.8, [3.0, 0.0, 23.0, 20.0]),
        RawDetection::new("Strainer", 0.8, [8.0, 0.0, 28.0, 20.0]),
    ]);
    assert_eq!(again.updated, 0);
    assert_eq!(
        registry.highlight(&filter).unwrap().bounding_box.to_array(),
        [0.0, 0.0, 20.0, 20.0]
    );
}
