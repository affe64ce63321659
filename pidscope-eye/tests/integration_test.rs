//! End-to-end registry behaviour across detection cycles

use pidscope_core::config::RegistryConfig;
use pidscope_core::{CategoryDefinition, CategoryTable, RawDetection};
use pidscope_eye::presentation::{BroadcastAdapter, ElementTree, RegistryEvent};
use pidscope_eye::registry::ElementRegistry;
use pidscope_eye::snapshot::export_snapshot;
use tokio::sync::broadcast;

fn tank() -> RawDetection {
    RawDetection::new("Atmospheric Tank", 0.9, [50.0, 50.0, 150.0, 150.0])
}

fn pump() -> RawDetection {
    RawDetection::new("Centrifugal Pump", 0.8, [350.0, 150.0, 450.0, 250.0])
}

fn drain(rx: &mut broadcast::Receiver<RegistryEvent>) -> Vec<RegistryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn broadcast_registry() -> (
    ElementRegistry<BroadcastAdapter>,
    broadcast::Receiver<RegistryEvent>,
) {
    let (adapter, rx) = BroadcastAdapter::new(256);
    (ElementRegistry::new(RegistryConfig::default(), adapter), rx)
}

#[test]
fn test_atmospheric_tank_scenario() {
    let (mut registry, mut rx) = broadcast_registry();

    let report = registry.reconcile(vec![tank()]);
    assert_eq!(report.added.len(), 1);
    let id = report.added[0];
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.categories().collect::<Vec<_>>(), vec!["Tanks"]);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        RegistryEvent::ElementAdded {
            category: "Tanks".to_string(),
            name: "Atmospheric Tank".to_string(),
            id,
        }
    );

    for cycle in 1..10 {
        let report = registry.reconcile(Vec::new());
        assert!(report.removed.is_empty(), "removed at empty cycle {}", cycle);
        assert_eq!(registry.miss_count(&id), Some(cycle));
    }
    assert!(drain(&mut rx).is_empty());
    assert_eq!(registry.len(), 1);

    let report = registry.reconcile(Vec::new());
    assert_eq!(report.removed, vec![id]);
    assert!(registry.is_empty());
    assert_eq!(registry.categories().count(), 0);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        RegistryEvent::ElementRemoved { id: removed, .. } if *removed == id
    ));
}

#[test]
fn test_single_frame_miss_keeps_identity_and_selection() {
    let (mut registry, mut rx) = broadcast_registry();
    let id = registry.reconcile(vec![tank(), pump()]).added[0];
    registry.reconcile(vec![tank(), pump()]);
    registry.select(&id);
    drain(&mut rx);

    registry.reconcile(vec![pump()]);
    let report = registry.reconcile(vec![tank(), pump()]);

    assert!(report.added.is_empty());
    assert!(report.removed.is_empty());
    assert!(drain(&mut rx).is_empty());
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.miss_count(&id), None);
    assert_eq!(registry.selected(), Some(&id));
    let element = registry.element(&id).unwrap();
    assert_eq!(element.category.name(), "Tanks");
}

#[test]
fn test_redetection_before_tolerance_is_never_removed() {
    let (mut registry, mut rx) = broadcast_registry();
    let id = registry.reconcile(vec![tank()]).added[0];

    for _ in 0..3 {
        for _ in 0..9 {
            registry.reconcile(Vec::new());
        }
        let report = registry.reconcile(vec![tank()]);
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
    }

    assert_eq!(registry.highlights()[0].id, id);
    let removals = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, RegistryEvent::ElementRemoved { .. }))
        .count();
    assert_eq!(removals, 0);
}

#[test]
fn test_eviction_fires_exactly_once() {
    let (mut registry, mut rx) = broadcast_registry();
    registry.reconcile(vec![tank()]);

    for _ in 0..25 {
        registry.reconcile(Vec::new());
    }

    let removals = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, RegistryEvent::ElementRemoved { .. }))
        .count();
    assert_eq!(removals, 1);
}

#[test]
fn test_custom_tolerance() {
    let config = RegistryConfig {
        miss_tolerance: 2,
        ..RegistryConfig::default()
    };
    let mut registry = ElementRegistry::detached(config);
    registry.reconcile(vec![tank()]);

    assert!(registry.reconcile(Vec::new()).removed.is_empty());
    assert_eq!(registry.reconcile(Vec::new()).removed.len(), 1);
}

#[test]
fn test_duplicate_in_same_cycle_yields_one_element() {
    let (mut registry, mut rx) = broadcast_registry();
    let report = registry.reconcile(vec![
        tank(),
        RawDetection::new("Atmospheric Tank", 0.85, [55.0, 55.0, 152.0, 152.0]),
    ]);

    assert_eq!(report.added.len(), 1);
    assert_eq!(report.suppressed, 1);
    assert_eq!(registry.len(), 1);
    assert_eq!(drain(&mut rx).len(), 1);
}

#[test]
fn test_cross_label_overlap_is_suppressed() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    registry.reconcile(vec![tank()]);
    let report = registry.reconcile(vec![
        tank(),
        RawDetection::new("Pressurized Tank", 0.6, [52.0, 50.0, 150.0, 152.0]),
    ]);

    assert_eq!(report.suppressed, 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_jittered_redetection_updates_box_in_place() {
    let (mut registry, mut rx) = broadcast_registry();
    let id = registry.reconcile(vec![tank()]).added[0];
    drain(&mut rx);

    let report = registry.reconcile(vec![RawDetection::new(
        "Atmospheric Tank",
        0.9,
        [53.0, 48.0, 153.0, 148.0],
    )]);

    assert_eq!(report.updated, 1);
    assert!(report.added.is_empty());
    assert!(drain(&mut rx).is_empty());
    let highlight = registry.highlight(&id).unwrap();
    assert_eq!(highlight.bounding_box.to_array(), [53.0, 48.0, 153.0, 148.0]);
    assert_eq!(
        registry.element(&id).unwrap().bounding_box,
        highlight.bounding_box
    );
}

#[test]
fn test_no_two_live_elements_overlap_above_threshold() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    let frames = vec![
        vec![tank(), pump()],
        vec![
            RawDetection::new("Atmospheric Tank", 0.9, [60.0, 60.0, 160.0, 160.0]),
            RawDetection::new("Vertical Tank", 0.7, [48.0, 52.0, 148.0, 150.0]),
        ],
        vec![
            RawDetection::new("Centrifugal Pump", 0.8, [340.0, 150.0, 440.0, 250.0]),
            RawDetection::new("Gear Pump", 0.8, [345.0, 155.0, 445.0, 255.0]),
        ],
    ];

    for frame in frames {
        registry.reconcile(frame);
        let highlights = registry.highlights();
        for (i, a) in highlights.iter().enumerate() {
            for b in &highlights[i + 1..] {
                assert!(a.bounding_box.iou(&b.bounding_box) <= 0.5);
            }
        }
    }
}

#[test]
fn test_carried_id_keeps_original_category() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    let id = registry.reconcile(vec![tank()]).added[0];

    let report = registry.reconcile(vec![RawDetection::new(
        "Centrifugal Pump",
        0.7,
        [50.0, 50.0, 150.0, 150.0],
    )
    .with_id(id)]);

    assert!(report.added.is_empty());
    assert!(report.removed.is_empty());
    let element = registry.element(&id).unwrap();
    assert_eq!(element.category.name(), "Tanks");
    assert_eq!(element.name, "Atmospheric Tank");
}

#[test]
fn test_category_fixed_at_creation_with_custom_table() {
    let table = CategoryTable::with_extra(&[CategoryDefinition {
        name: "Vessels".to_string(),
        elements: vec!["Settling Vessel".to_string()],
    }]);
    let mut registry =
        ElementRegistry::with_table(RegistryConfig::default(), table, ElementTree::new());

    let id = registry
        .reconcile(vec![RawDetection::new(
            "Settling Vessel",
            0.8,
            [0.0, 0.0, 40.0, 40.0],
        )])
        .added[0];
    for _ in 0..5 {
        registry.reconcile(vec![RawDetection::new(
            "Settling Vessel",
            0.8,
            [1.0, 0.0, 41.0, 40.0],
        )]);
    }

    assert_eq!(registry.element(&id).unwrap().category.name(), "Vessels");
    assert_eq!(registry.adapter().category_of(&id), Some("Vessels"));
}

#[test]
fn test_retired_id_is_not_reissued() {
    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    let id = registry.reconcile(vec![tank()]).added[0];
    assert!(registry.remove("Tanks", "Atmospheric Tank", &id));

    let report = registry.reconcile(vec![tank().with_id(id)]);
    assert_eq!(report.added.len(), 1);
    assert_ne!(report.added[0], id);
    assert!(registry.element(&id).is_none());
}

#[test]
fn test_selection_sync_between_surfaces() {
    let mut registry = ElementRegistry::new(RegistryConfig::default(), ElementTree::new());
    let report = registry.reconcile(vec![tank(), pump()]);
    let (tank_id, pump_id) = (report.added[0], report.added[1]);

    registry.select_at(100.0, 100.0);
    assert_eq!(registry.adapter().selected(), Some(&tank_id));

    registry.select_from_list("Pumps", &pump_id);
    assert!(registry.highlight(&pump_id).unwrap().selected);
    assert!(!registry.highlight(&tank_id).unwrap().selected);
    assert!(registry.adapter().details().contains("Name: Centrifugal Pump"));

    let selected = registry.highlights().iter().filter(|h| h.selected).count();
    assert_eq!(selected, 1);
}

#[test]
fn test_evicting_selected_element_clears_selection() {
    let (mut registry, mut rx) = broadcast_registry();
    let id = registry.reconcile(vec![tank()]).added[0];
    registry.select(&id);
    drain(&mut rx);

    for _ in 0..10 {
        registry.reconcile(Vec::new());
    }

    assert!(registry.selected().is_none());
    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], RegistryEvent::ElementRemoved { .. }));
    assert_eq!(
        events[1],
        RegistryEvent::SelectionChanged {
            id: None,
            details: String::new(),
        }
    );
}

#[test]
fn test_tree_mirrors_registry() {
    let mut registry = ElementRegistry::new(RegistryConfig::default(), ElementTree::new());
    let report = registry.reconcile(vec![tank(), pump()]);
    assert_eq!(registry.adapter().len(), 2);

    registry.remove("Pumps", "Centrifugal Pump", &report.added[1]);
    assert_eq!(registry.adapter().categories().collect::<Vec<_>>(), vec!["Tanks"]);
    assert!(registry.adapter().entries("Pumps").is_empty());
}

#[test]
fn test_export_snapshot_writes_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("detected_elements.json");

    let mut registry = ElementRegistry::detached(RegistryConfig::default());
    registry.reconcile(vec![
        tank().with_detail("Capacity", "500L"),
        RawDetection::new("Widget", 0.4, [500.0, 500.0, 520.0, 520.0]),
    ]);
    export_snapshot(&registry, &path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["Tanks"][0]["name"], "Atmospheric Tank");
    assert_eq!(json["Tanks"][0]["details"]["Capacity"], "500L");
    assert_eq!(json["Tanks"][0]["details"]["Confidence"], "0.9");
    assert_eq!(json["Unknown"][0]["name"], "Widget");
    assert!(json["Tanks"][0].get("id").is_none());
}
